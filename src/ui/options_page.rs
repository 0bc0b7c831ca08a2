/// Options page for the extension

use crate::css::stylesheet;
use crate::messaging::{BackgroundClient, RuntimeBridge};
use crate::options::{Options, OptionsPatch};
use crate::ui::components::{CheckboxField, ColorField, CssField, NumberField, TextField};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

#[derive(Clone, PartialEq)]
enum PageState {
    Loading,
    Idle,
    Saving,
    Message(String),
    Error(String),
}

#[function_component(OptionsPage)]
pub fn options_page() -> Html {
    let state = use_state(|| PageState::Loading);
    let draft = use_state(Options::default);

    // Load current options on mount
    {
        let state = state.clone();
        let draft = draft.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match client().get_options().await {
                    Ok(options) => {
                        draft.set(options);
                        state.set(PageState::Idle);
                    }
                    Err(e) => state.set(PageState::Error(format!("Failed to load options: {}", e))),
                }
            });
            || ()
        });
    }

    let edit = {
        let draft = draft.clone();
        move |apply: fn(&mut Options, String)| {
            let draft = draft.clone();
            Callback::from(move |value: String| {
                let mut next = (*draft).clone();
                apply(&mut next, value);
                draft.set(next);
            })
        }
    };
    let edit_flag = {
        let draft = draft.clone();
        move |apply: fn(&mut Options, bool)| {
            let draft = draft.clone();
            Callback::from(move |value: bool| {
                let mut next = (*draft).clone();
                apply(&mut next, value);
                draft.set(next);
            })
        }
    };

    let on_retention_days = {
        let draft = draft.clone();
        Callback::from(move |days: u64| {
            let mut next = (*draft).clone();
            next.set_retention_days(days);
            draft.set(next);
        })
    };

    let on_transition_ms = {
        let draft = draft.clone();
        Callback::from(move |ms: u64| {
            let mut next = (*draft).clone();
            next.clear_comment_transition_ms = u32::try_from(ms).unwrap_or(u32::MAX);
            draft.set(next);
        })
    };

    let on_save = {
        let state = state.clone();
        let draft = draft.clone();
        Callback::from(move |_| {
            let state = state.clone();
            let edited = (*draft).clone();
            state.set(PageState::Saving);

            spawn_local(async move {
                let result = match OptionsPatch::between(&Options::default(), &edited) {
                    Ok(patch) => client().set_options(patch).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                match result {
                    Ok(()) => state.set(PageState::Message("Options saved".to_string())),
                    Err(e) => state.set(PageState::Error(format!("Failed to save: {}", e))),
                }
            });
        })
    };

    let on_reset = {
        let state = state.clone();
        let draft = draft.clone();
        Callback::from(move |_| {
            let state = state.clone();
            let draft = draft.clone();
            state.set(PageState::Saving);

            spawn_local(async move {
                let client = client();
                let result = match client.clear_options().await {
                    Ok(()) => client.get_options().await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(options) => {
                        draft.set(options);
                        state.set(PageState::Message("Options reset to defaults".to_string()));
                    }
                    Err(e) => state.set(PageState::Error(format!("Failed to reset: {}", e))),
                }
            });
        })
    };

    let on_clear_history = {
        let state = state.clone();
        Callback::from(move |_| {
            let state = state.clone();
            state.set(PageState::Saving);

            spawn_local(async move {
                match client().clear_thread_history().await {
                    Ok(()) => state.set(PageState::Message("Thread history cleared".to_string())),
                    Err(e) => state.set(PageState::Error(format!("Failed to clear history: {}", e))),
                }
            });
        })
    };

    let is_busy = matches!(*state, PageState::Loading | PageState::Saving);
    let options = (*draft).clone();

    html! {
        <div class="padding-20">
            <h1 class="page-title">{"Reddit Comment Highlighter"}</h1>

            {match &*state {
                PageState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{"Loading options..."}</p>
                    </div>
                },
                PageState::Message(msg) => html! {
                    <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                    </Alert>
                },
                PageState::Error(err) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err.clone()}
                    </Alert>
                },
                PageState::Idle | PageState::Saving => html! {}
            }}

            <section class="options-section">
                <h2 class="section-title">{"Colors"}</h2>
                <ColorField label="Background" value={options.back_color.clone()}
                    on_change={edit(|o, v| o.back_color = v)} />
                <ColorField label="Text" value={options.front_color.clone()}
                    on_change={edit(|o, v| o.front_color = v)} />
                <ColorField label="Background (dark mode)" value={options.back_color_dark.clone()}
                    on_change={edit(|o, v| o.back_color_dark = v)} />
                <ColorField label="Text (dark mode)" value={options.front_color_dark.clone()}
                    on_change={edit(|o, v| o.front_color_dark = v)} />
                <TextField label="Border" value={options.border.clone()} placeholder="1px solid #ff4500"
                    on_change={edit(|o, v| o.border = v)} />
            </section>

            <section class="options-section">
                <h2 class="section-title">{"Behavior"}</h2>
                <CheckboxField label="Clear highlight when a comment is clicked"
                    checked={options.clear_comment_on_click}
                    on_change={edit_flag(|o, v| o.clear_comment_on_click = v)} />
                <CheckboxField label="Also clear replies to the clicked comment"
                    checked={options.clear_comment_include_children}
                    on_change={edit_flag(|o, v| o.clear_comment_include_children = v)} />
                <NumberField label="Fade-out duration" unit="ms"
                    value={options.clear_comment_transition_ms as u64}
                    on_change={on_transition_ms} />
                <NumberField label="Forget threads after" unit="days"
                    value={options.retention_days()}
                    on_change={on_retention_days} />
            </section>

            <section class="options-section">
                <h2 class="section-title">{"Advanced"}</h2>
                <TextField label="Highlight class name" value={options.class_name.clone()}
                    on_change={edit(|o, v| o.class_name = v)} />
                <CssField label="Custom CSS" value={options.custom_css.clone()}
                    on_change={edit(|o, v| o.custom_css = v)} />
                <CheckboxField label="Sync thread history between browsers"
                    checked={options.sync}
                    on_change={edit_flag(|o, v| o.sync = v)} />
                <CheckboxField label="Compress thread history"
                    checked={options.use_compression}
                    on_change={edit_flag(|o, v| o.use_compression = v)} />
                <CheckboxField label="Debug logging"
                    checked={options.debug}
                    on_change={edit_flag(|o, v| o.debug = v)} />
            </section>

            <section class="options-section">
                <h2 class="section-title">{"Preview"}</h2>
                <style>{stylesheet(&options)}</style>
                <div class={classes!(options.class_name.clone())}>
                    <div slot="comment">{"A comment posted since your last visit"}</div>
                </div>
            </section>

            <div class="options-actions">
                <Button onclick={on_save} disabled={is_busy} variant={ButtonVariant::Primary}>
                    {"Save"}
                </Button>
                <Button onclick={on_reset} disabled={is_busy} variant={ButtonVariant::Secondary}>
                    {"Reset to defaults"}
                </Button>
                <Button onclick={on_clear_history} disabled={is_busy} variant={ButtonVariant::Danger}>
                    {"Clear thread history"}
                </Button>
            </div>
        </div>
    }
}

fn client() -> BackgroundClient<RuntimeBridge> {
    BackgroundClient::new(RuntimeBridge)
}
