/// Form fields used by the options page

use web_sys::{HtmlInputElement, HtmlTextAreaElement};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct ColorFieldProps {
    pub label: AttrValue,
    pub value: String,
    pub on_change: Callback<String>,
}

#[function_component(ColorField)]
pub fn color_field(props: &ColorFieldProps) -> Html {
    let on_input = {
        let on_change = props.on_change.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                on_change.emit(input.value());
            }
        })
    };

    html! {
        <label class="field field-color">
            <span class="field-label">{props.label.clone()}</span>
            <input type="color" value={props.value.clone()} oninput={on_input} />
            <code class="field-hint">{&props.value}</code>
        </label>
    }
}

#[derive(Properties, PartialEq)]
pub struct TextFieldProps {
    pub label: AttrValue,
    pub value: String,
    pub on_change: Callback<String>,
    #[prop_or_default]
    pub placeholder: AttrValue,
}

#[function_component(TextField)]
pub fn text_field(props: &TextFieldProps) -> Html {
    let on_input = {
        let on_change = props.on_change.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                on_change.emit(input.value());
            }
        })
    };

    html! {
        <label class="field">
            <span class="field-label">{props.label.clone()}</span>
            <input
                type="text"
                class="field-input"
                value={props.value.clone()}
                placeholder={props.placeholder.clone()}
                oninput={on_input}
            />
        </label>
    }
}

#[derive(Properties, PartialEq)]
pub struct NumberFieldProps {
    pub label: AttrValue,
    pub value: u64,
    pub on_change: Callback<u64>,
    #[prop_or_default]
    pub unit: AttrValue,
}

/// Non-numeric input is ignored, leaving the last valid value in place
#[function_component(NumberField)]
pub fn number_field(props: &NumberFieldProps) -> Html {
    let on_input = {
        let on_change = props.on_change.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                if let Ok(value) = input.value().trim().parse::<u64>() {
                    on_change.emit(value);
                }
            }
        })
    };

    html! {
        <label class="field">
            <span class="field-label">{props.label.clone()}</span>
            <input type="number" min="0" class="field-input" value={props.value.to_string()} oninput={on_input} />
            <span class="field-unit">{props.unit.clone()}</span>
        </label>
    }
}

#[derive(Properties, PartialEq)]
pub struct CheckboxFieldProps {
    pub label: AttrValue,
    pub checked: bool,
    pub on_change: Callback<bool>,
}

#[function_component(CheckboxField)]
pub fn checkbox_field(props: &CheckboxFieldProps) -> Html {
    let on_click = {
        let on_change = props.on_change.clone();
        Callback::from(move |e: MouseEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                on_change.emit(input.checked());
            }
        })
    };

    html! {
        <label class="field field-checkbox">
            <input type="checkbox" checked={props.checked} onclick={on_click} />
            <span class="field-label">{props.label.clone()}</span>
        </label>
    }
}

#[derive(Properties, PartialEq)]
pub struct CssFieldProps {
    pub label: AttrValue,
    pub value: String,
    pub on_change: Callback<String>,
}

#[function_component(CssField)]
pub fn css_field(props: &CssFieldProps) -> Html {
    let on_input = {
        let on_change = props.on_change.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(area) = e.target_dyn_into::<HtmlTextAreaElement>() {
                on_change.emit(area.value());
            }
        })
    };

    html! {
        <label class="field field-css">
            <span class="field-label">{props.label.clone()}</span>
            <textarea class="field-textarea" rows="6" value={props.value.clone()} oninput={on_input} />
        </label>
    }
}
