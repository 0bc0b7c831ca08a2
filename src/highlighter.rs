/// Marks comment elements as new and clears the mark on click

use crate::css::{stylesheet, transition_class};
use crate::logger::Logger;
use crate::options::Options;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlStyleElement, Node};

/// Tag of a comment element in reddit's current markup
pub const COMMENT_SELECTOR: &str = "shreddit-comment";

const STYLE_ELEMENT_ID: &str = "comment-highlighter-style";

struct ClickListener {
    element: Element,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

pub struct CommentHighlighter {
    document: Document,
    options: Options,
    style: Option<HtmlStyleElement>,
    listeners: RefCell<Vec<ClickListener>>,
    logger: Logger,
}

impl CommentHighlighter {
    /// Inject the stylesheet for `options` into the page
    pub fn new(document: Document, options: Options, logger: Logger) -> Result<Self, JsValue> {
        // A previous instance may have left its style behind on SPA navigation
        if let Some(stale) = document.get_element_by_id(STYLE_ELEMENT_ID) {
            stale.remove();
        }

        let style: HtmlStyleElement = document.create_element("style")?.dyn_into()?;
        style.set_id(STYLE_ELEMENT_ID);
        style.set_text_content(Some(&stylesheet(&options)));

        let parent = match document.head() {
            Some(head) => Element::from(head),
            None => document
                .document_element()
                .ok_or_else(|| JsValue::from_str("document has no root element"))?,
        };
        parent.append_child(&style)?;

        Ok(CommentHighlighter {
            document,
            options,
            style: Some(style),
            listeners: RefCell::new(Vec::new()),
            logger,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn highlight_comment(&self, comment: &Element) {
        let classes = comment.class_list();
        if let Err(e) = classes.add_2(&self.options.class_name, &transition_class(&self.options)) {
            self.logger.warn(format!("cannot mark comment: {:?}", e));
            return;
        }

        if self.options.clear_comment_on_click {
            self.clear_on_click(comment);
        }
    }

    pub fn is_highlighted(&self, comment: &Element) -> bool {
        comment.class_list().contains(&self.options.class_name)
    }

    fn clear_on_click(&self, comment: &Element) {
        let target = comment.clone();
        let class_name = self.options.class_name.clone();
        let transition = transition_class(&self.options);
        let include_children = self.options.clear_comment_include_children;
        let delay_ms = self.options.transition_delay_ms();
        let logger = self.logger.clone();
        let own_function: Rc<RefCell<Option<js_sys::Function>>> = Rc::new(RefCell::new(None));

        let callback = {
            let own_function = own_function.clone();
            Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
                // Clicks inside a nested reply belong to that reply
                let clicked = event
                    .target()
                    .and_then(|t| t.dyn_into::<Element>().ok())
                    .and_then(|e| e.closest(COMMENT_SELECTOR).ok().flatten());
                if let Some(clicked) = clicked {
                    let target_node: &Node = &target;
                    if !clicked.is_same_node(Some(target_node)) {
                        return;
                    }
                }

                if let Some(function) = own_function.borrow_mut().take() {
                    let _ = target.remove_event_listener_with_callback("click", &function);
                }

                let mut cleared = vec![target.clone()];
                if include_children {
                    if let Ok(children) = target.query_selector_all(&format!(".{}", class_name)) {
                        for index in 0..children.length() {
                            if let Some(child) = children.item(index).and_then(|n| n.dyn_into::<Element>().ok()) {
                                cleared.push(child);
                            }
                        }
                    }
                }

                for element in &cleared {
                    let _ = element.class_list().remove_1(&class_name);
                }
                logger.debug(format!("cleared {} highlighted comments", cleared.len()));

                // Drop the transition helper only once the fade-out has finished
                let transition = transition.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    crate::clock::sleep_ms(delay_ms).await;
                    for element in &cleared {
                        let _ = element.class_list().remove_1(&transition);
                    }
                });
            })
        };

        let function: js_sys::Function = callback.as_ref().unchecked_ref::<js_sys::Function>().clone();
        if comment.add_event_listener_with_callback("click", &function).is_ok() {
            *own_function.borrow_mut() = Some(function);
            self.listeners.borrow_mut().push(ClickListener {
                element: comment.clone(),
                callback,
            });
        }
    }

    /// Remove the stylesheet, the click listeners and every class this highlighter added
    pub fn dispose(&mut self) {
        if let Some(style) = self.style.take() {
            style.remove();
        }

        for listener in self.listeners.borrow_mut().drain(..) {
            let _ = listener
                .element
                .remove_event_listener_with_callback("click", listener.callback.as_ref().unchecked_ref());
        }

        let transition = transition_class(&self.options);
        let selector = format!(".{}, .{}", self.options.class_name, transition);
        if let Ok(elements) = self.document.query_selector_all(&selector) {
            for index in 0..elements.length() {
                if let Some(element) = elements.item(index).and_then(|n| n.dyn_into::<Element>().ok()) {
                    let _ = element
                        .class_list()
                        .remove_2(&self.options.class_name, &transition);
                }
            }
        }
        self.logger.debug("highlighter disposed");
    }
}

impl Drop for CommentHighlighter {
    fn drop(&mut self) {
        self.dispose();
    }
}
