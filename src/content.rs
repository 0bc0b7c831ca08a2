/// Content script: highlight comments posted since the last visit

use crate::comment::Comment;
use crate::highlighter::{COMMENT_SELECTOR, CommentHighlighter};
use crate::logger::Logger;
use crate::messaging::{BackgroundClient, RuntimeBridge};
use crate::thread_url::thread_id_from_url;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, MutationObserver, MutationObserverInit, MutationRecord};

/// Marks comments that were already compared against the last visit
const SEEN_ATTRIBUTE: &str = "data-comment-highlighter-seen";

/// Places in reddit's header that show the logged-in user's name
const USER_NAME_SELECTORS: [&str; 2] = [
    "shreddit-app [data-testid=\"user-name\"]",
    "#USER_DROPDOWN_ID span",
];

pub fn start(logger: Logger) {
    spawn_local(async move {
        if let Err(e) = run(&logger).await {
            logger.error(format!("content script failed: {}", e));
        }
    });
}

async fn run(logger: &Logger) -> Result<(), String> {
    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;
    let href = window
        .location()
        .href()
        .map_err(|e| format!("Failed to read location: {:?}", e))?;

    let Some(thread_id) = thread_id_from_url(&href) else {
        logger.debug(format!("{} is not a thread page", href));
        return Ok(());
    };

    let client = BackgroundClient::new(RuntimeBridge);
    let options = client.get_options().await.map_err(|e| e.to_string())?;
    logger.set_debug(options.debug);

    let last_visit = client
        .get_thread_history(&thread_id)
        .await
        .map_err(|e| e.to_string())?;

    match last_visit {
        Some(visit) => {
            let highlighter = CommentHighlighter::new(document.clone(), options, logger.child("highlighter"))
                .map_err(|e| format!("Failed to inject styles: {:?}", e))?;
            let watcher = Rc::new(NewCommentWatcher {
                highlighter,
                last_visit: visit.timestamp,
                current_user: current_user(&document),
                logger: logger.clone(),
            });

            if let Some(root) = document.document_element() {
                let count = watcher.scan(&root);
                logger.info(format!(
                    "{} new comments in {} since {}",
                    count, thread_id, visit.timestamp
                ));
                watcher.observe(&root)?;
            }
        }
        None => logger.debug(format!("first visit to {}", thread_id)),
    }

    client
        .add_thread_history(&thread_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

struct NewCommentWatcher {
    highlighter: CommentHighlighter,
    last_visit: u64,
    current_user: Option<String>,
    logger: Logger,
}

impl NewCommentWatcher {
    /// Highlight new comments at or below `root`; returns how many were new
    fn scan(&self, root: &Element) -> usize {
        let mut elements = Vec::new();
        if root.matches(COMMENT_SELECTOR).unwrap_or(false) {
            elements.push(root.clone());
        }
        if let Ok(found) = root.query_selector_all(COMMENT_SELECTOR) {
            for index in 0..found.length() {
                if let Some(element) = found.item(index).and_then(|n| n.dyn_into::<Element>().ok()) {
                    elements.push(element);
                }
            }
        }

        let mut highlighted = 0;
        for element in elements {
            if element.has_attribute(SEEN_ATTRIBUTE) {
                continue;
            }
            let _ = element.set_attribute(SEEN_ATTRIBUTE, "");

            let comment = comment_from_element(&element);
            if comment.is_new(self.last_visit, self.current_user.as_deref()) {
                self.highlighter.highlight_comment(&element);
                highlighted += 1;
            }
        }
        highlighted
    }

    /// Keep highlighting comments reddit inserts later (load more, replies)
    fn observe(self: &Rc<Self>, root: &Element) -> Result<(), String> {
        let watcher = self.clone();
        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                let mut count = 0;
                for record in records.iter() {
                    let Ok(record) = record.dyn_into::<MutationRecord>() else {
                        continue;
                    };
                    let added = record.added_nodes();
                    for index in 0..added.length() {
                        if let Some(element) = added.item(index).and_then(|n| n.dyn_into::<Element>().ok()) {
                            count += watcher.scan(&element);
                        }
                    }
                }
                if count > 0 {
                    watcher
                        .logger
                        .debug(format!("highlighted {} inserted comments", count));
                }
            },
        );

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| format!("Failed to create observer: {:?}", e))?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(root, &init)
            .map_err(|e| format!("Failed to observe: {:?}", e))?;

        // Lives as long as the page
        callback.forget();
        Ok(())
    }
}

fn comment_from_element(element: &Element) -> Comment {
    let id = element.get_attribute("thingid").unwrap_or_default();
    let author = element.get_attribute("author").unwrap_or_default();
    let depth = element
        .get_attribute("depth")
        .and_then(|d| d.parse().ok())
        .unwrap_or(0);

    let created = element.get_attribute("created").or_else(|| {
        element
            .query_selector("faceplate-timeago[ts]")
            .ok()
            .flatten()
            .and_then(|timeago| timeago.get_attribute("ts"))
    });

    Comment::new(&id, &author, created.as_deref().unwrap_or(""), depth)
}

fn current_user(document: &Document) -> Option<String> {
    USER_NAME_SELECTORS.iter().find_map(|selector| {
        document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|element| element.text_content())
            .map(|name| name.trim().trim_start_matches("u/").to_string())
            .filter(|name| !name.is_empty())
    })
}
