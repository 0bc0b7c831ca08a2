/// Reddit Comment Highlighter - Chrome Extension highlighting comments
/// posted since your last visit to a thread.
/// Built with Rust + WASM + Yew

pub mod background;
pub mod clock;
pub mod comment;
pub mod css;
pub mod error;
pub mod events;
pub mod logger;
pub mod messaging;
pub mod options;
pub mod storage;
pub mod thread_history;
pub mod thread_url;

#[cfg(target_arch = "wasm32")]
mod content;
#[cfg(target_arch = "wasm32")]
pub mod highlighter;
#[cfg(target_arch = "wasm32")]
pub mod ui;

#[cfg(target_arch = "wasm32")]
pub use entry::*;

#[cfg(target_arch = "wasm32")]
mod entry {
    use crate::logger::Logger;
    use wasm_bindgen::prelude::*;

    // Set up panic hook for better error messages in the browser console
    #[wasm_bindgen(start)]
    pub fn main() {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));
    }

    // Re-export thread id parsing for JavaScript access
    #[wasm_bindgen]
    pub fn thread_id_from_url(url: &str) -> Option<String> {
        crate::thread_url::thread_id_from_url(url)
    }

    // Start the service worker side; background.js forwards runtime messages to the result
    #[wasm_bindgen]
    pub fn start_background() -> crate::background::BackgroundService {
        crate::background::start(Logger::new("background"))
    }

    // Start highlighting on a reddit page
    #[wasm_bindgen]
    pub fn start_content_script() {
        crate::content::start(Logger::new("content"));
    }

    // Start the Yew app for the options page
    #[wasm_bindgen]
    pub fn start_options_page() {
        yew::Renderer::<crate::ui::options_page::OptionsPage>::new().render();
    }
}
