/// Background page: owns thread history and options, answers bridge requests

use crate::clock::Clock;
use crate::error::StorageResult;
use crate::logger::Logger;
use crate::messaging::{MessageHandler, Request, Response};
use crate::options::{ExtensionOptions, Options};
use crate::storage::Storage;
use crate::thread_history::ThreadHistory;
use serde_json::Value;
use std::cell::Cell;

pub struct Background<H: Storage, O: Storage, C: Clock> {
    history: ThreadHistory<H, C>,
    options: ExtensionOptions<O>,
    logger: Logger,
    /// Pushes storage-level settings (area, compression) to the history store
    configure: Box<dyn Fn(&Options)>,
    applied: Cell<bool>,
}

impl<H: Storage, O: Storage, C: Clock> Background<H, O, C> {
    pub fn new(history: ThreadHistory<H, C>, options: ExtensionOptions<O>, logger: Logger) -> Self {
        Background {
            history,
            options,
            logger,
            configure: Box::new(|_| ()),
            applied: Cell::new(false),
        }
    }

    /// Run `configure` with the current options every time they are applied
    pub fn with_storage_settings(mut self, configure: impl Fn(&Options) + 'static) -> Self {
        self.configure = Box::new(configure);
        self
    }

    pub fn history(&self) -> &ThreadHistory<H, C> {
        &self.history
    }

    pub fn options(&self) -> &ExtensionOptions<O> {
        &self.options
    }

    /// Whether stored options have been applied at least once
    pub fn is_applied(&self) -> bool {
        self.applied.get()
    }

    /// Reload options and push retention, debug and storage settings to their users
    pub async fn apply_options(&self) -> StorageResult<Options> {
        let options = self.options.get().await?;
        self.history.set_retention(options.thread_removal_time_seconds);
        self.logger.set_debug(options.debug);
        (self.configure)(&options);
        self.applied.set(true);
        Ok(options)
    }

    pub async fn handle(&self, request: Request) -> StorageResult<Value> {
        self.logger.debug(format!("handling {}", request.method()));

        let value = match request {
            Request::GetThreadHistory(id) => serde_json::to_value(self.history.get(&id).await?)?,
            Request::AddThreadHistory(id) => serde_json::to_value(self.history.add(&id).await?)?,
            Request::RemoveThreadHistory(id) => Value::Bool(self.history.remove(&id).await?),
            Request::ClearThreadHistory => {
                self.history.clear().await?;
                Value::Null
            }
            Request::GetOptions => serde_json::to_value(self.options.get().await?)?,
            Request::SetOptions(patch) => {
                self.options.set(patch).await?;
                self.apply_options().await?;
                Value::Null
            }
            Request::ClearOptions => {
                self.options.clear().await?;
                self.apply_options().await?;
                Value::Null
            }
        };

        Ok(value)
    }
}

impl<H: Storage, O: Storage, C: Clock> MessageHandler for Background<H, O, C> {
    async fn handle_message(&self, message: Value) -> Value {
        let method = message
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        // A cold start may deliver requests before the startup apply finished
        if !self.applied.get() {
            if let Err(e) = self.apply_options().await {
                self.logger.error(format!("cannot apply options for {}: {}", method, e));
                let response = Response::error(&method, format!("options unavailable: {}", e));
                return serde_json::to_value(response).unwrap_or(Value::Null);
            }
        }

        let response = match serde_json::from_value::<Request>(message) {
            Ok(request) => match self.handle(request).await {
                Ok(value) => Response::result(&method, value),
                Err(e) => {
                    self.logger.error(format!("{} failed: {}", method, e));
                    Response::error(&method, e.to_string())
                }
            },
            Err(e) => {
                self.logger.warn(format!("rejecting malformed request {}: {}", method, e));
                Response::error(&method, format!("invalid request: {}", e))
            }
        };

        serde_json::to_value(response).unwrap_or(Value::Null)
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::{BackgroundService, start};

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::Background;
    use crate::clock::BrowserClock;
    use crate::logger::Logger;
    use crate::messaging::MessageHandler;
    use crate::options::{ExtensionOptions, Options};
    use crate::storage::{
        CachedStorage, CompressedStorage, ExtensionStorage, OPTIONS_KEY, StorageArea,
        THREAD_HISTORY_KEY,
    };
    use crate::thread_history::{DEFAULT_RETENTION_SECONDS, ThreadHistory};
    use serde::Serialize;
    use serde_json::Value;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{future_to_promise, spawn_local};

    type HistoryStorage = Rc<CompressedStorage<CachedStorage<Rc<ExtensionStorage>>>>;
    type OptionsStorage = CachedStorage<ExtensionStorage>;
    type BrowserBackground = Background<HistoryStorage, OptionsStorage, BrowserClock>;

    /// Handle given to the service worker script, which owns the
    /// `chrome.runtime.onMessage` listener and forwards requests here
    #[wasm_bindgen]
    pub struct BackgroundService {
        background: Rc<BrowserBackground>,
    }

    #[wasm_bindgen]
    impl BackgroundService {
        /// Answer one runtime message; resolves to the response envelope
        pub fn handle(&self, message: JsValue) -> js_sys::Promise {
            let background = self.background.clone();
            future_to_promise(async move {
                let message: Value = serde_wasm_bindgen::from_value(message).unwrap_or(Value::Null);
                let response = background.handle_message(message).await;
                response
                    .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                    .map_err(|e| JsValue::from_str(&e.to_string()))
            })
        }
    }

    pub fn start(logger: Logger) -> BackgroundService {
        let history_area = Rc::new(ExtensionStorage::new(StorageArea::Sync, THREAD_HISTORY_KEY));
        let history_storage: HistoryStorage = Rc::new(CompressedStorage::new(
            CachedStorage::new(history_area.clone()),
            false,
        ));
        let history = ThreadHistory::new(
            history_storage.clone(),
            BrowserClock,
            logger.child("thread-history"),
            DEFAULT_RETENTION_SECONDS,
        );
        let options = ExtensionOptions::new(
            CachedStorage::new(ExtensionStorage::new(StorageArea::Sync, OPTIONS_KEY)),
            Options::default(),
            logger.child("options"),
        );

        let background: Rc<BrowserBackground> = Rc::new(
            Background::new(history, options, logger.clone()).with_storage_settings(
                move |options: &Options| {
                    history_area.set_area(if options.sync {
                        StorageArea::Sync
                    } else {
                        StorageArea::Local
                    });
                    history_storage.set_enabled(options.use_compression);
                },
            ),
        );

        // Changes made from another device or context
        {
            let weak = Rc::downgrade(&background);
            let logger = logger.clone();
            background.options().on_change().subscribe(move |_| {
                let Some(background) = weak.upgrade() else {
                    return;
                };
                let logger = logger.clone();
                spawn_local(async move {
                    if let Err(e) = background.apply_options().await {
                        logger.error(format!("failed to apply options: {}", e));
                    }
                });
            });
        }

        {
            let background = background.clone();
            let logger = logger.clone();
            spawn_local(async move {
                if let Err(e) = background.apply_options().await {
                    logger.error(format!("failed to apply options: {}", e));
                }
            });
        }

        logger.info("background started");
        BackgroundService { background }
    }
}
