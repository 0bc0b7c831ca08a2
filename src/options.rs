/// Extension options: defaults overlaid with the user's persisted overrides.
///
/// Only overrides are stored. Reading merges them over the defaults, so a key
/// that was never set (or was reset) always follows the current default.

use crate::error::{StorageError, StorageResult};
use crate::events::{Event, ListenerToken};
use crate::logger::Logger;
use crate::storage::Storage;
use crate::thread_history::DEFAULT_RETENTION_SECONDS;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CLASS_NAME: &str = "comment-highlighter-new";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Background of new comments, light scheme
    pub back_color: String,
    /// Text color of new comments, light scheme
    pub front_color: String,
    pub back_color_dark: String,
    pub front_color_dark: String,
    /// CSS border shorthand, empty for none
    pub border: String,
    /// Appended verbatim to the generated stylesheet
    pub custom_css: String,
    pub class_name: String,
    pub clear_comment_on_click: bool,
    pub clear_comment_include_children: bool,
    /// Length of the fade-out after a click, in milliseconds
    pub clear_comment_transition_ms: u32,
    /// History entries older than this are dropped on the next save
    pub thread_removal_time_seconds: u64,
    pub use_compression: bool,
    /// Keep history in chrome.storage.sync rather than local
    pub sync: bool,
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            back_color: "#fffdcc".to_string(),
            front_color: "#000000".to_string(),
            back_color_dark: "#424242".to_string(),
            front_color_dark: "#ffffff".to_string(),
            border: String::new(),
            custom_css: String::new(),
            class_name: DEFAULT_CLASS_NAME.to_string(),
            clear_comment_on_click: true,
            clear_comment_include_children: false,
            clear_comment_transition_ms: 500,
            thread_removal_time_seconds: DEFAULT_RETENTION_SECONDS,
            use_compression: false,
            sync: true,
            debug: false,
        }
    }
}

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

impl Options {
    /// Retention rounded down to whole days, never below one
    pub fn retention_days(&self) -> u64 {
        (self.thread_removal_time_seconds / SECONDS_PER_DAY).max(1)
    }

    pub fn set_retention_days(&mut self, days: u64) {
        self.thread_removal_time_seconds = days.max(1).saturating_mul(SECONDS_PER_DAY);
    }

    /// Fade-out length in the form browser timers accept
    pub fn transition_delay_ms(&self) -> i32 {
        i32::try_from(self.clear_comment_transition_ms).unwrap_or(i32::MAX)
    }

    /// Checks values that deserialize but would break highlighting
    pub fn validate(&self) -> StorageResult<()> {
        if !is_class_name(&self.class_name) {
            return Err(StorageError::InvalidOptions(format!(
                "class name {:?} is not a single CSS identifier",
                self.class_name
            )));
        }
        Ok(())
    }
}

/// Letters, digits, `-` and `_`, not starting with a digit. The name goes
/// into a class list and into `.name` selectors unescaped.
fn is_class_name(name: &str) -> bool {
    match name.chars().next() {
        Some(first) if !first.is_ascii_digit() => name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        _ => false,
    }
}

/// Partial update. A `null` value resets the key to its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsPatch(Map<String, Value>);

impl OptionsPatch {
    pub fn new() -> Self {
        OptionsPatch(Map::new())
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn unset(mut self, key: &str) -> Self {
        self.0.insert(key.to_string(), Value::Null);
        self
    }

    /// Patch turning `defaults` into `edited`: fields equal to their default
    /// are unset so they keep following it, all others are set
    pub fn between(defaults: &Options, edited: &Options) -> StorageResult<Self> {
        let defaults = to_map(defaults)?;
        let edited = to_map(edited)?;

        let patch = edited
            .into_iter()
            .map(|(key, value)| {
                if defaults.get(&key) == Some(&value) {
                    (key, Value::Null)
                } else {
                    (key, value)
                }
            })
            .collect();
        Ok(OptionsPatch(patch))
    }
}

pub struct ExtensionOptions<S: Storage> {
    storage: S,
    defaults: Options,
    logger: Logger,
    changed: Event<()>,
    token: ListenerToken,
}

impl<S: Storage> ExtensionOptions<S> {
    pub fn new(storage: S, defaults: Options, logger: Logger) -> Self {
        let changed = Event::new();
        let token = {
            let changed = changed.clone();
            storage.on_change().subscribe(move |_| changed.emit(&()))
        };

        ExtensionOptions {
            storage,
            defaults,
            logger,
            changed,
            token,
        }
    }

    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Fired whenever the stored overrides change, from any context
    pub fn on_change(&self) -> &Event<()> {
        &self.changed
    }

    pub async fn get(&self) -> StorageResult<Options> {
        let mut merged = self.defaults_map()?;
        for (key, value) in self.load_overrides().await? {
            merged.insert(key, value);
        }

        serde_json::from_value(Value::Object(merged)).map_err(|e| {
            self.logger
                .error(format!("stored options are invalid: {}", e));
            StorageError::InvalidOptions(e.to_string())
        })
    }

    pub async fn set(&self, patch: OptionsPatch) -> StorageResult<()> {
        let defaults = self.defaults_map()?;
        let mut overrides = self.load_overrides().await?;

        for (key, value) in patch.0 {
            overrides.insert(key, value);
        }
        overrides.retain(|key, value| {
            let known = defaults.contains_key(key);
            if !known {
                self.logger.warn(format!("ignoring unknown option {}", key));
            }
            known && !value.is_null()
        });

        // Reject patches that would make `get` fail
        let mut merged = defaults;
        for (key, value) in &overrides {
            merged.insert(key.clone(), value.clone());
        }
        serde_json::from_value::<Options>(Value::Object(merged))
            .map_err(|e| StorageError::InvalidOptions(e.to_string()))?
            .validate()?;

        self.logger
            .debug(format!("saving {} option overrides", overrides.len()));
        self.storage.save(Value::Object(overrides)).await
    }

    /// Drop every override, reverting to defaults
    pub async fn clear(&self) -> StorageResult<()> {
        self.storage.clear().await
    }

    async fn load_overrides(&self) -> StorageResult<Map<String, Value>> {
        match self.storage.load().await? {
            Some(Value::Object(map)) => Ok(map),
            Some(Value::Null) | None => Ok(Map::new()),
            Some(other) => {
                self.logger
                    .warn(format!("discarding non-object options value {}", other));
                Ok(Map::new())
            }
        }
    }

    fn defaults_map(&self) -> StorageResult<Map<String, Value>> {
        to_map(&self.defaults)
    }
}

fn to_map(options: &Options) -> StorageResult<Map<String, Value>> {
    match serde_json::to_value(options)? {
        Value::Object(map) => Ok(map),
        _ => Err(StorageError::Serialization(
            "options did not serialize to an object".to_string(),
        )),
    }
}

impl<S: Storage> Drop for ExtensionOptions<S> {
    fn drop(&mut self) {
        self.storage.on_change().unsubscribe(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pollster::block_on;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn create_options() -> (ExtensionOptions<Rc<MemoryStorage>>, Rc<MemoryStorage>) {
        let storage = Rc::new(MemoryStorage::new("options"));
        let options = ExtensionOptions::new(storage.clone(), Options::default(), Logger::new("test"));
        (options, storage)
    }

    #[test]
    fn test_get_on_empty_storage_returns_defaults() {
        let (options, _) = create_options();
        assert_eq!(block_on(options.get()).unwrap(), Options::default());
    }

    #[test]
    fn test_custom_defaults() {
        let storage = Rc::new(MemoryStorage::new("options"));
        let defaults = Options {
            class_name: "fresh".to_string(),
            ..Options::default()
        };
        let options = ExtensionOptions::new(storage, defaults.clone(), Logger::new("test"));

        assert_eq!(block_on(options.get()).unwrap(), defaults);
    }

    #[test]
    fn test_set_changes_only_given_key() {
        let (options, _) = create_options();
        block_on(options.set(OptionsPatch::new().set("backColor", "#ff0000"))).unwrap();
        block_on(options.set(OptionsPatch::new().set("debug", true))).unwrap();

        let current = block_on(options.get()).unwrap();

        assert_eq!(
            current,
            Options {
                back_color: "#ff0000".to_string(),
                debug: true,
                ..Options::default()
            }
        );
    }

    #[test]
    fn test_only_overrides_are_persisted() {
        let (options, storage) = create_options();
        block_on(options.set(OptionsPatch::new().set("sync", false))).unwrap();

        assert_eq!(storage.snapshot(), Some(json!({"sync": false})));
    }

    #[test]
    fn test_unset_removes_override() {
        let (options, storage) = create_options();
        block_on(options.set(OptionsPatch::new().set("className", "mine").set("debug", true))).unwrap();

        block_on(options.set(OptionsPatch::new().unset("className"))).unwrap();

        assert_eq!(storage.snapshot(), Some(json!({"debug": true})));
        assert_eq!(block_on(options.get()).unwrap().class_name, DEFAULT_CLASS_NAME);
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let (options, storage) = create_options();

        block_on(options.set(OptionsPatch::new().set("noSuchOption", 1).set("debug", true))).unwrap();

        assert_eq!(storage.snapshot(), Some(json!({"debug": true})));
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let (options, storage) = create_options();

        let err = block_on(options.set(OptionsPatch::new().set("threadRemovalTimeSeconds", "soon")))
            .unwrap_err();

        assert!(matches!(err, StorageError::InvalidOptions(_)));
        assert_eq!(storage.snapshot(), None);
    }

    #[test]
    fn test_clear_reverts_to_defaults() {
        let (options, _) = create_options();
        block_on(options.set(OptionsPatch::new().set("border", "1px solid red"))).unwrap();

        block_on(options.clear()).unwrap();

        assert_eq!(block_on(options.get()).unwrap(), Options::default());
    }

    #[test]
    fn test_patch_between_stores_only_differences() {
        let (options, storage) = create_options();
        block_on(options.set(OptionsPatch::new().set("debug", true))).unwrap();
        let edited = Options {
            custom_css: ".x { color: red }".to_string(),
            use_compression: true,
            ..Options::default()
        };

        let patch = OptionsPatch::between(&Options::default(), &edited).unwrap();
        block_on(options.set(patch)).unwrap();

        assert_eq!(block_on(options.get()).unwrap(), edited);
        assert_eq!(
            storage.snapshot(),
            Some(json!({"customCss": ".x { color: red }", "useCompression": true}))
        );
    }

    #[test]
    fn test_external_change_is_announced() {
        let (options, storage) = create_options();
        let calls = Rc::new(Cell::new(0));
        {
            let calls = calls.clone();
            options.on_change().subscribe(move |_| calls.set(calls.get() + 1));
        }

        storage.set_external(json!({"debug": true}));

        assert_eq!(calls.get(), 1);
        assert!(block_on(options.get()).unwrap().debug);
    }

    #[test]
    fn test_unusable_class_name_is_rejected() {
        let (options, storage) = create_options();

        for name in ["", "two words", "9lives", "a.b"] {
            let err = block_on(options.set(OptionsPatch::new().set("className", name))).unwrap_err();
            assert!(matches!(err, StorageError::InvalidOptions(_)), "{:?} accepted", name);
        }
        assert_eq!(storage.write_count(), 0);

        block_on(options.set(OptionsPatch::new().set("className", "my-class_2"))).unwrap();
        assert_eq!(block_on(options.get()).unwrap().class_name, "my-class_2");
    }

    #[test]
    fn test_retention_days_saturate() {
        let mut options = Options::default();
        assert_eq!(options.retention_days(), 7);

        options.set_retention_days(0);
        assert_eq!(options.thread_removal_time_seconds, 24 * 60 * 60);

        options.set_retention_days(u64::MAX);
        assert_eq!(options.thread_removal_time_seconds, u64::MAX);
    }

    #[test]
    fn test_transition_delay_clamps_to_timer_range() {
        let mut options = Options::default();
        assert_eq!(options.transition_delay_ms(), 500);

        options.clear_comment_transition_ms = u32::MAX;
        assert_eq!(options.transition_delay_ms(), i32::MAX);
    }
}
