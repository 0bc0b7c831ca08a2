/// Scoped logger passed explicitly to the components that log.
///
/// Records go through the `log` facade (the sink is `wasm-logger`, set up once
/// in the wasm start function). Each logger carries its own target so console
/// output shows which part of the extension wrote it. Debug records are only
/// emitted while the shared debug flag is on; the flag follows the `debug`
/// option and is shared by every logger derived with `child`.
use std::cell::Cell;
use std::fmt::Display;
use std::rc::Rc;

use log::Level;

#[derive(Clone)]
pub struct Logger {
    scope: String,
    debug: Rc<Cell<bool>>,
}

impl Logger {
    pub fn new(scope: &str) -> Self {
        Logger {
            scope: scope.to_string(),
            debug: Rc::new(Cell::new(false)),
        }
    }

    /// Derive a logger for a sub-component, sharing the debug flag
    pub fn child(&self, scope: &str) -> Self {
        Logger {
            scope: format!("{}::{}", self.scope, scope),
            debug: self.debug.clone(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.set(enabled);
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.get()
    }

    pub fn debug(&self, message: impl Display) {
        if self.debug.get() {
            self.log(Level::Debug, message);
        }
    }

    pub fn info(&self, message: impl Display) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl Display) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl Display) {
        self.log(Level::Error, message);
    }

    fn log(&self, level: Level, message: impl Display) {
        log::log!(target: self.scope.as_str(), level, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_scope() {
        let root = Logger::new("background");
        let child = root.child("thread-history");

        assert_eq!(child.scope(), "background::thread-history");
    }

    #[test]
    fn test_children_share_debug_flag() {
        let root = Logger::new("content");
        let child = root.child("highlighter");

        assert!(!child.debug_enabled());
        root.set_debug(true);
        assert!(child.debug_enabled());
        child.set_debug(false);
        assert!(!root.debug_enabled());
    }
}
