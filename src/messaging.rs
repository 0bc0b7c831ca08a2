/// Typed messages between the content script and the background page.
///
/// Requests travel as `{method, arg}` and are answered with `{method, result}`
/// or `{method, error}`. Both ends decode into the types below, so a message
/// with an unknown method or a badly shaped argument is rejected at the edge.

use crate::error::{BridgeError, BridgeResult};
use crate::options::{Options, OptionsPatch};
use crate::thread_history::ThreadHistoryEntry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "arg", rename_all = "camelCase")]
pub enum Request {
    GetThreadHistory(String),
    AddThreadHistory(String),
    RemoveThreadHistory(String),
    ClearThreadHistory,
    GetOptions,
    SetOptions(OptionsPatch),
    ClearOptions,
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::GetThreadHistory(_) => "getThreadHistory",
            Request::AddThreadHistory(_) => "addThreadHistory",
            Request::RemoveThreadHistory(_) => "removeThreadHistory",
            Request::ClearThreadHistory => "clearThreadHistory",
            Request::GetOptions => "getOptions",
            Request::SetOptions(_) => "setOptions",
            Request::ClearOptions => "clearOptions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub method: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    pub fn result(method: &str, value: Value) -> Self {
        Response {
            method: method.to_string(),
            outcome: Outcome::Result(value),
        }
    }

    pub fn error(method: &str, message: String) -> Self {
        Response {
            method: method.to_string(),
            outcome: Outcome::Error(message),
        }
    }
}

/// Something that answers raw request messages with raw response messages
#[allow(async_fn_in_trait)]
pub trait MessageHandler {
    async fn handle_message(&self, message: Value) -> Value;
}

/// Carries a request message to whichever context serves it
#[allow(async_fn_in_trait)]
pub trait Bridge {
    async fn send(&self, message: Value) -> BridgeResult<Value>;
}

/// Calls a handler living in the same context directly
pub struct LocalBridge<H: MessageHandler> {
    handler: Rc<H>,
}

impl<H: MessageHandler> LocalBridge<H> {
    pub fn new(handler: Rc<H>) -> Self {
        LocalBridge { handler }
    }
}

impl<H: MessageHandler> Bridge for LocalBridge<H> {
    async fn send(&self, message: Value) -> BridgeResult<Value> {
        Ok(self.handler.handle_message(message).await)
    }
}

#[cfg(target_arch = "wasm32")]
pub use runtime::RuntimeBridge;

#[cfg(target_arch = "wasm32")]
mod runtime {
    use super::Bridge;
    use crate::error::{BridgeError, BridgeResult};
    use crate::storage::js_error_message;
    use serde::Serialize;
    use serde_json::Value;
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen(module = "/bridge.js")]
    extern "C" {
        #[wasm_bindgen(catch)]
        async fn sendMessage(message: JsValue) -> Result<JsValue, JsValue>;
    }

    /// Sends requests over `chrome.runtime.sendMessage`
    #[derive(Clone, Copy, Default)]
    pub struct RuntimeBridge;

    impl Bridge for RuntimeBridge {
        async fn send(&self, message: Value) -> BridgeResult<Value> {
            let message_js = message
                .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                .map_err(|e| BridgeError::Transport(e.to_string()))?;

            let response_js = sendMessage(message_js)
                .await
                .map_err(|e| BridgeError::Transport(js_error_message(&e)))?;

            serde_wasm_bindgen::from_value(response_js)
                .map_err(|e| BridgeError::Malformed(e.to_string()))
        }
    }
}

/// Typed calls into the background page
pub struct BackgroundClient<B: Bridge> {
    bridge: B,
}

impl<B: Bridge> BackgroundClient<B> {
    pub fn new(bridge: B) -> Self {
        BackgroundClient { bridge }
    }

    pub async fn get_thread_history(&self, id: &str) -> BridgeResult<Option<ThreadHistoryEntry>> {
        self.call(Request::GetThreadHistory(id.to_string())).await
    }

    pub async fn add_thread_history(&self, id: &str) -> BridgeResult<ThreadHistoryEntry> {
        self.call(Request::AddThreadHistory(id.to_string())).await
    }

    pub async fn remove_thread_history(&self, id: &str) -> BridgeResult<bool> {
        self.call(Request::RemoveThreadHistory(id.to_string())).await
    }

    pub async fn clear_thread_history(&self) -> BridgeResult<()> {
        self.call(Request::ClearThreadHistory).await
    }

    pub async fn get_options(&self) -> BridgeResult<Options> {
        self.call(Request::GetOptions).await
    }

    pub async fn set_options(&self, patch: OptionsPatch) -> BridgeResult<()> {
        self.call(Request::SetOptions(patch)).await
    }

    pub async fn clear_options(&self) -> BridgeResult<()> {
        self.call(Request::ClearOptions).await
    }

    async fn call<T: DeserializeOwned>(&self, request: Request) -> BridgeResult<T> {
        let method = request.method();
        let message =
            serde_json::to_value(&request).map_err(|e| BridgeError::Transport(e.to_string()))?;

        let raw = self.bridge.send(message).await?;
        let response: Response =
            serde_json::from_value(raw).map_err(|e| BridgeError::Malformed(e.to_string()))?;

        if response.method != method {
            return Err(BridgeError::MethodMismatch {
                expected: method.to_string(),
                actual: response.method,
            });
        }

        match response.outcome {
            Outcome::Result(value) => {
                serde_json::from_value(value).map_err(|e| BridgeError::Malformed(e.to_string()))
            }
            Outcome::Error(message) => Err(BridgeError::Remote(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// Bridge answering every message with a canned response
    struct CannedBridge {
        response: Value,
        sent: RefCell<Vec<Value>>,
    }

    impl Bridge for CannedBridge {
        async fn send(&self, message: Value) -> BridgeResult<Value> {
            self.sent.borrow_mut().push(message);
            Ok(self.response.clone())
        }
    }

    fn client(response: Value) -> BackgroundClient<CannedBridge> {
        BackgroundClient::new(CannedBridge {
            response,
            sent: RefCell::new(Vec::new()),
        })
    }

    #[test]
    fn test_request_wire_format() {
        let request = Request::GetThreadHistory("abc".to_string());
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"method": "getThreadHistory", "arg": "abc"})
        );

        let request = Request::SetOptions(OptionsPatch::new().set("debug", true));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"method": "setOptions", "arg": {"debug": true}})
        );
    }

    #[test]
    fn test_method_names_match_wire_tags() {
        let requests = vec![
            Request::GetThreadHistory("a".to_string()),
            Request::AddThreadHistory("a".to_string()),
            Request::RemoveThreadHistory("a".to_string()),
            Request::ClearThreadHistory,
            Request::GetOptions,
            Request::SetOptions(OptionsPatch::new()),
            Request::ClearOptions,
        ];

        for request in requests {
            let value = serde_json::to_value(&request).unwrap();
            assert_eq!(value["method"], request.method());
        }
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let parsed = serde_json::from_value::<Request>(json!({"method": "dropTables", "arg": 1}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_response_wire_format() {
        let ok = Response::result("getOptions", json!({"debug": false}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"method": "getOptions", "result": {"debug": false}})
        );

        let err = Response::error("getOptions", "boom".to_string());
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value, json!({"method": "getOptions", "error": "boom"}));
        assert_eq!(serde_json::from_value::<Response>(value).unwrap(), err);
    }

    #[test]
    fn test_client_decodes_result() {
        let client = client(json!({
            "method": "getThreadHistory",
            "result": {"id": "abc", "timestamp": 42}
        }));

        let entry = pollster::block_on(client.get_thread_history("abc")).unwrap();

        assert_eq!(
            entry,
            Some(ThreadHistoryEntry {
                id: "abc".to_string(),
                timestamp: 42
            })
        );
        assert_eq!(
            client.bridge.sent.borrow()[0],
            json!({"method": "getThreadHistory", "arg": "abc"})
        );
    }

    #[test]
    fn test_client_null_result() {
        let client = client(json!({"method": "getThreadHistory", "result": null}));
        assert_eq!(pollster::block_on(client.get_thread_history("abc")).unwrap(), None);
    }

    #[test]
    fn test_client_remote_error() {
        let client = client(json!({"method": "clearOptions", "error": "quota"}));

        let err = pollster::block_on(client.clear_options()).unwrap_err();

        assert_eq!(err, BridgeError::Remote("quota".to_string()));
    }

    #[test]
    fn test_client_method_mismatch() {
        let client = client(json!({"method": "getOptions", "result": null}));

        let err = pollster::block_on(client.clear_thread_history()).unwrap_err();

        assert!(matches!(err, BridgeError::MethodMismatch { .. }));
    }

    #[test]
    fn test_client_malformed_response() {
        let client = client(json!("not an envelope"));
        let err = pollster::block_on(client.get_options()).unwrap_err();
        assert!(matches!(err, BridgeError::Malformed(_)));

        let client = self::client(json!({"method": "getOptions", "result": 7}));
        let err = pollster::block_on(client.get_options()).unwrap_err();
        assert!(matches!(err, BridgeError::Malformed(_)));
    }
}
