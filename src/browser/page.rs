use crate::document::{Document, ElementInfo};
use crate::error::{HealError, Result};
use crate::locator::ElementHandle;
use async_trait::async_trait;
use headless_chrome::Tab;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// In-page implementation of the locator dialect
const LOCATE_JS: &str = include_str!("locate.js");

/// A browser tab seen as a [`Document`].
///
/// Queries run `locate.js` in the page; keyboard input goes through the
/// DevTools protocol so the page sees real key events. headless_chrome is
/// blocking, so every call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct PageDocument {
    tab: Arc<Tab>,
}

impl PageDocument {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    /// The wrapped tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<Tab>) -> Result<T> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || f(tab))
            .await
            .map_err(|e| HealError::EvaluationFailed(format!("Browser task failed: {}", e)))?
    }

    /// Run one `locate.js` operation and decode its `result`
    async fn locate<T>(&self, op: &'static str, selector: &str, arg: Value) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let script = build_script(op, selector, &arg);
        let selector = selector.to_string();
        self.blocking(move |tab| {
            let remote = tab
                .evaluate(&script, false)
                .map_err(|e| HealError::EvaluationFailed(e.to_string()))?;
            let raw = remote
                .value
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| HealError::EvaluationFailed("locator script returned no value".to_string()))?;
            decode_reply(&selector, &raw)
        })
        .await
    }

    async fn interact(&self, action: &'static str, op: &'static str, handle: &ElementHandle) -> Result<()> {
        self.locate::<bool>(op, &handle.selector, Value::from(handle.nth))
            .await
            .map(|_| ())
            .map_err(|e| HealError::InteractionFailed { action: action.to_string(), reason: e.to_string() })
    }
}

fn build_script(op: &str, selector: &str, arg: &Value) -> String {
    format!(
        "({})({}, {}, {})",
        LOCATE_JS.trim_end(),
        Value::from(op),
        Value::from(selector),
        arg
    )
}

/// Decode `{"result": ..}` / `{"error": ".."}` from the locator script
fn decode_reply<T: DeserializeOwned>(selector: &str, raw: &str) -> Result<T> {
    let mut reply: Value =
        serde_json::from_str(raw).map_err(|e| HealError::EvaluationFailed(format!("Malformed reply: {}", e)))?;
    if let Some(error) = reply.get("error").and_then(Value::as_str) {
        return Err(HealError::query(selector, error));
    }
    let result = reply
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| HealError::EvaluationFailed("Reply without result".to_string()))?;
    serde_json::from_value(result).map_err(|e| HealError::EvaluationFailed(format!("Unexpected reply: {}", e)))
}

#[async_trait]
impl Document for PageDocument {
    async fn count(&self, selector: &str) -> Result<usize> {
        self.locate("count", selector, Value::Null).await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementInfo>> {
        self.locate("query", selector, Value::Null).await
    }

    async fn content(&self) -> Result<String> {
        self.blocking(|tab| tab.get_content().map_err(|e| HealError::EvaluationFailed(e.to_string())))
            .await
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        self.interact("click", "click", handle).await
    }

    async fn fill(&self, handle: &ElementHandle, text: &str) -> Result<()> {
        self.interact("fill", "clear", handle).await?;
        let text = text.to_string();
        self.blocking(move |tab| {
            tab.type_str(&text)
                .map(|_| ())
                .map_err(|e| HealError::InteractionFailed { action: "fill".to_string(), reason: e.to_string() })
        })
        .await
    }

    async fn press(&self, handle: &ElementHandle, key: &str) -> Result<()> {
        self.interact("press", "focus", handle).await?;
        let key = key.to_string();
        self.blocking(move |tab| {
            tab.press_key(&key)
                .map(|_| ())
                .map_err(|e| HealError::InteractionFailed { action: "press".to_string(), reason: e.to_string() })
        })
        .await
    }
}
