use super::connection::CdpConnection;
use super::launcher::BrowserProcess;
use crate::config::BrowserSettings;
use crate::errors::SessionError;
use crate::selector::ElementQuery;
use crate::session::{BrowserSession, SessionResult, StorageState};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const DOM_HELPERS: &str = include_str!("dom.js");
const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const LOAD_POLL: Duration = Duration::from_millis(200);
/// Quiet period after `readyState == "complete"` for late XHR-driven renders
const SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

/// One page of a Chrome instance driven over the DevTools protocol
pub struct CdpSession {
    conn: CdpConnection,
    process: Mutex<BrowserProcess>,
}

impl CdpSession {
    /// Start (or attach to) a browser, open a page and preload `storage`
    pub async fn launch(
        settings: &BrowserSettings,
        storage: Option<&StorageState>,
    ) -> SessionResult<Self> {
        let http = reqwest::Client::new();
        let process = BrowserProcess::start(settings, &http).await?;
        let ws_url = process.new_page(&http).await?;
        let conn = CdpConnection::connect(&ws_url, CALL_TIMEOUT).await?;

        for domain in ["Page.enable", "Runtime.enable", "Network.enable"] {
            conn.call(domain, json!({})).await?;
        }

        let session = Self {
            conn,
            process: Mutex::new(process),
        };
        if let Some(state) = storage {
            if let Err(e) = session.install_storage(state).await {
                warn!("[cdp] Could not install session snapshot: {e}; using empty context");
                if let Err(e) = session.conn.call("Network.clearBrowserCookies", json!({})).await {
                    debug!("[cdp] Network.clearBrowserCookies failed: {e}");
                }
            }
        }
        Ok(session)
    }

    async fn install_storage(&self, state: &StorageState) -> SessionResult<()> {
        if !state.cookies.is_empty() {
            let cookies: Vec<Value> = state
                .cookies
                .iter()
                .cloned()
                .map(|mut cookie| {
                    // session cookies are stored with expires = -1
                    if let Some(obj) = cookie.as_object_mut() {
                        if obj.get("expires").and_then(Value::as_f64).is_some_and(|e| e < 0.0) {
                            obj.remove("expires");
                        }
                    }
                    cookie
                })
                .collect();
            self.conn
                .call("Network.setCookies", json!({ "cookies": cookies }))
                .await?;
        }

        for origin in &state.origins {
            if origin.local_storage.is_empty() {
                continue;
            }
            let entries = serde_json::to_string(&origin.local_storage)
                .map_err(|e| SessionError::Protocol(e.to_string()))?;
            let origin_json = serde_json::to_string(&origin.origin)
                .map_err(|e| SessionError::Protocol(e.to_string()))?;
            let source = format!(
                "if (location.origin === {origin_json}) {{ for (const e of {entries}) localStorage.setItem(e.name, e.value); }}"
            );
            self.conn
                .call(
                    "Page.addScriptToEvaluateOnNewDocument",
                    json!({ "source": source }),
                )
                .await?;
        }

        info!(
            "[cdp] Installed {} cookies and storage for {} origins",
            state.cookies.len(),
            state.origins.len()
        );
        Ok(())
    }

    /// Evaluate an expression in the page and return its JSON value
    async fn evaluate(&self, expression: &str) -> SessionResult<Value> {
        let reply = self
            .conn
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = reply.get("exceptionDetails") {
            let message = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("unknown exception");
            return Err(SessionError::Script(message.to_string()));
        }
        Ok(reply
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Run one of the injected DOM helpers
    async fn dom(&self, op: &str, query: &ElementQuery, arg: Option<&str>) -> SessionResult<Value> {
        let query_json =
            serde_json::to_string(query).map_err(|e| SessionError::Protocol(e.to_string()))?;
        let arg_json =
            serde_json::to_string(&arg).map_err(|e| SessionError::Protocol(e.to_string()))?;
        self.evaluate(&format!(
            "{DOM_HELPERS}\nwindow.__flowcapture.{op}({query_json}, {arg_json})"
        ))
        .await
    }

    async fn mouse_click(&self, x: f64, y: f64) -> SessionResult<()> {
        self.conn
            .call(
                "Input.dispatchMouseEvent",
                json!({ "type": "mouseMoved", "x": x, "y": y }),
            )
            .await?;
        for kind in ["mousePressed", "mouseReleased"] {
            self.conn
                .call(
                    "Input.dispatchMouseEvent",
                    json!({ "type": kind, "x": x, "y": y, "button": "left", "clickCount": 1 }),
                )
                .await?;
        }
        Ok(())
    }

    async fn page_string(&self, expression: &str) -> SessionResult<String> {
        match self.evaluate(expression).await? {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn goto(&self, url: &str) -> SessionResult<()> {
        let reply = self.conn.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(err) = reply.get("errorText").and_then(Value::as_str) {
            if !err.is_empty() {
                return Err(SessionError::Protocol(format!("navigate {url}: {err}")));
            }
        }
        debug!("[cdp] Navigated to {url}");
        Ok(())
    }

    async fn wait_for_load(&self, timeout: Duration) -> SessionResult<()> {
        let poll = async {
            loop {
                if self.page_string("document.readyState").await? == "complete" {
                    return Ok::<(), SessionError>(());
                }
                tokio::time::sleep(LOAD_POLL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| SessionError::timeout("page load", timeout))??;
        tokio::time::sleep(SETTLE_DELAY).await;
        Ok(())
    }

    async fn count(&self, query: &ElementQuery) -> SessionResult<usize> {
        let value = self.dom("count", query, None).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| SessionError::Script(format!("count returned {value}")))
    }

    async fn click(&self, query: &ElementQuery) -> SessionResult<()> {
        let value = self.dom("point", query, None).await?;
        if value.is_null() {
            return Err(SessionError::NotFound(query.to_string()));
        }
        let point: Point =
            serde_json::from_value(value).map_err(|e| SessionError::Script(e.to_string()))?;
        self.mouse_click(point.x, point.y).await
    }

    async fn fill(&self, query: &ElementQuery, value: &str) -> SessionResult<()> {
        match self.dom("fill", query, Some(value)).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(SessionError::NotFound(format!("fillable {query}"))),
        }
    }

    async fn select_option(&self, query: &ElementQuery, option: &str) -> SessionResult<()> {
        match self.dom("select", query, Some(option)).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(SessionError::NotFound(format!("{query} with option {option:?}"))),
        }
    }

    async fn type_text(&self, text: &str) -> SessionResult<()> {
        self.conn
            .call("Input.insertText", json!({ "text": text }))
            .await?;
        Ok(())
    }

    async fn screenshot(&self) -> SessionResult<Vec<u8>> {
        let reply = self
            .conn
            .call(
                "Page.captureScreenshot",
                json!({ "format": "png", "captureBeyondViewport": true }),
            )
            .await?;
        let data = reply
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::Protocol("screenshot reply without data".into()))?;
        STANDARD
            .decode(data)
            .map_err(|e| SessionError::Protocol(format!("screenshot base64: {e}")))
    }

    async fn current_url(&self) -> SessionResult<String> {
        self.page_string("location.href").await
    }

    async fn text_content(&self) -> SessionResult<String> {
        self.page_string("document.body ? document.body.innerText : ''")
            .await
    }

    async fn body_html(&self) -> SessionResult<String> {
        self.page_string("document.body ? document.body.innerHTML : ''")
            .await
    }

    async fn close(&self) -> SessionResult<()> {
        let mut process = self.process.lock().await;
        if !process.owns_process() {
            if let Err(e) = self.conn.call("Page.close", json!({})).await {
                warn!("[cdp] Page.close failed: {e}");
            }
        }
        process.shutdown().await
    }
}
