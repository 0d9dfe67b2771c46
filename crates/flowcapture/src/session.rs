//! The browser automation surface the interpreter drives

use crate::errors::{FlowError, Result, SessionError};
use crate::selector::ElementQuery;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// One live page in a browser.
///
/// Element operations act on the first visible match of the query. A session
/// is driven by one run at a time; methods take `&self` so handlers can share
/// it without exclusive borrows.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> SessionResult<()>;

    /// Wait until the page has finished loading and the network is quiet
    async fn wait_for_load(&self, timeout: Duration) -> SessionResult<()>;

    /// Number of visible elements matching `query`
    async fn count(&self, query: &ElementQuery) -> SessionResult<usize>;

    async fn click(&self, query: &ElementQuery) -> SessionResult<()>;

    /// Replace the value of the first matching form control
    async fn fill(&self, query: &ElementQuery, value: &str) -> SessionResult<()>;

    async fn select_option(&self, query: &ElementQuery, option: &str) -> SessionResult<()>;

    /// Raw keyboard input into whatever has focus
    async fn type_text(&self, text: &str) -> SessionResult<()>;

    /// Full-page PNG
    async fn screenshot(&self) -> SessionResult<Vec<u8>>;

    async fn current_url(&self) -> SessionResult<String>;

    /// Visible text of the whole document
    async fn text_content(&self) -> SessionResult<String>;

    /// Markup of `<body>`
    async fn body_html(&self) -> SessionResult<String>;

    async fn close(&self) -> SessionResult<()>;
}

/// Persisted login for one app, in the common browser storage-state layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<serde_json::Value>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginStorage {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

impl StorageState {
    /// Read a snapshot file. `Ok(None)` when it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        let state: StorageState = serde_json::from_str(&text).map_err(|e| {
            FlowError::Config(format!("session snapshot {}: {e}", path.display()))
        })?;
        info!(
            "[session] Loaded snapshot {} ({} cookies, {} origins)",
            path.display(),
            state.cookies.len(),
            state.origins.len()
        );
        Ok(Some(state))
    }
}
