use crate::errors::SessionError;
use crate::session::SessionResult;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type CallResult = Result<Value, String>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<CallResult>>>>;

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

/// Either a reply to one of our requests or an unsolicited event
#[derive(Deserialize)]
struct Incoming {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<ProtocolError>,
    method: Option<String>,
}

#[derive(Deserialize)]
struct ProtocolError {
    code: i64,
    message: String,
}

/// WebSocket connection to one DevTools target.
///
/// Requests are correlated with replies by id. A writer task owns the sink and
/// a reader task routes replies to the waiting caller.
pub struct CdpConnection {
    sender: mpsc::UnboundedSender<Message>,
    pending: Pending,
    next_id: AtomicU64,
    timeout: Duration,
    tasks: [tokio::task::JoinHandle<()>; 2],
}

impl CdpConnection {
    pub async fn connect(ws_url: &str, timeout: Duration) -> SessionResult<Self> {
        tracing::info!("[cdp] Connecting to {}", ws_url);
        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| SessionError::Connection(format!("{ws_url}: {e}")))?;

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let pending_clone = pending.clone();
        let (mut sink, mut stream) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let writer_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    tracing::error!("[cdp] send error: {}", e);
                    break;
                }
            }
            tracing::debug!("[cdp] writer task ended");
        });

        let reader_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                if !msg.is_text() {
                    continue;
                }
                let txt = msg.into_text().unwrap_or_default();
                match serde_json::from_str::<Incoming>(&txt) {
                    Ok(Incoming { id: Some(id), result, error, .. }) => {
                        if let Some(tx) = pending_clone.lock().await.remove(&id) {
                            let _ = tx.send(match error {
                                Some(err) => Err(format!("{} ({})", err.message, err.code)),
                                None => Ok(result.unwrap_or(Value::Null)),
                            });
                        }
                    }
                    Ok(Incoming { method: Some(method), .. }) => {
                        tracing::trace!("[cdp] event {}", method);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("[cdp] invalid JSON from browser: {}", e),
                }
            }
            tracing::debug!("[cdp] reader task ended - connection closed");
            // wake everyone still waiting
            pending_clone.lock().await.clear();
        });

        Ok(Self {
            sender: tx,
            pending,
            next_id: AtomicU64::new(1),
            timeout,
            tasks: [writer_task, reader_task],
        })
    }

    /// Send one command and wait for its reply
    pub async fn call(&self, method: &str, params: Value) -> SessionResult<Value> {
        self.call_with_timeout(method, params, self.timeout).await
    }

    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> SessionResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::to_string(&Request { id, method, params })
            .map_err(|e| SessionError::Protocol(format!("serialize {method}: {e}")))?;

        let (tx, rx) = oneshot::channel::<CallResult>();
        self.pending.lock().await.insert(id, tx);
        tracing::debug!(id, method, "[cdp] ->");

        if self.sender.send(Message::Text(payload)).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(SessionError::Connection("browser connection closed".into()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(SessionError::Protocol(format!("{method}: {err}"))),
            Ok(Err(_canceled)) => Err(SessionError::Connection(format!(
                "connection dropped while waiting for {method}"
            ))),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                tracing::warn!("[cdp] timed out waiting for {} (id={})", method, id);
                Err(SessionError::timeout(method, timeout))
            }
        }
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
