use crate::config::BrowserSettings;
use crate::errors::SessionError;
use crate::session::SessionResult;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);
const STARTUP_POLL: Duration = Duration::from_millis(250);

/// A browser we can reach over DevTools. Owns the process when we launched it.
pub struct BrowserProcess {
    pub http_endpoint: String,
    child: Option<Child>,
    _profile: Option<TempDir>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetInfo {
    web_socket_debugger_url: String,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "Browser")]
    browser: String,
}

fn launch_args(settings: &BrowserSettings, profile_dir: &std::path::Path) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", settings.debugging_port),
        format!("--user-data-dir={}", profile_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-popup-blocking".to_string(),
        "--window-size=1440,900".to_string(),
    ];
    if settings.headless {
        args.push("--headless=new".to_string());
    }
    args.push("about:blank".to_string());
    args
}

impl BrowserProcess {
    /// Attach to `settings.endpoint`, or launch a browser with a throwaway profile
    pub async fn start(settings: &BrowserSettings, http: &reqwest::Client) -> SessionResult<Self> {
        if let Some(endpoint) = &settings.endpoint {
            let endpoint = endpoint.trim_end_matches('/').to_string();
            let version = fetch_version(http, &endpoint).await?;
            info!("[cdp] Attached to {} at {}", version.browser, endpoint);
            return Ok(Self {
                http_endpoint: endpoint,
                child: None,
                _profile: None,
            });
        }

        let profile = tempfile::tempdir()
            .map_err(|e| SessionError::Launch(format!("profile dir: {e}")))?;
        let args = launch_args(settings, profile.path());
        debug!("[cdp] {} {}", settings.executable, args.join(" "));

        let child = Command::new(&settings.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::Launch(format!("{}: {e}", settings.executable)))?;

        let endpoint = format!("http://127.0.0.1:{}", settings.debugging_port);
        let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
        let version = loop {
            match fetch_version(http, &endpoint).await {
                Ok(v) => break v,
                Err(e) if tokio::time::Instant::now() >= deadline => {
                    return Err(SessionError::Launch(format!(
                        "browser did not expose DevTools on {endpoint}: {e}"
                    )));
                }
                Err(_) => tokio::time::sleep(STARTUP_POLL).await,
            }
        };
        info!("[cdp] Launched {} on {}", version.browser, endpoint);

        Ok(Self {
            http_endpoint: endpoint,
            child: Some(child),
            _profile: Some(profile),
        })
    }

    /// Create a fresh page target and return its WebSocket URL
    pub async fn new_page(&self, http: &reqwest::Client) -> SessionResult<String> {
        let url = format!("{}/json/new?about:blank", self.http_endpoint);
        let target: TargetInfo = http
            .put(&url)
            .send()
            .await
            .map_err(|e| SessionError::Connection(format!("{url}: {e}")))?
            .json()
            .await
            .map_err(|e| SessionError::Protocol(format!("{url}: {e}")))?;
        Ok(target.web_socket_debugger_url)
    }

    pub fn owns_process(&self) -> bool {
        self.child.is_some()
    }

    /// Terminate the browser if we started it
    pub async fn shutdown(&mut self) -> SessionResult<()> {
        if let Some(mut child) = self.child.take() {
            child
                .kill()
                .await
                .map_err(|e| SessionError::Launch(format!("kill browser: {e}")))?;
            info!("[cdp] Browser process stopped");
        }
        Ok(())
    }
}

async fn fetch_version(http: &reqwest::Client, endpoint: &str) -> SessionResult<VersionInfo> {
    let url = format!("{endpoint}/json/version");
    http.get(&url)
        .send()
        .await
        .map_err(|e| SessionError::Connection(format!("{url}: {e}")))?
        .json()
        .await
        .map_err(|e| SessionError::Protocol(format!("{url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args() {
        let settings = BrowserSettings {
            headless: true,
            debugging_port: 9333,
            ..Default::default()
        };
        let args = launch_args(&settings, std::path::Path::new("/tmp/profile"));
        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }
}
