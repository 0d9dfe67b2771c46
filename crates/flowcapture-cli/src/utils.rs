use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;

pub const MIN_PROMPT_CHARS: usize = 4;
pub const MAX_PROMPT_CHARS: usize = 500;
pub const RUN_LOG_FILE: &str = "run.log";

/// Console logging, plus `run.log` inside `run_dir` when given.
///
/// Keep the returned guard alive until exit so the file writer flushes.
pub fn init_logging(run_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let (file_layer, guard) = match run_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, RUN_LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    guard
}

/// Reject prompts that are too short to mean anything, clip overly long ones
pub fn check_prompt(words: &[String]) -> Result<String> {
    let prompt = words.join(" ").trim().to_string();
    let chars = prompt.chars().count();
    if chars < MIN_PROMPT_CHARS {
        bail!("prompt is too short ({chars} chars); describe the task in a few words");
    }
    if chars > MAX_PROMPT_CHARS {
        warn!("Prompt is {chars} chars; keeping the first {MAX_PROMPT_CHARS}");
        return Ok(prompt.chars().take(MAX_PROMPT_CHARS).collect());
    }
    Ok(prompt)
}

/// `<runs_dir>/<UTC timestamp>-<8 hex>`
pub fn new_run_dir(runs_dir: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let id = uuid::Uuid::new_v4().simple().to_string();
    runs_dir.join(format!("{stamp}-{}", &id[..8]))
}
