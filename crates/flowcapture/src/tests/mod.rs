mod interpreter_tests;
mod pipeline_tests;

use crate::config::Settings;

/// Built-in settings with the autosave grace turned off
pub(crate) fn test_settings() -> Settings {
    let mut settings = Settings::builtin().expect("built-in settings parse");
    settings.runtime.autosave_grace_ms = 0;
    settings
}

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}
