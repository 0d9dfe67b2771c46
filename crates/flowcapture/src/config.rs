//! Configuration: vocabulary tables, app registry and runtime settings
//!
//! Settings are loaded once per process and handed to the planner and the
//! executor explicitly. Sources, later wins:
//!
//! 1. defaults embedded from `config/*.yaml` at build time
//! 2. `intents.yaml`, `app_names.yaml` and `flowcapture.yaml` in the config dir
//! 3. `FLOWCAPTURE_*` environment variables

use crate::errors::{FlowError, Result};
use crate::types::{AppName, IntentKind, ObjectClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const BUILTIN_INTENTS: &str = include_str!("../config/intents.yaml");
const BUILTIN_APP_NAMES: &str = include_str!("../config/app_names.yaml");
const BUILTIN_RUNTIME: &str = include_str!("../config/flowcapture.yaml");

pub const INTENTS_FILE: &str = "intents.yaml";
pub const APP_NAMES_FILE: &str = "app_names.yaml";
pub const RUNTIME_FILE: &str = "flowcapture.yaml";

/// Get the default config directory
/// FLOWCAPTURE_CONFIG_DIR, then `./config`, then `<user config dir>/flowcapture`
pub fn default_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("FLOWCAPTURE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let local = PathBuf::from("config");
    if local.is_dir() {
        return local;
    }
    dirs::config_dir()
        .map(|d| d.join("flowcapture"))
        .unwrap_or(local)
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct IntentsFile {
    #[serde(default)]
    intents: BTreeMap<String, VerbEntry>,
    #[serde(default)]
    objects: BTreeMap<String, NounEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct VerbEntry {
    #[serde(default)]
    verbs: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NounEntry {
    #[serde(default)]
    nouns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AppNamesFile {
    apps: Vec<String>,
}

/// Flattened, immutable lookup tables the matcher resolves tokens against
#[derive(Debug, Clone, PartialEq)]
pub struct VocabularyTables {
    verbs: BTreeMap<String, IntentKind>,
    nouns: BTreeMap<String, ObjectClass>,
    apps: Vec<AppName>,
}

impl VocabularyTables {
    pub fn new(
        verbs: BTreeMap<String, IntentKind>,
        nouns: BTreeMap<String, ObjectClass>,
        apps: Vec<AppName>,
    ) -> Self {
        Self { verbs, nouns, apps }
    }

    /// Build the tables from the YAML text of `intents.yaml` and `app_names.yaml`
    pub fn from_yaml(intents_yaml: &str, app_names_yaml: &str) -> Result<Self> {
        let intents: IntentsFile = serde_yaml::from_str(intents_yaml)
            .map_err(|e| FlowError::Config(format!("{INTENTS_FILE}: {e}")))?;
        let app_names: AppNamesFile = serde_yaml::from_str(app_names_yaml)
            .map_err(|e| FlowError::Config(format!("{APP_NAMES_FILE}: {e}")))?;

        let mut verbs = BTreeMap::new();
        for (intent_name, entry) in intents.intents {
            let Some(kind) = IntentKind::parse(&intent_name) else {
                warn!("[config] Ignoring unsupported intent {intent_name:?}");
                continue;
            };
            for verb in entry.verbs {
                insert_first_wins(&mut verbs, verb.to_lowercase(), kind, "verb");
            }
        }

        let mut nouns = BTreeMap::new();
        for (object_name, entry) in intents.objects {
            let class = ObjectClass::new(object_name.to_lowercase());
            for noun in entry.nouns {
                insert_first_wins(&mut nouns, noun.to_lowercase(), class.clone(), "noun");
            }
        }

        let apps = app_names.apps.into_iter().map(AppName::new).collect();
        Ok(Self::new(verbs, nouns, apps))
    }

    /// verb → intent
    pub fn verbs(&self) -> &BTreeMap<String, IntentKind> {
        &self.verbs
    }

    /// noun → object class
    pub fn nouns(&self) -> &BTreeMap<String, ObjectClass> {
        &self.nouns
    }

    /// Canonical app names, in configured order
    pub fn apps(&self) -> &[AppName] {
        &self.apps
    }
}

fn insert_first_wins<V: PartialEq + std::fmt::Debug>(
    table: &mut BTreeMap<String, V>,
    word: String,
    value: V,
    kind: &str,
) {
    match table.get(&word) {
        Some(existing) if *existing != value => {
            warn!("[config] {kind} {word:?} already maps to {existing:?}; ignoring {value:?}");
        }
        Some(_) => {}
        None => {
            table.insert(word, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------

/// What the compiler does when no known application was recognised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedAppPolicy {
    /// Thread the `<UNKNOWN_APP>` marker through the plan
    #[default]
    Sentinel,
    /// Refuse to compile
    Abort,
}

/// Where an app lives and where its persisted login is kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProfile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub state_file: Option<String>,
}

/// Click fallback: when `key` appears in a click label, try `labels` in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymRule {
    pub key: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Chrome/Chromium executable launched with remote debugging
    pub executable: String,
    pub headless: bool,
    pub debugging_port: u16,
    /// Connect to an already running browser instead of launching one,
    /// e.g. `http://127.0.0.1:9222`
    pub endpoint: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: "google-chrome".to_string(),
            headless: false,
            debugging_port: 9222,
            endpoint: None,
        }
    }
}

/// Contents of `flowcapture.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub similarity_cutoff: f32,
    pub unresolved_app: UnresolvedAppPolicy,
    pub autosave_grace_ms: u64,
    pub load_timeout_ms: u64,
    pub dismiss_popups: bool,
    /// Directory holding session-snapshot files
    pub state_dir: PathBuf,
    pub apps: BTreeMap<String, AppProfile>,
    pub click_synonyms: Vec<SynonymRule>,
    pub submit_labels: Vec<String>,
    pub popup_labels: Vec<String>,
    pub browser: BrowserSettings,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            similarity_cutoff: 0.7,
            unresolved_app: UnresolvedAppPolicy::Sentinel,
            autosave_grace_ms: 2000,
            load_timeout_ms: 30_000,
            dismiss_popups: false,
            state_dir: PathBuf::from("."),
            apps: BTreeMap::new(),
            click_synonyms: Vec::new(),
            submit_labels: Vec::new(),
            popup_labels: Vec::new(),
            browser: BrowserSettings::default(),
        }
    }
}

impl RuntimeSettings {
    pub fn autosave_grace(&self) -> Duration {
        Duration::from_millis(self.autosave_grace_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Profile for a canonical app name (case-insensitive)
    pub fn app_profile(&self, app: &AppName) -> Option<&AppProfile> {
        self.apps
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(app.as_str()))
            .map(|(_, profile)| profile)
    }

    /// Path of the session snapshot for `app`, if one is configured
    pub fn state_file_for(&self, app: &AppName) -> Option<PathBuf> {
        self.app_profile(app)
            .and_then(|p| p.state_file.as_ref())
            .map(|f| self.state_dir.join(f))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(exe) = std::env::var("FLOWCAPTURE_CHROME") {
            debug!("[config] Browser executable from FLOWCAPTURE_CHROME: {exe}");
            self.browser.executable = exe;
        }
        if let Ok(v) = std::env::var("FLOWCAPTURE_HEADLESS") {
            self.browser.headless = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(dir) = std::env::var("FLOWCAPTURE_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything loaded from configuration, immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct Settings {
    pub vocabulary: VocabularyTables,
    pub runtime: RuntimeSettings,
}

impl Settings {
    /// Defaults embedded in the binary, without environment overrides
    pub fn builtin() -> Result<Self> {
        let vocabulary = VocabularyTables::from_yaml(BUILTIN_INTENTS, BUILTIN_APP_NAMES)?;
        let runtime = serde_yaml::from_str(BUILTIN_RUNTIME)
            .map_err(|e| FlowError::Config(format!("{RUNTIME_FILE}: {e}")))?;
        Ok(Self {
            vocabulary,
            runtime,
        })
    }

    /// Load from `config_dir`, falling back to the embedded defaults per file,
    /// then apply environment overrides.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let intents = read_or_builtin(config_dir, INTENTS_FILE, BUILTIN_INTENTS)?;
        let app_names = read_or_builtin(config_dir, APP_NAMES_FILE, BUILTIN_APP_NAMES)?;
        let runtime_text = read_or_builtin(config_dir, RUNTIME_FILE, BUILTIN_RUNTIME)?;

        let vocabulary = VocabularyTables::from_yaml(&intents, &app_names)?;
        let mut runtime: RuntimeSettings = serde_yaml::from_str(&runtime_text)
            .map_err(|e| FlowError::Config(format!("{RUNTIME_FILE}: {e}")))?;
        runtime.apply_env_overrides();

        if !(0.0..=1.0).contains(&runtime.similarity_cutoff) {
            return Err(FlowError::Config(format!(
                "similarity_cutoff must be within 0..=1, got {}",
                runtime.similarity_cutoff
            )));
        }

        info!(
            "[config] Loaded {} verbs, {} nouns, {} apps",
            vocabulary.verbs().len(),
            vocabulary.nouns().len(),
            vocabulary.apps().len()
        );
        Ok(Self {
            vocabulary,
            runtime,
        })
    }
}

fn read_or_builtin(dir: &Path, file: &str, builtin: &str) -> Result<String> {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            debug!("[config] Using {}", path.display());
            Ok(text)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("[config] {} not found, using built-in defaults", path.display());
            Ok(builtin.to_string())
        }
        Err(e) => Err(FlowError::Io(e)),
    }
}
