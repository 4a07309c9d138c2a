use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::paths::Paths;

/// Connection settings for the remote AI service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "http://localhost:8950/api/ai".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_summary_style")]
    pub default_style: String,
}

fn default_enabled() -> bool {
    true
}

fn default_summary_style() -> String {
    "concise".to_string()
}

impl Default for SummarizeSettings {
    fn default() -> Self {
        Self { enabled: true, default_style: default_summary_style() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_target_lang")]
    pub default_target_lang: String,
}

fn default_target_lang() -> String {
    "en".to_string()
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self { enabled: true, default_target_lang: default_target_lang() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractEntitiesSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.5
}

impl Default for ExtractEntitiesSettings {
    fn default() -> Self {
        Self { enabled: true, min_confidence: default_min_confidence() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifySettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_taxonomy")]
    pub taxonomy: Vec<String>,
}

fn default_taxonomy() -> Vec<String> {
    ["news", "policy", "hr", "it", "finance", "events"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ClassifySettings {
    fn default() -> Self {
        Self { enabled: true, taxonomy: default_taxonomy() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_ocr_languages")]
    pub languages: Vec<String>,
}

fn default_ocr_languages() -> Vec<String> {
    vec!["en".to_string()]
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self { enabled: true, languages: default_ocr_languages() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleGenerationSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_title_max_length")]
    pub max_length: u32,
}

fn default_title_max_length() -> u32 {
    80
}

impl Default for TitleGenerationSettings {
    fn default() -> Self {
        Self { enabled: true, max_length: default_title_max_length() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoTagSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_tags")]
    pub max_tags: u32,
}

fn default_max_tags() -> u32 {
    5
}

impl Default for AutoTagSettings {
    fn default() -> Self {
        Self { enabled: true, max_tags: default_max_tags() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartSearchSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    10
}

impl Default for SmartSearchSettings {
    fn default() -> Self {
        Self { enabled: true, max_results: default_max_results() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Optional model override passed through to the backend.
    #[serde(default)]
    pub model: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { enabled: true, model: None }
    }
}

/// Per-capability gate flags and parameters. Serializes to the shape
/// `{ <capability>: { "enabled": bool, ...params } }` keyed by the stable
/// capability identifiers from [`Capability::as_str`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CapabilitySettings {
    #[serde(default)]
    pub summarize: SummarizeSettings,
    #[serde(default)]
    pub translate: TranslateSettings,
    #[serde(default)]
    pub extract_entities: ExtractEntitiesSettings,
    #[serde(default)]
    pub sentiment: SentimentSettings,
    #[serde(default)]
    pub classify: ClassifySettings,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub title_generation: TitleGenerationSettings,
    #[serde(default)]
    pub auto_tag: AutoTagSettings,
    #[serde(default)]
    pub smart_search: SmartSearchSettings,
    #[serde(default)]
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub capabilities: CapabilitySettings,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Read persisted settings once at startup. A missing or unparsable
    /// file yields defaults without surfacing an error.
    pub fn load_or_default(paths: &Paths) -> Self {
        let path = paths.settings_file();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Unreadable settings file, using defaults");
                Self::default()
            }
        }
    }

    /// Rewrite the whole settings file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// A capability is enabled unless its gate flag was explicitly turned off.
    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::Summarize => self.capabilities.summarize.enabled,
            Capability::Translate => self.capabilities.translate.enabled,
            Capability::ExtractEntities => self.capabilities.extract_entities.enabled,
            Capability::Sentiment => self.capabilities.sentiment.enabled,
            Capability::Classify => self.capabilities.classify.enabled,
            Capability::Ocr => self.capabilities.ocr.enabled,
            Capability::TitleGeneration => self.capabilities.title_generation.enabled,
            Capability::AutoTag => self.capabilities.auto_tag.enabled,
            Capability::SmartSearch => self.capabilities.smart_search.enabled,
            Capability::Chat => self.capabilities.chat.enabled,
        }
    }

    pub fn set_enabled(&mut self, capability: Capability, enabled: bool) {
        match capability {
            Capability::Summarize => self.capabilities.summarize.enabled = enabled,
            Capability::Translate => self.capabilities.translate.enabled = enabled,
            Capability::ExtractEntities => self.capabilities.extract_entities.enabled = enabled,
            Capability::Sentiment => self.capabilities.sentiment.enabled = enabled,
            Capability::Classify => self.capabilities.classify.enabled = enabled,
            Capability::Ocr => self.capabilities.ocr.enabled = enabled,
            Capability::TitleGeneration => self.capabilities.title_generation.enabled = enabled,
            Capability::AutoTag => self.capabilities.auto_tag.enabled = enabled,
            Capability::SmartSearch => self.capabilities.smart_search.enabled = enabled,
            Capability::Chat => self.capabilities.chat.enabled = enabled,
        }
    }

    /// Merge a JSON patch into one capability's settings object. Unknown or
    /// ill-typed fields make the merged object fail validation and are
    /// rejected as a whole, leaving current settings untouched.
    pub fn apply_capability_patch(&mut self, capability: Capability, patch: &Value) -> Result<()> {
        if !patch.is_object() {
            return Err(Error::Settings("capability patch must be a JSON object".to_string()));
        }
        let mut tree = serde_json::to_value(&self.capabilities)?;
        let slot = tree
            .get_mut(capability.as_str())
            .ok_or_else(|| Error::Settings(format!("no settings slot for {}", capability)))?;
        merge_json(slot, patch);
        self.capabilities = serde_json::from_value(tree)
            .map_err(|e| Error::Settings(format!("invalid patch for {}: {}", capability, e)))?;
        Ok(())
    }
}

/// Recursive object merge: patch fields overwrite target fields, nested
/// objects merge key-by-key, everything else replaces wholesale.
fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                merge_json(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
