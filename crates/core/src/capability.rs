use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One discrete AI-backed operation type mediated by the orchestration layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Summarize,
    Translate,
    ExtractEntities,
    Sentiment,
    Classify,
    Ocr,
    TitleGeneration,
    AutoTag,
    SmartSearch,
    Chat,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Capability::Summarize,
        Capability::Translate,
        Capability::ExtractEntities,
        Capability::Sentiment,
        Capability::Classify,
        Capability::Ocr,
        Capability::TitleGeneration,
        Capability::AutoTag,
        Capability::SmartSearch,
        Capability::Chat,
    ];

    /// Stable wire/storage identifier. Used as the settings key, the cache
    /// signature prefix, and the backend endpoint path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Summarize => "summarize",
            Capability::Translate => "translate",
            Capability::ExtractEntities => "extract_entities",
            Capability::Sentiment => "sentiment",
            Capability::Classify => "classify",
            Capability::Ocr => "ocr",
            Capability::TitleGeneration => "title_generation",
            Capability::AutoTag => "auto_tag",
            Capability::SmartSearch => "smart_search",
            Capability::Chat => "chat",
        }
    }

    pub fn descriptor(&self) -> CapabilityDescriptor {
        let label = match self {
            Capability::Summarize => "Summarization",
            Capability::Translate => "Translation",
            Capability::ExtractEntities => "Entity Extraction",
            Capability::Sentiment => "Sentiment Analysis",
            Capability::Classify => "Classification",
            Capability::Ocr => "OCR",
            Capability::TitleGeneration => "Title Generation",
            Capability::AutoTag => "Auto-Tagging",
            Capability::SmartSearch => "Smart Search",
            Capability::Chat => "Assistant Chat",
        };
        CapabilityDescriptor { capability: *self, label }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Capability::ALL
            .iter()
            .find(|c| c.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown capability: {}", s))
    }
}

/// Static description of a capability, used by the CLI and status views.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityDescriptor {
    pub capability: Capability,
    pub label: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_identifiers() {
        for cap in Capability::ALL {
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
    }

    #[test]
    fn test_from_str_accepts_dashes() {
        assert_eq!(
            "extract-entities".parse::<Capability>().unwrap(),
            Capability::ExtractEntities
        );
        assert!("telepathy".parse::<Capability>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Capability::SmartSearch).unwrap();
        assert_eq!(json, "\"smart_search\"");
    }
}
