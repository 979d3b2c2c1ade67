use anyhow::Context;
use serde::{Deserialize, Serialize};
use sommelier_encoder::EncoderConfig;
use sommelier_recommend::RecommenderConfig;
use std::path::{Path, PathBuf};

/// Settings file contents; every section falls back to its defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub encoder: EncoderConfig,
    pub recommender: RecommenderConfig,
    /// JSON file memoizing region lookups across runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocode_cache: Option<PathBuf>,
}

impl Settings {
    /// Read settings from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let settings: Settings = serde_json::from_slice(&data)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> sommelier_core::Result<()> {
        self.encoder.validate()?;
        self.recommender.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "encoder": { "top_n_grapes": 40 },
            "recommender": { "min_over_fetch": 50 }
        }))
        .unwrap();

        assert_eq!(settings.encoder.top_n_grapes, 40);
        assert_eq!(settings.recommender.min_over_fetch, 50);
        assert_eq!(settings.recommender.over_fetch_factor, 3);
        assert_eq!(settings.recommender.geocode_timeout_ms, 2000);
        assert!(settings.geocode_cache.is_none());
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"encoder": {"top_n_grapes": 0}}"#).unwrap();
        assert!(Settings::from_file(&path).is_err());

        std::fs::write(&path, r#"{"recommender": {"over_fetch_factor": 4}}"#).unwrap();
        assert_eq!(Settings::from_file(&path).unwrap().recommender.over_fetch_factor, 4);
    }
}
