//! Configuration management for canvas-layers
//!
//! Handles loading, validating and saving the YAML session configuration,
//! and loading standalone field files used to seed a layer stack.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;
use tracing::{debug, warn};

use crate::layers::FieldRecord;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    /// Fields used to seed the stack on startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSet>,
}

/// Editor session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_name")]
    pub name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Text and image field records as produced by the field editors
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSet {
    #[serde(default)]
    pub text_fields: Vec<FieldRecord>,
    #[serde(default)]
    pub image_fields: Vec<FieldRecord>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_session_name(),
        }
    }
}

fn default_session_name() -> String {
    "untitled".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to load config: {}", path))?;

        debug!("Configuration loaded from {}", path);
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// Duplicate field ids are only reported; the layer store does not reject them.
    pub fn validate(&self) -> Result<()> {
        if self.session.name.trim().is_empty() {
            anyhow::bail!("Session name cannot be empty");
        }

        if let Some(logging) = &self.logging {
            if logging.level.trim().is_empty() {
                anyhow::bail!("Logging level cannot be empty");
            }
        }

        if let Some(fields) = &self.fields {
            fields.validate()?;
        }

        Ok(())
    }

    /// Configured log level, if any
    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().map(|logging| logging.level.as_str())
    }
}

impl FieldSet {
    /// Load a JSON field file (`{"textFields": [...], "imageFields": [...]}`)
    pub async fn load(path: &str) -> Result<Self> {
        let json = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read fields file: {}", path))?;

        let fields: FieldSet = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse fields JSON: {}", path))?;

        fields.validate()?;

        debug!(
            "Fields loaded from {} ({} text, {} image)",
            path,
            fields.text_fields.len(),
            fields.image_fields.len()
        );
        Ok(fields)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let all = self.image_fields.iter().chain(self.text_fields.iter());

        for (idx, field) in all.enumerate() {
            if field.id.as_str().trim().is_empty() {
                anyhow::bail!("Field at position {} has an empty id", idx);
            }
            if !seen.insert(field.id.clone()) {
                warn!("Duplicate field id '{}' (lookups will match the first layer)", field.id);
            }
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.text_fields.is_empty() && self.image_fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
session:
  name: Poster
logging:
  level: debug
fields:
  textFields:
    - id: txt1
      text: Hello
      fontSize: 24
  imageFields:
    - id: img1
      mappedColumn: photo
"#;

    #[test]
    fn test_parse_sample() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.session.name, "Poster");
        assert_eq!(config.log_level(), Some("debug"));

        let fields = config.fields.unwrap();
        assert_eq!(fields.text_fields.len(), 1);
        assert_eq!(fields.text_fields[0].text.as_deref(), Some("Hello"));
        assert_eq!(
            fields.text_fields[0].attributes.get("fontSize"),
            Some(&serde_json::json!(24))
        );
        assert_eq!(
            fields.image_fields[0].mapped_column.as_deref(),
            Some("photo")
        );
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config.session.name, "untitled");
        assert!(config.log_level().is_none());
        assert!(config.fields.is_none());
    }

    #[test]
    fn test_rejects_empty_session_name() {
        let err = AppConfig::from_yaml("session:\n  name: ''\n").unwrap_err();
        assert!(err.to_string().contains("Session name"));
    }

    #[test]
    fn test_rejects_empty_field_id() {
        let yaml = "fields:\n  textFields:\n    - id: ''\n";
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_duplicate_ids_are_allowed() {
        let yaml = "fields:\n  textFields:\n    - id: a\n  imageFields:\n    - id: a\n";
        assert!(AppConfig::from_yaml(yaml).is_ok());
    }

    #[tokio::test]
    async fn test_load_and_save_round_trip_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = AppConfig::load(&path).await.unwrap();
        config.save(&path).await.unwrap();
        let reloaded = AppConfig::load(&path).await.unwrap();

        assert_eq!(reloaded.session.name, "Poster");
        assert_eq!(reloaded.fields, config.fields);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/canvas.yaml").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[tokio::test]
    async fn test_load_fields_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"textFields": [{{"id": "t1"}}], "imageFields": [{{"id": "i1", "src": "a.png"}}]}}"#
        )
        .unwrap();

        let fields = FieldSet::load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(fields.text_fields.len(), 1);
        assert_eq!(
            fields.image_fields[0].attributes.get("src"),
            Some(&serde_json::json!("a.png"))
        );
        assert!(!fields.is_empty());
    }
}
