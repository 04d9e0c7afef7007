//! Configuration structures for the conversion pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::EinvoiceError;

/// Main configuration for the einvoice pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EinvoiceConfig {
    /// Input, output and resource directories.
    pub paths: PathsConfig,

    /// Font and image asset names.
    pub resources: ResourceConfig,

    /// Input discovery settings.
    pub input: InputConfig,
}

/// Directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned for invoice XML files (top level only).
    pub input_dir: PathBuf,

    /// Directory receiving the generated PDF files.
    pub output_dir: PathBuf,

    /// Directory holding the fonts and images.
    pub resource_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("output"),
            resource_dir: PathBuf::from("resources"),
        }
    }
}

/// Asset file names, relative to the resource directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Font used for titles and field labels.
    pub field_font: PathBuf,

    /// Font used for field content.
    pub content_font: PathBuf,

    /// Fixed-width font used for taxpayer identification numbers.
    pub id_font: PathBuf,

    /// Small mark drawn in front of the amount in words.
    pub total_image: PathBuf,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            field_font: PathBuf::from("fonts/simkai.ttf"),
            content_font: PathBuf::from("fonts/simsun.ttf"),
            id_font: PathBuf::from("fonts/cour.ttf"),
            total_image: PathBuf::from("images/Total.gif"),
        }
    }
}

/// Input discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// File extension of invoice documents, compared case-insensitively.
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extension: "xml".to_string(),
        }
    }
}

impl EinvoiceConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| EinvoiceError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Get full path to a resource file.
    pub fn resource_path(&self, name: &Path) -> PathBuf {
        self.paths.resource_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EinvoiceConfig::default();
        assert_eq!(config.paths.input_dir, PathBuf::from("assets"));
        assert_eq!(config.input.extension, "xml");
        assert_eq!(
            config.resource_path(&config.resources.field_font),
            PathBuf::from("resources/fonts/simkai.ttf")
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"paths": {"output_dir": "pdf"}}"#).unwrap();

        let config = EinvoiceConfig::from_file(&path).unwrap();
        assert_eq!(config.paths.output_dir, PathBuf::from("pdf"));
        assert_eq!(config.paths.input_dir, PathBuf::from("assets"));
        assert_eq!(config.resources.id_font, PathBuf::from("fonts/cour.ttf"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = EinvoiceConfig::default();
        config.input.extension = "XML".to_string();
        config.save(&path).unwrap();

        let loaded = EinvoiceConfig::from_file(&path).unwrap();
        assert_eq!(loaded.input.extension, "XML");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = EinvoiceConfig::from_file(&path).unwrap_err();
        match err {
            EinvoiceError::Config(message) => assert!(message.contains("config.json"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = EinvoiceConfig::from_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, EinvoiceError::Io(_)), "{err:?}");
    }
}
