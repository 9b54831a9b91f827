//! `config.json` loading.
//!
//! The file is shared with the page collector, so only the keys read here
//! are interpreted and everything else is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use paxmark_pdf::MarkStyle;
use serde::Deserialize;

use crate::error::Error;
use crate::flights::DEFAULT_FLIGHT_LIST;
use crate::store::DEFAULT_KEY_FILE;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG: &str = "config.json";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    folders: RawFolders,
    /// Older files keep the folder at the top level.
    #[serde(default)]
    pdf_folder: Option<String>,
    #[serde(default)]
    flight_list: Option<PathBuf>,
    #[serde(default)]
    key_path: Option<PathBuf>,
    #[serde(default)]
    marking: MarkingConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawFolders {
    #[serde(default)]
    output_folder: Option<String>,
}

/// Placement and stroke parameters for marks.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarkingConfig {
    pub label_offset_x: f64,
    pub label_offset_y: f64,
    pub label_font_size: f64,
    pub numeral_font_size: f64,
    pub line_width: f64,
    pub line_margin: f64,
}

impl Default for MarkingConfig {
    fn default() -> Self {
        let style = MarkStyle::default();
        Self {
            label_offset_x: style.label_offset_x,
            label_offset_y: style.label_offset_y,
            label_font_size: style.label_font_size,
            numeral_font_size: style.numeral_font_size,
            line_width: style.line_width,
            line_margin: style.line_margin,
        }
    }
}

impl MarkingConfig {
    pub fn style(&self) -> MarkStyle {
        MarkStyle {
            label_offset_x: self.label_offset_x,
            label_offset_y: self.label_offset_y,
            label_font_size: self.label_font_size,
            numeral_font_size: self.numeral_font_size,
            line_width: self.line_width,
            line_margin: self.line_margin,
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Folder holding the manifest PDFs and the `status_data` tree.
    pub output_folder: PathBuf,
    pub flight_list: PathBuf,
    pub key_path: PathBuf,
    pub marking: MarkingConfig,
}

impl Config {
    /// Read and resolve a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Resolve a configuration from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let raw: RawConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        let output_folder = raw
            .folders
            .output_folder
            .filter(|f| !f.is_empty())
            .or(raw.pdf_folder.filter(|f| !f.is_empty()))
            .ok_or_else(|| Error::Config("no output_folder configured".to_string()))?;
        Ok(Self {
            output_folder: PathBuf::from(output_folder),
            flight_list: raw
                .flight_list
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FLIGHT_LIST)),
            key_path: raw
                .key_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_FILE)),
            marking: raw.marking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_output_folder() {
        let config = Config::from_json(
            r#"{"folders": {"input_folder": "/in", "output_folder": "/out"}, "other": 1}"#,
        )
        .unwrap();
        assert_eq!(config.output_folder, PathBuf::from("/out"));
        assert_eq!(config.flight_list, PathBuf::from("出力便名リスト.txt"));
        assert_eq!(config.key_path, PathBuf::from("status_key.key"));
        assert_eq!(config.marking, MarkingConfig::default());
    }

    #[test]
    fn falls_back_to_legacy_pdf_folder() {
        let config = Config::from_json(r#"{"pdf_folder": "/legacy"}"#).unwrap();
        assert_eq!(config.output_folder, PathBuf::from("/legacy"));

        let config =
            Config::from_json(r#"{"folders": {"output_folder": ""}, "pdf_folder": "/legacy"}"#)
                .unwrap();
        assert_eq!(config.output_folder, PathBuf::from("/legacy"));
    }

    #[test]
    fn missing_folder_is_an_error() {
        let err = Config::from_json(r#"{"folders": {}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            Config::from_json("{not json"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn marking_overrides_are_partial() {
        let config = Config::from_json(
            r#"{"pdf_folder": "/p", "marking": {"label_offset_x": -40.0, "line_width": 1.2}}"#,
        )
        .unwrap();
        let style = config.marking.style();
        assert_eq!(style.label_offset_x, -40.0);
        assert_eq!(style.line_width, 1.2);
        assert_eq!(style.label_font_size, MarkStyle::default().label_font_size);
    }

    #[test]
    fn explicit_paths_are_kept() {
        let config = Config::from_json(
            r#"{"pdf_folder": "/p", "flight_list": "/etc/flights.txt", "key_path": "/etc/k.key"}"#,
        )
        .unwrap();
        assert_eq!(config.flight_list, PathBuf::from("/etc/flights.txt"));
        assert_eq!(config.key_path, PathBuf::from("/etc/k.key"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("config.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
