//! Code for loading program settings.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::parse_log_level;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for bess-appraise
# Uncomment a line to change the setting.
";

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// The default program log level (error, warn, info, debug, trace or off)
    pub log_level: Option<String>,
    /// Whether to include hourly price and load curves in reports by default
    #[serde(default)]
    pub include_curves: bool,
}

impl Settings {
    /// Read the program settings file.
    ///
    /// If the file is not present, default values for settings will be used.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        if let Some(level) = &settings.log_level {
            parse_log_level(level)
                .with_context(|| format!("Invalid log_level in {}", file_path.display()))?;
        }

        Ok(settings)
    }

    /// The contents of the default settings file, with every setting commented out
    pub fn default_file_contents() -> String {
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        let defaults = [
            ("log_level", format!("\"{}\"", crate::log::DEFAULT_LOG_LEVEL)),
            ("include_curves", "false".to_string()),
        ];

        for (field, value) in defaults {
            if let Ok(docs) = Settings::get_field_docs(field) {
                for line in docs.split('\n') {
                    let _ = write!(&mut out, "\n# # {}\n", line.trim());
                }
            }
            let _ = writeln!(&mut out, "# {field} = {value}");
        }

        out
    }
}
