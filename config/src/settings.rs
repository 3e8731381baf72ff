//! Client settings stored in settings.toml

use std::fs;

use serde::{Deserialize, Serialize};

use crate::PathManager;

/// Settings for the console client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server URL, e.g. "https://bofhd.example.org:8000"
    pub url: Option<String>,
    /// Prompt shown before each command line
    pub console_prompt: String,
    /// Message printed on exit
    pub exit_message: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: None,
            console_prompt: "rbofh> ".to_string(),
            exit_message: "Goodbye".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };

        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Apply a `key=value` override from the command line
    pub fn apply_override(&mut self, spec: &str) -> Result<(), String> {
        let (key, value) = spec
            .split_once('=')
            .ok_or_else(|| format!("bad override {:?}, expected key=value", spec))?;
        match key {
            "url" => self.url = Some(value.to_string()),
            "console_prompt" => self.console_prompt = value.to_string(),
            "exit_message" => self.exit_message = value.to_string(),
            other => return Err(format!("unknown setting: {}", other)),
        }
        Ok(())
    }
}
