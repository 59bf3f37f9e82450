// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan Engine".to_string(),
            width: 800,
            height: 600,
            // The swapchain is never recreated
            resizable: false,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_level: "info".to_string(),
            log_to_file: false,
            log_file: "vulkan_debug.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults on error.
    /// Runs before logging is up, so the error is handed back to be
    /// reported once it is.
    pub fn load() -> (Self, Option<anyhow::Error>) {
        Self::load_or_default("config.toml")
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<anyhow::Error>) {
        match Self::load_from_path(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validation only ever runs in debug builds
    pub fn validation_enabled(&self) -> bool {
        cfg!(debug_assertions) && self.debug.validation_layers
    }

    /// Configured log level, INFO if unrecognised
    pub fn log_level(&self) -> log::LevelFilter {
        self.debug.log_level.parse().unwrap_or_else(|_| {
            eprintln!(
                "Unknown log level '{}', defaulting to info",
                self.debug.log_level
            );
            log::LevelFilter::Info
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.window.title, "Vulkan Engine");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert!(!config.window.resizable);
        assert!(config.debug.validation_layers);
        assert!(!config.debug.log_to_file);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config = Config::parse(
            r#"
            [window]
            title = "Scaffold"
            width = 1280

            [debug]
            validation_layers = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "Scaffold");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert!(!config.debug.validation_layers);
        assert!(!config.validation_enabled());
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(Config::parse("[window]\nwidth = \"wide\"").is_err());
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        let mut config = Config::default();
        config.debug.log_level = "WARN".to_string();
        assert_eq!(config.log_level(), log::LevelFilter::Warn);

        config.debug.log_level = "chatty".to_string();
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn malformed_file_falls_back_with_error() {
        let path = std::env::temp_dir().join(format!(
            "vk-scaffold-malformed-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[window]\nwidth = \"wide\"\n").unwrap();

        let (config, error) = Config::load_or_default(&path);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.window.width, 800);
        let error = error.expect("malformed config must report an error");
        assert!(format!("{:#}", error).contains("Failed to parse config file"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.window.width, 800);
    }
}
