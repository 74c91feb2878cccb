use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VigilError};
use crate::types::Category;

/// Top-level configuration for the Vigil monitor.
///
/// Loaded from `~/.vigil/config.toml` by default. Each section corresponds
/// to one component of the occurrence pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

impl VigilConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VigilConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| VigilError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// On-screen alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Surface new occurrences as alerts at all.
    pub visual: bool,
    /// How long an alert stays up before closing by itself.
    pub auto_dismiss_ms: u64,
    /// Exit transition between the close decision and the close callback.
    pub exit_delay_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            visual: true,
            auto_dismiss_ms: 5000,
            exit_delay_ms: 300,
        }
    }
}

/// Settings for the placeholder random detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Seconds between sampling rounds.
    pub interval_secs: u64,
    /// Chance that a round produces a detection (0.0 to 1.0).
    pub probability: f64,
    /// Longest duration the sampler will report, in seconds.
    pub max_duration_secs: u32,
    /// Categories the sampler may report.
    pub enabled_categories: Vec<Category>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            probability: 0.1,
            max_duration_secs: 30,
            enabled_categories: vec![
                Category::DarkScreen,
                Category::Freeze,
                Category::Lipsync,
                Category::Cut,
                Category::WrongImage,
                Category::PixelVariance,
            ],
        }
    }
}

/// Occurrence review screen settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Occurrences per page.
    pub page_size: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = VigilConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert!(config.notifications.visual);
        assert_eq!(config.notifications.auto_dismiss_ms, 5000);
        assert_eq!(config.notifications.exit_delay_ms, 300);
        assert_eq!(config.detection.interval_secs, 3);
        assert!((config.detection.probability - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.detection.max_duration_secs, 30);
        assert_eq!(config.review.page_size, 10);
    }

    #[test]
    fn test_default_enabled_categories_skip_fade_and_reporter() {
        let detection = DetectionConfig::default();
        assert_eq!(detection.enabled_categories.len(), 6);
        assert!(!detection.enabled_categories.contains(&Category::Fade));
        assert!(!detection
            .enabled_categories
            .contains(&Category::ReporterStatic));
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[notifications]
visual = false
auto_dismiss_ms = 8000
exit_delay_ms = 150

[detection]
interval_secs = 1
probability = 0.5
max_duration_secs = 90
enabled_categories = ["freeze", "cut", "audio_silence"]

[review]
page_size = 25
"#;
        let file = create_temp_config(content);
        let config = VigilConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(!config.notifications.visual);
        assert_eq!(config.notifications.auto_dismiss_ms, 8000);
        assert_eq!(config.notifications.exit_delay_ms, 150);
        assert_eq!(config.detection.interval_secs, 1);
        assert_eq!(config.detection.max_duration_secs, 90);
        assert_eq!(
            config.detection.enabled_categories,
            vec![
                Category::Freeze,
                Category::Cut,
                Category::Other("audio_silence".into())
            ]
        );
        assert_eq!(config.review.page_size, 25);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[notifications]
auto_dismiss_ms = 1000
"#;
        let file = create_temp_config(content);
        let config = VigilConfig::load(file.path()).unwrap();
        assert_eq!(config.notifications.auto_dismiss_ms, 1000);
        // Remaining fields use defaults
        assert_eq!(config.notifications.exit_delay_ms, 300);
        assert_eq!(config.review.page_size, 10);
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = VigilConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.detection.enabled_categories.len(), 6);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = VigilConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.notifications.auto_dismiss_ms, 5000);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = VigilConfig::load(file.path());
        assert!(matches!(result, Err(VigilError::Config(_))));
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = VigilConfig::default();
        config.review.page_size = 50;
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = VigilConfig::load(&path).unwrap();
        assert_eq!(reloaded.review.page_size, 50);
        assert_eq!(
            reloaded.detection.enabled_categories,
            config.detection.enabled_categories
        );
    }
}
