//! Configuration for the d3d9 proxy
//!
//! This module provides:
//! - Section structs read from a TOML file beside the proxy module
//! - Per-key lenient parsing (a malformed key falls back to its default)
//! - Auto-generation of a default config file
//! - The immutable [`Policy`] snapshot every component reads
//!
//! # Example
//!
//! ```toml
//! [main]
//! force_windowed = 1
//! fps_limit = 60
//! fps_limit_mode = 2
//!
//! [forcewindowed]
//! borderless_fullscreen = 1
//! ```

mod lenient;
mod loader;
mod policy;

use serde::{Deserialize, Serialize};

pub use loader::{
    config_path, config_path_beside, log_path, module_dir, CONFIG_FILE_NAME, LOG_FILE_NAME,
};
#[cfg(windows)]
pub use loader::module_path;
pub use policy::Policy;

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Could not determine config directory from module location
    #[error("Config directory not available - could not resolve module path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// `[main]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MainSection {
    /// Force windowed presentation
    #[serde(deserialize_with = "lenient::flag")]
    pub force_windowed: Option<bool>,

    /// Target frame rate, 0 disables the limiter
    #[serde(deserialize_with = "lenient::integer")]
    pub fps_limit: Option<i64>,

    /// 1 = realtime busy-wait, 2 = accurate sleep-assisted
    #[serde(deserialize_with = "lenient::integer")]
    pub fps_limit_mode: Option<i64>,

    /// Draw the FPS overlay
    #[serde(deserialize_with = "lenient::flag")]
    pub show_fps: Option<bool>,

    /// Full-screen refresh rate override, 0 disables
    #[serde(deserialize_with = "lenient::integer")]
    pub fullscreen_refresh_rate: Option<i64>,

    /// Install loader and window-system import hooks
    #[serde(deserialize_with = "lenient::flag")]
    pub hook_modules: Option<bool>,
}

impl Default for MainSection {
    fn default() -> Self {
        Self {
            force_windowed: Some(false),
            fps_limit: Some(0),
            fps_limit_mode: Some(1),
            show_fps: Some(false),
            fullscreen_refresh_rate: Some(0),
            hook_modules: Some(false),
        }
    }
}

/// `[forcewindowed]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceWindowedSection {
    #[serde(deserialize_with = "lenient::flag")]
    pub use_primary_monitor: Option<bool>,

    #[serde(deserialize_with = "lenient::flag")]
    pub center_window: Option<bool>,

    #[serde(deserialize_with = "lenient::flag")]
    pub borderless_fullscreen: Option<bool>,

    /// 0 keep, 1 borderless fullscreen, 2 bordered fixed, 3 bordered resizable, 4 borderless windowed
    #[serde(deserialize_with = "lenient::integer")]
    pub window_mode: Option<i64>,

    #[serde(deserialize_with = "lenient::flag")]
    pub always_on_top: Option<bool>,

    /// Suppress focus-loss and task-switch notifications
    #[serde(deserialize_with = "lenient::flag")]
    pub ignore_focus_loss: Option<bool>,

    /// Confine and capture the mouse on activation
    #[serde(deserialize_with = "lenient::flag")]
    pub capture_mouse: Option<bool>,
}

impl Default for ForceWindowedSection {
    fn default() -> Self {
        Self {
            use_primary_monitor: Some(false),
            center_window: Some(true),
            borderless_fullscreen: Some(false),
            window_mode: Some(0),
            always_on_top: Some(false),
            ignore_focus_loss: Some(false),
            capture_mouse: Some(false),
        }
    }
}

/// `[hooks]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksSection {
    /// Upper bound on waiting for a delay-load slot to be bound
    #[serde(deserialize_with = "lenient::integer")]
    pub delay_load_wait_ms: Option<i64>,
}

impl Default for HooksSection {
    fn default() -> Self {
        Self {
            delay_load_wait_ms: Some(1000),
        }
    }
}

/// `[launcher]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSection {
    #[serde(deserialize_with = "lenient::string")]
    pub app_exe: Option<String>,

    #[serde(deserialize_with = "lenient::string")]
    pub app_args: Option<String>,
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            app_exe: Some(String::new()),
            app_args: Some(String::new()),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default `EnvFilter` directive
    #[serde(deserialize_with = "lenient::string")]
    pub level: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: Some("info".to_string()),
        }
    }
}

/// The whole config document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub main: MainSection,
    pub forcewindowed: ForceWindowedSection,
    pub hooks: HooksSection,
    pub launcher: LauncherSection,
    pub logging: LoggingSection,
}

impl ProxyConfig {
    /// Parse a config document
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from `path`, creating a default file if missing.
    pub fn load_from(path: &std::path::Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default config at {:?}", path);
            Ok(default)
        }
    }

    /// Load config from the default location, creating it if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load config, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Using default config: {}", e);
            Self::default()
        })
    }

    /// Save config to `path`.
    pub fn save_to(&self, path: &std::path::Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Effective log filter directive
    pub fn log_level(&self) -> String {
        self.logging.level.clone().unwrap_or_else(|| "info".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ProxyConfig::from_toml_str("").unwrap();
        assert_eq!(config.main.fps_limit, Some(0));
        assert_eq!(config.main.fps_limit_mode, Some(1));
        assert_eq!(config.forcewindowed.center_window, Some(true));
        assert_eq!(config.hooks.delay_load_wait_ms, Some(1000));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_zero_one_booleans() {
        let config = ProxyConfig::from_toml_str(
            "[main]\nforce_windowed = 1\n[forcewindowed]\ncenter_window = 0\nalways_on_top = true\n",
        )
        .unwrap();
        assert_eq!(config.main.force_windowed, Some(true));
        assert_eq!(config.forcewindowed.center_window, Some(false));
        assert_eq!(config.forcewindowed.always_on_top, Some(true));
    }

    #[test]
    fn test_malformed_key_falls_back() {
        let config = ProxyConfig::from_toml_str(
            "[main]\nfps_limit = \"fast\"\nfps_limit_mode = 2\n[forcewindowed]\ncenter_window = [1]\n",
        )
        .unwrap();
        assert_eq!(config.main.fps_limit, None);
        assert_eq!(config.main.fps_limit_mode, Some(2));
        assert_eq!(config.forcewindowed.center_window, None);

        let policy = Policy::from_config(&config);
        assert_eq!(policy.fps_limit, 0);
        assert!(policy.center_window);
    }

    #[test]
    fn test_signed_integers() {
        let config =
            ProxyConfig::from_toml_str("[main]\nfullscreen_refresh_rate = -1\n").unwrap();
        assert_eq!(config.main.fullscreen_refresh_rate, Some(-1));
    }

    #[test]
    fn test_default_round_trips_through_file() {
        let path = std::env::temp_dir().join(format!(
            "d3d9-proxy-test-{}-{}.toml",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);

        let created = ProxyConfig::load_from(&path).unwrap();
        assert!(path.exists());
        let reloaded = ProxyConfig::load_from(&path).unwrap();
        assert_eq!(created.main.fps_limit_mode, reloaded.main.fps_limit_mode);
        assert_eq!(created.launcher.app_exe, reloaded.launcher.app_exe);

        let _ = std::fs::remove_file(&path);
    }
}
