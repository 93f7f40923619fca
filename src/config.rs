//! Configuration file support for CMAT.
//!
//! This module provides serialization and deserialization of application settings,
//! allowing users to export and import their configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EDIT_MASK_OPACITY, DEFAULT_MASK_OPACITY, DEFAULT_ZOOM_INTENSITY};
use crate::editor::{EditMode, EditorAction, Shortcut, ShortcutRegistry};
use crate::model::DisplayFilter;
use crate::rle::RlePolicy;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Keyboard shortcuts per edit mode
    #[serde(default = "default_shortcuts")]
    pub shortcuts: Vec<ShortcutBinding>,
}

fn default_app_name() -> String {
    "CMAT".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Opacity of the mask layer (0..1)
    #[serde(default = "default_mask_opacity")]
    pub mask_opacity: f32,

    /// Opacity of the in-progress edit layer (0..1)
    #[serde(default = "default_edit_mask_opacity")]
    pub edit_mask_opacity: f32,

    /// Mouse-wheel zoom intensity
    #[serde(default = "default_zoom_intensity")]
    pub zoom_intensity: f32,

    /// Leave undefined coral out of the statistics
    #[serde(default = "default_ignore_undefined_coral")]
    pub ignore_undefined_coral: bool,

    /// How masks whose runs do not match the image size are decoded
    #[serde(default)]
    pub rle_policy: RlePolicy,

    /// Which masks are drawn and hit-tested
    #[serde(default)]
    pub display_filter: DisplayFilter,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_mask_opacity() -> f32 {
    DEFAULT_MASK_OPACITY
}

fn default_edit_mask_opacity() -> f32 {
    DEFAULT_EDIT_MASK_OPACITY
}

fn default_zoom_intensity() -> f32 {
    DEFAULT_ZOOM_INTENSITY
}

fn default_ignore_undefined_coral() -> bool {
    true
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            mask_opacity: default_mask_opacity(),
            edit_mask_opacity: default_edit_mask_opacity(),
            zoom_intensity: default_zoom_intensity(),
            ignore_undefined_coral: default_ignore_undefined_coral(),
            rle_policy: RlePolicy::default(),
            display_filter: DisplayFilter::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// One shortcut binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutBinding {
    pub mode: EditMode,
    pub shortcut: Shortcut,
    pub action: EditorAction,
}

fn default_shortcuts() -> Vec<ShortcutBinding> {
    shortcuts_from_registry(&ShortcutRegistry::with_defaults())
}

/// Flatten a registry into a stable, sorted binding list.
pub fn shortcuts_from_registry(registry: &ShortcutRegistry) -> Vec<ShortcutBinding> {
    let mut list: Vec<ShortcutBinding> = registry
        .iter()
        .map(|(mode, shortcut, action)| ShortcutBinding {
            mode,
            shortcut,
            action,
        })
        .collect();
    list.sort_by_key(|b| {
        let mode_index = EditMode::all().iter().position(|m| *m == b.mode);
        (mode_index, b.shortcut.to_string())
    });
    list
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            shortcuts: default_shortcuts(),
        }
    }

    /// Build the shortcut registry. Later bindings of the same key win.
    pub fn shortcut_registry(&self) -> ShortcutRegistry {
        let mut registry = ShortcutRegistry::new();
        for binding in &self.shortcuts {
            if let Some(previous) = registry.register(binding.mode, binding.shortcut, binding.action) {
                log::warn!(
                    "Shortcut {} in {} mode bound twice ({} replaced by {})",
                    binding.shortcut,
                    binding.mode.name(),
                    previous.name(),
                    binding.action.name()
                );
            }
        }
        registry
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        let prefs = &mut config.preferences;
        prefs.mask_opacity = prefs.mask_opacity.clamp(0.0, 1.0);
        prefs.edit_mask_opacity = prefs.edit_mask_opacity.clamp(0.0, 1.0);
        if !(prefs.zoom_intensity.is_finite() && prefs.zoom_intensity > 0.0) {
            log::warn!(
                "Invalid zoom intensity {}, using {}",
                prefs.zoom_intensity,
                DEFAULT_ZOOM_INTENSITY
            );
            prefs.zoom_intensity = DEFAULT_ZOOM_INTENSITY;
        }

        Ok(config)
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "cmat-config.json"
    }

    /// Get the default config file path for auto-load/save.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("cmat").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("cmat")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from a file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load configuration from the default path.
    /// Returns `Ok(None)` if there is no default path or no file there.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::default_path() else {
            return Ok(None);
        };
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
