// ABOUTME: Persisted user settings for alerts, appearance, sound and startup behavior
// ABOUTME: TOML-backed store where every change is written back to disk immediately

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub appearance: AppearanceSettings,
    #[serde(default)]
    pub startup: StartupSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NotificationSettings {
    /// Alert once when the battery reaches `high_threshold` while charging.
    #[serde(default = "default_true")]
    pub notify_on_high: bool,
    /// Alert once when the battery drops to `low_threshold` while discharging.
    #[serde(default = "default_true")]
    pub notify_on_low: bool,
    #[serde(default = "default_high_threshold")]
    pub high_threshold: u8,
    #[serde(default = "default_low_threshold")]
    pub low_threshold: u8,
    #[serde(default)]
    pub sound: NotificationSound,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AppearanceSettings {
    #[serde(default)]
    pub color_scheme: ColorScheme,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StartupSettings {
    #[serde(default)]
    pub launch_at_login: bool,
}

fn default_true() -> bool {
    true
}

fn default_high_threshold() -> u8 {
    80
}

fn default_low_threshold() -> u8 {
    20
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            notify_on_high: true,
            notify_on_low: true,
            high_threshold: default_high_threshold(),
            low_threshold: default_low_threshold(),
            sound: NotificationSound::default(),
        }
    }
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::System,
        }
    }
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            launch_at_login: false,
        }
    }
}

/// Named system sounds offered by the sound picker.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSound {
    #[default]
    Ping,
    Glass,
    Funk,
    Submarine,
    Tink,
}

impl NotificationSound {
    pub const ALL: [NotificationSound; 5] = [
        NotificationSound::Ping,
        NotificationSound::Glass,
        NotificationSound::Funk,
        NotificationSound::Submarine,
        NotificationSound::Tink,
    ];

    /// The sound name as the OS knows it.
    pub fn system_name(&self) -> &'static str {
        match self {
            NotificationSound::Ping => "Ping",
            NotificationSound::Glass => "Glass",
            NotificationSound::Funk => "Funk",
            NotificationSound::Submarine => "Submarine",
            NotificationSound::Tink => "Tink",
        }
    }
}

impl fmt::Display for NotificationSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.system_name())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    System,
    Light,
    Dark,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 3] = [ColorScheme::System, ColorScheme::Light, ColorScheme::Dark];

    pub fn label(&self) -> &'static str {
        match self {
            ColorScheme::System => "System",
            ColorScheme::Light => "Light",
            ColorScheme::Dark => "Dark",
        }
    }
}

impl Settings {
    pub fn load_from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::load_from_str(&content)
    }

    /// Load from the default location, materializing defaults on first run.
    /// A corrupt file falls back to defaults rather than aborting startup.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            let settings = Settings::default();
            if let Err(e) = settings.save(path) {
                tracing::warn!("Failed to write initial settings: {e:#}");
            }
            return settings;
        }
        match Self::load_from_file(path) {
            Ok(settings) => match settings.validate() {
                Ok(()) => settings,
                Err(e) => {
                    tracing::warn!("Invalid settings, using defaults: {e:#}");
                    Settings::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {e:#}");
                Settings::default()
            }
        }
    }

    pub fn default_settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(config_dir.join("batwatch").join("settings.toml"))
    }

    /// Persist to disk. Called after every settings change so a restart sees
    /// the same values.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write settings to: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let n = &self.notifications;
        if n.high_threshold > 100 {
            anyhow::bail!("high_threshold must be between 0 and 100");
        }
        if n.low_threshold > 100 {
            anyhow::bail!("low_threshold must be between 0 and 100");
        }
        if n.low_threshold >= n.high_threshold {
            anyhow::bail!("low_threshold must be below high_threshold");
        }
        Ok(())
    }
}
