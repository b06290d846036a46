//! Game settings and magnet tuning
//!
//! Persisted in LocalStorage on the web; native builds use defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::VolumeLevel;
use crate::consts::*;
use crate::game::Difficulty;

/// How block distance is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScanMode {
    /// Center to center; joints attach at the centers
    Centers,
    /// Closest edge midpoints; joints attach at the mating edges
    #[default]
    Edges,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Centers => "centers",
            ScanMode::Edges => "edges",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "centers" | "center" => Some(ScanMode::Centers),
            "edges" | "edge" => Some(ScanMode::Edges),
            _ => None,
        }
    }
}

/// Errors from loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidThreshold { name: &'static str, value: f32 },
    #[error("attraction threshold {attraction} is below connection threshold {connection}")]
    ThresholdOrder { connection: f32, attraction: f32 },
}

/// Tuning for the block connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnetConfig {
    /// Blocks closer than this are joined
    pub connection_threshold: f32,
    /// Blocks closer than this (but not joined) show a preview line
    pub attraction_threshold: f32,
    pub scan_mode: ScanMode,
    /// Align nearly parallel edges before joining (edge mode only)
    pub snap_enabled: bool,
    pub snap_tolerance_deg: f32,
    /// Snap tween length (seconds)
    pub snap_duration: f32,
    /// Stiffness multiplier for joints between different block kinds
    pub kind_mismatch_factor: f32,
}

impl Default for MagnetConfig {
    fn default() -> Self {
        Self {
            connection_threshold: CONNECTION_THRESHOLD,
            attraction_threshold: ATTRACTION_THRESHOLD,
            scan_mode: ScanMode::Edges,
            snap_enabled: true,
            snap_tolerance_deg: SNAP_TOLERANCE_DEG,
            snap_duration: SNAP_DURATION,
            kind_mismatch_factor: KIND_MISMATCH_FACTOR,
        }
    }
}

impl MagnetConfig {
    /// Reject thresholds the connector cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let fields = [
            ("connection_threshold", self.connection_threshold),
            ("attraction_threshold", self.attraction_threshold),
            ("snap_tolerance_deg", self.snap_tolerance_deg),
            ("snap_duration", self.snap_duration),
            ("kind_mismatch_factor", self.kind_mismatch_factor),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::InvalidThreshold { name, value });
            }
        }
        if self.attraction_threshold < self.connection_threshold {
            return Err(SettingsError::ThresholdOrder {
                connection: self.connection_threshold,
                attraction: self.attraction_threshold,
            });
        }
        Ok(())
    }
}

/// Player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Effects volume
    pub main_volume: VolumeLevel,
    /// Background music volume
    pub background_volume: VolumeLevel,

    // === Gameplay ===
    /// Difficulty preselected on the level screen
    pub difficulty: Difficulty,
    pub magnet: MagnetConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            main_volume: VolumeLevel::High,
            background_volume: VolumeLevel::High,
            difficulty: Difficulty::Easy,
            magnet: MagnetConfig::default(),
        }
    }
}

impl Settings {
    /// Parse and validate settings JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.magnet.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "stack_n_roll_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(err) => log::warn!("Ignoring stored settings: {}", err),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            match self.to_json() {
                Ok(json) => {
                    let _ = storage.set_item(Self::STORAGE_KEY, &json);
                    log::info!("Settings saved");
                }
                Err(err) => log::warn!("Could not save settings: {}", err),
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.magnet.validate().is_ok());
        assert_eq!(settings.magnet.connection_threshold, 20.0);
        assert_eq!(settings.magnet.attraction_threshold, 30.0);
        assert_eq!(settings.magnet.scan_mode, ScanMode::Edges);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{"difficulty":"Hard","magnet":{"scan_mode":"Centers"}}"#).unwrap();
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.magnet.scan_mode, ScanMode::Centers);
        assert_eq!(settings.magnet.connection_threshold, CONNECTION_THRESHOLD);
        assert_eq!(settings.main_volume, VolumeLevel::High);
    }

    #[test]
    fn test_json_roundtrip_preserves_changes() {
        let mut settings = Settings::default();
        settings.background_volume = VolumeLevel::Mute;
        settings.magnet.snap_enabled = false;
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_threshold_order_rejected() {
        let json = r#"{"magnet":{"connection_threshold":40.0,"attraction_threshold":30.0}}"#;
        assert!(matches!(
            Settings::from_json(json),
            Err(SettingsError::ThresholdOrder { .. })
        ));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = MagnetConfig {
            connection_threshold: -1.0,
            ..MagnetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidThreshold { name: "connection_threshold", .. })
        ));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(Settings::from_json("{not json"), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_scan_mode_from_str() {
        assert_eq!(ScanMode::from_str("Edges"), Some(ScanMode::Edges));
        assert_eq!(ScanMode::from_str("center"), Some(ScanMode::Centers));
        assert_eq!(ScanMode::from_str("diagonal"), None);
    }
}
