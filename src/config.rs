// src/config.rs

//! Defines the configuration structures for the display shim.
//!
//! Every process-wide knob of the legacy toolkit (virtual screen size,
//! scaling flags, frame limit, key layout, ...) lives in one explicit
//! [`Config`] value that is handed to the canvas at construction. The structs
//! deserialize from JSON; every section and field falls back to its default
//! when missing, so a partial file is valid.

use crate::error::LcduiError;
use crate::keys::{default_key_bindings, KeyBinding, KeyLayout};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Virtual screen and presentation settings.
    pub display: DisplayConfig,
    /// Virtual-to-physical scaling.
    pub scaling: ScalingConfig,
    /// Frame pacing and composition.
    pub performance: PerformanceConfig,
    /// Key layout, host key bindings and touch input.
    pub input: InputConfig,
    /// Fixed on-screen keyboard, if the host shows one below the canvas.
    pub keyboard: Option<FixedKeyboardConfig>,
}

impl Config {
    /// Parses a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the sizing code cannot work with.
    pub fn validate(&self) -> std::result::Result<(), LcduiError> {
        validate_scale_ratio(self.scaling.scale_ratio)?;
        if let Some(keyboard) = &self.keyboard {
            if keyboard.key_width_ratio <= 0.0 || keyboard.key_height_ratio <= 0.0 {
                return Err(LcduiError::Config(
                    "keyboard key ratios must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        log::info!("Config: Loaded {}", path.display());
        Ok(config)
    }
}

/// Scale ratios are percentages; zero or negative would collapse the screen.
pub(crate) fn validate_scale_ratio(scale_ratio: i32) -> std::result::Result<(), LcduiError> {
    if scale_ratio <= 0 {
        return Err(LcduiError::Config(format!(
            "scale_ratio must be positive, got {}",
            scale_ratio
        )));
    }
    Ok(())
}

// --- Display ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Requested virtual width. Negative selects it from the display aspect ratio.
    pub virtual_width: i32,
    /// Requested virtual height. Negative selects it from the display aspect ratio.
    pub virtual_height: i32,
    /// Start every canvas in full screen mode.
    pub force_fullscreen: bool,
    /// Color (0xRRGGBB) behind the virtual screen. Alpha is forced opaque.
    pub background_color: u32,
    /// Log the composition rate once per second.
    pub show_fps: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            virtual_width: -1,
            virtual_height: -1,
            force_fullscreen: false,
            background_color: 0xFFFFFF,
            show_fps: false,
        }
    }
}

// --- Scaling ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub scale_to_fit: bool,
    pub keep_aspect_ratio: bool,
    /// Extra multiplier in percent applied after fitting.
    pub scale_ratio: i32,
    /// Smooth (bilinear) scaling when composing the frame.
    pub filter: bool,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        ScalingConfig {
            scale_to_fit: true,
            keep_aspect_ratio: true,
            scale_ratio: 100,
            filter: false,
        }
    }
}

// --- Performance ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Maximum paint cycles per second. 0 disables the limiter.
    pub fps_limit: u32,
    pub hardware_acceleration: bool,
    /// When set, paint only copies the frame and the host composes it.
    pub parallel_redraw: bool,
}

// --- Input ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub layout: KeyLayout,
    pub touch_input: bool,
    /// Host key → handset key table.
    pub key_bindings: Vec<KeyBinding>,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            layout: KeyLayout::Default,
            touch_input: true,
            key_bindings: default_key_bindings(),
        }
    }
}

/// Geometry of a fixed keyboard drawn under the virtual screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedKeyboardConfig {
    pub rows: u32,
    pub key_width_ratio: f32,
    pub key_height_ratio: f32,
}

impl Default for FixedKeyboardConfig {
    fn default() -> Self {
        FixedKeyboardConfig {
            rows: 5,
            key_width_ratio: 3.0,
            key_height_ratio: 2.0,
        }
    }
}

impl FixedKeyboardConfig {
    /// Pixels reserved at the bottom of a display `display_width` wide.
    pub fn reserved_height(&self, display_width: i32) -> i32 {
        let divisor = self.key_width_ratio * self.key_height_ratio;
        if divisor <= 0.0 {
            return 0;
        }
        (self.rows as f32 * (display_width as f32 / divisor)) as i32 + 1
    }
}
