use std::fs;
use std::path::{Path, PathBuf};

use colors_transform::{Color, Rgb as HexRgb};
use image::Rgb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NODE_COUNT: usize = 50;
pub const CONNECTION_COUNT: usize = 100;
pub const LINK_DISTANCE: f32 = 200.0;
pub const MAX_INITIAL_SPEED: f32 = 0.25;
pub const MIN_RADIUS: f32 = 2.0;
pub const MAX_RADIUS: f32 = 5.0;
pub const MIN_OPACITY: f32 = 0.1;
pub const MAX_OPACITY: f32 = 0.6;
pub const LINE_WIDTH: f32 = 1.0;
pub const ACCENT: &str = "#00f3ff";
pub const BACKGROUND: &str = "#000000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("link distance must be positive and finite, got {0}")]
    LinkDistance(f32),
    #[error("initial speed must be non-negative and finite, got {0}")]
    Speed(f32),
    #[error("radius range [{min}, {max}) is empty or negative")]
    RadiusRange { min: f32, max: f32 },
    #[error("opacity range [{min}, {max}) must be non-empty and within [0, 1]")]
    OpacityRange { min: f32, max: f32 },
    #[error("line width must be positive and finite, got {0}")]
    LineWidth(f32),
    #[error("invalid color {value:?}: {reason}")]
    Color { value: String, reason: String },
    #[error("could not read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed parameters")]
    Json(#[from] serde_json::Error),
}

/// Tunables for a node field. Defaults reproduce the page background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParameters {
    pub node_count: usize,
    pub connection_count: usize,
    pub link_distance: f32,
    pub max_initial_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_opacity: f32,
    pub max_opacity: f32,
    pub line_width: f32,
    pub accent: String,
    pub background: String,
}

impl Default for FieldParameters {
    fn default() -> Self {
        FieldParameters {
            node_count: NODE_COUNT,
            connection_count: CONNECTION_COUNT,
            link_distance: LINK_DISTANCE,
            max_initial_speed: MAX_INITIAL_SPEED,
            min_radius: MIN_RADIUS,
            max_radius: MAX_RADIUS,
            min_opacity: MIN_OPACITY,
            max_opacity: MAX_OPACITY,
            line_width: LINE_WIDTH,
            accent: ACCENT.to_string(),
            background: BACKGROUND.to_string(),
        }
    }
}

impl FieldParameters {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: FieldParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loading field parameters from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Checks every range the sampler relies on, so construction cannot panic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.link_distance.is_finite() || self.link_distance <= 0.0 {
            return Err(ConfigError::LinkDistance(self.link_distance));
        }
        if !self.max_initial_speed.is_finite() || self.max_initial_speed < 0.0 {
            return Err(ConfigError::Speed(self.max_initial_speed));
        }
        if !(self.min_radius >= 0.0 && self.min_radius < self.max_radius)
            || !self.max_radius.is_finite()
        {
            return Err(ConfigError::RadiusRange {
                min: self.min_radius,
                max: self.max_radius,
            });
        }
        if !(self.min_opacity >= 0.0
            && self.min_opacity < self.max_opacity
            && self.max_opacity <= 1.0)
        {
            return Err(ConfigError::OpacityRange {
                min: self.min_opacity,
                max: self.max_opacity,
            });
        }
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(ConfigError::LineWidth(self.line_width));
        }
        parse_color(&self.accent)?;
        parse_color(&self.background)?;
        Ok(())
    }

    pub fn style(&self) -> Result<Style, ConfigError> {
        self.validate()?;
        Ok(Style {
            accent: parse_color(&self.accent)?,
            link_distance: self.link_distance,
            line_width: self.line_width,
        })
    }

    pub fn background(&self) -> Result<Rgb<u8>, ConfigError> {
        parse_color(&self.background)
    }
}

/// Resolved rendering settings a field carries between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub accent: Rgb<u8>,
    pub link_distance: f32,
    pub line_width: f32,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            accent: Rgb([0, 243, 255]),
            link_distance: LINK_DISTANCE,
            line_width: LINE_WIDTH,
        }
    }
}

pub fn parse_color(value: &str) -> Result<Rgb<u8>, ConfigError> {
    let rgb = HexRgb::from_hex_str(value).map_err(|e| ConfigError::Color {
        value: value.to_string(),
        reason: format!("{e:?}"),
    })?;
    Ok(Rgb([
        channel(rgb.get_red()),
        channel(rgb.get_green()),
        channel(rgb.get_blue()),
    ]))
}

fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
