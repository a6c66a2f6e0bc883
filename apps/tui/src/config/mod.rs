// Map construction options
// Defaults, `.env` / environment overrides and JSON option bags

use crate::error::{FlowMapError, Result};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// A CSS-style length for the svg root: `100%` or `640` / `640px`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LengthRepr", into = "String")]
pub enum Length {
    Percent(f64),
    Pixels(f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LengthRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<LengthRepr> for Length {
    type Error = FlowMapError;

    fn try_from(value: LengthRepr) -> Result<Self> {
        match value {
            LengthRepr::Number(px) => Ok(Self::Pixels(px)),
            LengthRepr::Text(text) => text.parse(),
        }
    }
}

impl FromStr for Length {
    type Err = FlowMapError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || FlowMapError::InvalidOption {
            name: "width".to_string(),
            value: s.to_string(),
        };
        let (number, percent) = if let Some(number) = trimmed.strip_suffix('%') {
            (number, true)
        } else {
            (trimmed.strip_suffix("px").unwrap_or(trimmed), false)
        };
        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        Ok(if percent {
            Self::Percent(value)
        } else {
            Self::Pixels(value)
        })
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(value) => write!(f, "{value}%"),
            Self::Pixels(value) => write!(f, "{value}"),
        }
    }
}

impl From<Length> for String {
    fn from(value: Length) -> Self {
        value.to_string()
    }
}

/// Construction options for a [`crate::map::FlowMap`].
///
/// Deserializes from a JSON option bag: omitted keys take the defaults below and
/// unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapOptions {
    /// Suffix for the ids of shared `<defs>` entries.
    pub container_id: String,
    pub width: Length,
    pub height: f64,
    pub background_color: String,
    pub ocean_color: String,
    pub land_color: String,
    pub country_stroke_color: String,
    /// Fill for hovered countries and flow endpoints.
    pub selected_country_color: String,
    pub flow_line_color: String,
    pub flow_line_width: f64,
    pub flow_marker_color: String,
    /// Global multiplier on marker speed.
    pub animation_speed: f64,
    /// Draw country names next to their nodes.
    pub show_labels: bool,
    /// Default for the per-flow `showLabel` option.
    pub show_flow_values: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            container_id: "trade-flow-map".to_string(),
            width: Length::Percent(100.0),
            height: 350.0,
            background_color: "#ffffff".to_string(),
            ocean_color: "#ffffff".to_string(),
            land_color: "#f0f0f0".to_string(),
            country_stroke_color: "#e0e0e0".to_string(),
            selected_country_color: "#d1e5f8".to_string(),
            flow_line_color: "rgba(0, 103, 223, 0.7)".to_string(),
            flow_line_width: 2.0,
            flow_marker_color: "#0067df".to_string(),
            animation_speed: 1.5,
            show_labels: false,
            show_flow_values: true,
        }
    }
}

impl MapOptions {
    /// Loads options from the environment, after reading a `.env` file if present.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let mut options = Self::default();
        options.apply_vars(|key| env::var(key).ok())?;
        Ok(options)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Applies `TRADEFLOW_*` variables from `lookup` on top of the current values.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("TRADEFLOW_CONTAINER_ID") {
            self.container_id = id;
        }
        if let Some(width) = lookup("TRADEFLOW_WIDTH") {
            self.width = width.parse()?;
        }
        if let Some(height) = lookup("TRADEFLOW_HEIGHT") {
            self.height = parse_number("TRADEFLOW_HEIGHT", &height)?;
        }
        if let Some(speed) = lookup("TRADEFLOW_ANIMATION_SPEED") {
            self.animation_speed = parse_number("TRADEFLOW_ANIMATION_SPEED", &speed)?;
        }
        if let Some(width) = lookup("TRADEFLOW_FLOW_LINE_WIDTH") {
            self.flow_line_width = parse_number("TRADEFLOW_FLOW_LINE_WIDTH", &width)?;
        }
        if let Some(flag) = lookup("TRADEFLOW_SHOW_LABELS") {
            self.show_labels = parse_flag("TRADEFLOW_SHOW_LABELS", &flag)?;
        }
        if let Some(flag) = lookup("TRADEFLOW_SHOW_VALUES") {
            self.show_flow_values = parse_flag("TRADEFLOW_SHOW_VALUES", &flag)?;
        }

        let colors = [
            ("TRADEFLOW_OCEAN_COLOR", &mut self.ocean_color),
            ("TRADEFLOW_LAND_COLOR", &mut self.land_color),
            ("TRADEFLOW_BORDER_COLOR", &mut self.country_stroke_color),
            ("TRADEFLOW_HIGHLIGHT_COLOR", &mut self.selected_country_color),
            ("TRADEFLOW_FLOW_COLOR", &mut self.flow_line_color),
            ("TRADEFLOW_MARKER_COLOR", &mut self.flow_marker_color),
        ];
        for (key, slot) in colors {
            if let Some(color) = lookup(key) {
                *slot = color;
            }
        }

        self.validate()
    }

    /// Rejects values the renderer cannot draw with.
    pub fn validate(&self) -> Result<()> {
        if !(self.animation_speed.is_finite() && self.animation_speed > 0.0) {
            return Err(FlowMapError::InvalidOption {
                name: "animationSpeed".to_string(),
                value: self.animation_speed.to_string(),
            });
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(FlowMapError::InvalidOption {
                name: "height".to_string(),
                value: self.height.to_string(),
            });
        }
        if !(self.flow_line_width.is_finite() && self.flow_line_width >= 0.0) {
            return Err(FlowMapError::InvalidOption {
                name: "flowLineWidth".to_string(),
                value: self.flow_line_width.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| FlowMapError::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
        })
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(FlowMapError::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
