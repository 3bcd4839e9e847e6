//! Engine configuration.
//!
//! Defaults reproduce the stock map page. Hosts override them with a JSON
//! document ([`EngineConfig::from_json_str`]); every field is optional:
//!
//! - `unowned_color`: fill for unowned regions
//! - `palette`: `[{name, color}]` groups installed at session start
//! - `viewport`: `min_scale`, `max_scale`, `zoom_sensitivity`, `home`
//! - `max_range_span`: largest range a save code may expand to

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::{FillColor, PaletteEntry, default_palette};
use crate::range_code::DEFAULT_MAX_RANGE_SPAN;
use crate::viewport::ViewportConfig;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub unowned_color: FillColor,
    /// Groups installed when a session starts.
    pub palette: Vec<PaletteEntry>,
    pub viewport: ViewportConfig,
    pub max_range_span: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unowned_color: FillColor::unowned(),
            palette: default_palette(),
            viewport: ViewportConfig::default(),
            max_range_span: DEFAULT_MAX_RANGE_SPAN,
        }
    }
}

/// Configuration parse diagnostics (source + validation).
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: EngineConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    /// Parse a JSON config document. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<ConfigParse, serde_json::Error> {
        let config: Self = serde_json::from_str(text)?;
        let errors = config.validate().err().unwrap_or_default();
        Ok(ConfigParse { config, errors })
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        let vp = &self.viewport;

        if !(vp.min_scale.is_finite() && vp.min_scale > 0.0) {
            errors.push(ConfigError::new(
                "min_scale",
                vp.min_scale.to_string(),
                "must be finite and > 0",
            ));
        }
        if !vp.max_scale.is_finite() || vp.max_scale < vp.min_scale {
            errors.push(ConfigError::new(
                "max_scale",
                vp.max_scale.to_string(),
                "must be finite and >= min_scale",
            ));
        }
        if !(vp.zoom_sensitivity.is_finite() && vp.zoom_sensitivity > 0.0) {
            errors.push(ConfigError::new(
                "zoom_sensitivity",
                vp.zoom_sensitivity.to_string(),
                "must be finite and > 0",
            ));
        }
        if !(vp.home.scale >= vp.min_scale && vp.home.scale <= vp.max_scale) {
            errors.push(ConfigError::new(
                "home.scale",
                vp.home.scale.to_string(),
                "must lie within [min_scale, max_scale]",
            ));
        }
        if !(vp.home.tx.is_finite() && vp.home.ty.is_finite()) {
            errors.push(ConfigError::new(
                "home",
                format!("{} {}", vp.home.tx, vp.home.ty),
                "translation must be finite",
            ));
        }
        if self.max_range_span == 0 {
            errors.push(ConfigError::new("max_range_span", "0", "must be >= 1"));
        }
        if self.unowned_color.as_str().is_empty() {
            errors.push(ConfigError::new("unowned_color", "", "must not be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The viewport settings with scale bounds made usable.
    ///
    /// Inverted bounds are swapped so clamping never panics.
    #[must_use]
    pub fn effective_viewport(&self) -> ViewportConfig {
        let mut vp = self.viewport;
        if vp.min_scale > vp.max_scale {
            std::mem::swap(&mut vp.min_scale, &mut vp.max_scale);
        }
        let fallback = ViewportConfig::default();
        if !(vp.min_scale.is_finite() && vp.min_scale > 0.0) {
            vp.min_scale = fallback.min_scale;
        }
        if !vp.max_scale.is_finite() || vp.max_scale < vp.min_scale {
            vp.max_scale = fallback.max_scale.max(vp.min_scale);
        }
        vp
    }

    /// Short human-readable summary for logs.
    #[must_use]
    pub fn summary_short(&self) -> String {
        format!(
            "palette={} unowned={} scale=[{}, {}] max_span={}",
            self.palette.len(),
            self.unowned_color,
            self.viewport.min_scale,
            self.viewport.max_scale,
            self.max_range_span
        )
    }
}
