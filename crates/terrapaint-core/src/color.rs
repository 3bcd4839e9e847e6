//! Fill colors and the built-in group palette.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fill shown for regions that no group owns.
pub const UNOWNED_FILL: &str = "#EEEEEE";

/// A CSS color value applied verbatim to a shape's `fill`.
///
/// Imported saves may carry arbitrary keys, so the value is not required to be
/// hex; [`FillColor::is_hex_rgb`] reports whether it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillColor(String);

impl FillColor {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn unowned() -> Self {
        Self(UNOWNED_FILL.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `#RGB` or `#RRGGBB` (case-insensitive).
    #[must_use]
    pub fn is_hex_rgb(&self) -> bool {
        let Some(hex) = self.0.strip_prefix('#') else {
            return false;
        };
        matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for FillColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for FillColor {
    fn default() -> Self {
        Self::unowned()
    }
}

/// Name and color of one built-in group slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub name: String,
    pub color: FillColor,
}

impl PaletteEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: FillColor::new(color),
        }
    }
}

/// The three starter countries offered before any save is imported.
#[must_use]
pub fn default_palette() -> Vec<PaletteEntry> {
    vec![
        PaletteEntry::new("Red country", "#FF0000"),
        PaletteEntry::new("Green empire", "#00FF00"),
        PaletteEntry::new("Blue republic", "#0000FF"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_detection() {
        assert!(FillColor::new("#FF0000").is_hex_rgb());
        assert!(FillColor::new("#abc").is_hex_rgb());
        assert!(!FillColor::new("FF0000").is_hex_rgb());
        assert!(!FillColor::new("#GG0000").is_hex_rgb());
        assert!(!FillColor::new("red").is_hex_rgb());
    }

    #[test]
    fn default_is_unowned_placeholder() {
        assert_eq!(FillColor::default().as_str(), UNOWNED_FILL);
    }

    #[test]
    fn default_palette_is_ordered() {
        let names: Vec<_> = default_palette().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["Red country", "Green empire", "Blue republic"]);
    }
}
