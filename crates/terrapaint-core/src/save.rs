//! MapChart-style save documents.
//!
//! A save is a JSON object whose `groups` member maps a color key to a
//! labeled list of range codes:
//!
//! ```json
//! {"groups": {"#cc3333": {"label": "Red", "paths": ["Texas_1-3", "Ohio"]}}}
//! ```
//!
//! Other top-level members (title, legend settings, ...) are ignored. Group
//! order is document order.
//!
//! Import is all-or-nothing at the parse step and best-effort afterwards:
//! malformed text leaves the map untouched, while codes that name unknown
//! regions or carry a bad range are skipped and reported.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, info_span, warn};

use crate::color::FillColor;
use crate::engine::EngineError;
use crate::ownership::TerritoryMap;
use crate::range_code::{DEFAULT_MAX_RANGE_SPAN, InvalidRange, compress, expand_with_limit};
use crate::region_id::normalize;
use crate::view::MapView;

/// One group entry of a save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveGroup {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// A group together with its document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    /// Color key; see [`group_color`].
    pub key: String,
    pub group: SaveGroup,
}

/// Parsed save, groups in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveDocument {
    pub groups: Vec<SaveEntry>,
}

#[derive(Deserialize)]
struct RawSave {
    groups: Map<String, Value>,
}

impl SaveDocument {
    /// Parse save text without touching any map state.
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let raw: RawSave = serde_json::from_str(text).map_err(ImportError::MalformedSave)?;
        let groups = raw
            .groups
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_value::<SaveGroup>(value)
                    .map(|group| SaveEntry { key, group })
                    .map_err(ImportError::MalformedSave)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    /// Serialize as `{"groups": {...}}`, keys in entry order.
    ///
    /// Later entries overwrite earlier ones with the same key.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let mut groups = Map::new();
        for entry in &self.groups {
            groups.insert(entry.key.clone(), serde_json::to_value(&entry.group)?);
        }
        let mut root = Map::new();
        root.insert("groups".to_owned(), Value::Object(groups));
        serde_json::to_string(&Value::Object(root))
    }
}

/// Save text could not be parsed. Nothing was changed.
#[derive(Debug)]
pub enum ImportError {
    MalformedSave(serde_json::Error),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedSave(err) => write!(f, "malformed save: {err}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedSave(err) => Some(err),
        }
    }
}

/// Fill color for a group key.
///
/// Striped groups use keys like `d_FF0000_00FF00`; the first non-empty
/// fragment between underscores becomes `#FF0000`. Any other key is used
/// verbatim.
#[must_use]
pub fn group_color(key: &str) -> FillColor {
    let mut parts: Vec<&str> = key.split('_').collect();
    if parts.len() >= 3 {
        parts.pop();
        if let Some(fragment) = parts[1..].iter().find(|p| !p.is_empty()) {
            return FillColor::new(format!("#{fragment}"));
        }
    }
    FillColor::new(key)
}

/// Bounds applied while importing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLimits {
    pub max_range_span: u64,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_range_span: DEFAULT_MAX_RANGE_SPAN,
        }
    }
}

/// Why one code contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipError {
    /// The expanded id names no loaded region.
    UnknownRegion(String),
    InvalidRange(InvalidRange),
}

impl fmt::Display for SkipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRegion(id) => write!(f, "unknown region {id:?}"),
            Self::InvalidRange(err) => write!(f, "{err}"),
        }
    }
}

/// A skipped code and the group it was listed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCode {
    pub group: String,
    pub code: String,
    pub error: SkipError,
}

/// Summary of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub groups_created: usize,
    /// Successful region assignments.
    pub assigned: usize,
    pub skipped: Vec<SkippedCode>,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "imported {} groups, {} regions ({} skipped)",
            self.groups_created,
            self.assigned,
            self.skipped.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// No text was supplied (prompt declined). Nothing changed.
    Cancelled,
    Imported(ImportReport),
}

/// Replace the map's ownership with `doc`.
///
/// Resets the map, creates one group per entry in document order, assigns
/// every expanded id, then repaints the whole view once.
pub fn import<H>(
    map: &mut TerritoryMap<H>,
    doc: &SaveDocument,
    view: &mut impl MapView<H>,
    limits: ImportLimits,
) -> ImportReport {
    let _span = info_span!("save_import", groups = doc.groups.len()).entered();

    map.reset();
    let mut report = ImportReport::default();

    for entry in &doc.groups {
        let group = map.create_group(entry.group.label.clone(), group_color(&entry.key));
        report.groups_created += 1;

        for code in &entry.group.paths {
            let ids = match expand_with_limit(code, limits.max_range_span) {
                Ok(ids) => ids,
                Err(err) => {
                    warn!(group = %entry.key, code = %code, error = %err, "skipping save code");
                    report.skipped.push(SkippedCode {
                        group: entry.key.clone(),
                        code: code.clone(),
                        error: SkipError::InvalidRange(err),
                    });
                    continue;
                }
            };
            for id in ids {
                let id = normalize(&id);
                match map.assign_quiet(id.as_str(), group) {
                    Ok(_) => report.assigned += 1,
                    Err(EngineError::UnknownRegion(region)) => {
                        warn!(group = %entry.key, code = %code, region = %region, "skipping unknown region");
                        report.skipped.push(SkippedCode {
                            group: entry.key.clone(),
                            code: code.clone(),
                            error: SkipError::UnknownRegion(region),
                        });
                    }
                    // The group was created above and cannot be dead.
                    Err(EngineError::UnknownGroup(_)) => {}
                }
            }
        }
    }

    map.render_all(view);
    info!(
        groups = report.groups_created,
        assigned = report.assigned,
        skipped = report.skipped.len(),
        "save imported"
    );
    report
}

/// Import from optional prompt text.
///
/// `None` is a declined prompt and changes nothing. Text that fails to parse
/// also changes nothing.
pub fn import_text<H>(
    map: &mut TerritoryMap<H>,
    text: Option<&str>,
    view: &mut impl MapView<H>,
    limits: ImportLimits,
) -> Result<ImportOutcome, ImportError> {
    let Some(text) = text else {
        return Ok(ImportOutcome::Cancelled);
    };
    let doc = SaveDocument::parse(text)?;
    Ok(ImportOutcome::Imported(import(map, &doc, view, limits)))
}

/// Snapshot the current ownership as a save document.
///
/// Empty groups are left out. Keys are group colors. When two groups share a
/// hex color the later ones get a striped key (`2_RRGGBB_`) that decodes to
/// the same fill. Any other shared color gets a plain `<color>_<n>` key that
/// [`group_color`] keeps verbatim.
#[must_use]
pub fn export<H>(map: &TerritoryMap<H>) -> SaveDocument {
    let mut used = HashSet::new();
    let mut groups = Vec::new();

    for group in map.groups() {
        let members = map.members_of(group.id());
        if members.is_empty() {
            continue;
        }
        let key = export_key(group.color(), &used);
        used.insert(key.clone());
        groups.push(SaveEntry {
            key,
            group: SaveGroup {
                label: group.name().to_owned(),
                paths: compress(members.iter().map(|id| id.as_str())),
            },
        });
    }
    SaveDocument { groups }
}

fn export_key(color: &FillColor, used: &HashSet<String>) -> String {
    let color_str = color.as_str();
    if !used.contains(color_str) {
        return color_str.to_owned();
    }
    let striped = color.is_hex_rgb().then(|| color_str.trim_start_matches('#'));
    let mut n = 2u32;
    loop {
        let key = match striped {
            Some(hex) => format!("{n}_{hex}_"),
            None => format!("{color_str}_{n}"),
        };
        let candidate = if striped.is_some() || group_color(&key).as_str() == key {
            key
        } else {
            // The color has its own separators; a bare counter still decodes
            // verbatim.
            n.to_string()
        };
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
