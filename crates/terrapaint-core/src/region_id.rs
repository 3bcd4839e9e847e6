//! Region identifiers and their canonical form.
//!
//! Map assets name shapes like `Texas_03` while save codes and range
//! expansion produce `Texas_3`. Every id that enters the engine goes through
//! [`normalize`] so both spellings land on the same key.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical key of one selectable map shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(String);

impl RegionId {
    /// Wrap an id that is already canonical.
    ///
    /// Use [`normalize`] for raw ids coming from the map asset.
    #[must_use]
    pub fn from_canonical(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a trailing `_<digits>` suffix off the id.
    ///
    /// Returns the base *including* the underscore and the parsed number, so
    /// `Texas_12` yields `("Texas_", 12)`. Ids without such a suffix, or whose
    /// number is zero-padded or does not fit in `u64`, return `None`.
    #[must_use]
    pub fn split_numeric_suffix(&self) -> Option<(&str, u64)> {
        split_numeric_suffix(&self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RegionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RegionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a raw shape id.
///
/// Any run of digits that directly follows an underscore loses its leading
/// zeros (`Texas_03` → `Texas_3`, `Texas_003` → `Texas_3`). An all-zero run
/// keeps a single `0`, so `Texas_0` stays distinct from `Texas_`. Input
/// without a zero-padded suffix is returned unchanged.
#[must_use]
pub fn normalize(raw: &str) -> RegionId {
    if !raw.contains("_0") {
        return RegionId(raw.to_owned());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        out.push(ch);
        if ch != '_' {
            continue;
        }

        let mut zeros = 0usize;
        while chars.peek() == Some(&'0') {
            chars.next();
            zeros += 1;
        }
        if zeros > 0 && !chars.peek().is_some_and(char::is_ascii_digit) {
            out.push('0');
        }
    }
    RegionId(out)
}

pub(crate) fn split_numeric_suffix(id: &str) -> Option<(&str, u64)> {
    let underscore = id.rfind('_')?;
    let digits = &id[underscore + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Padded suffixes are not canonical; re-printing them would change the id.
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    let n = digits.parse::<u64>().ok()?;
    Some((&id[..=underscore], n))
}
