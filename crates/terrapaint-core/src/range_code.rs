//! Range codes: the compact region-list notation used by save files.
//!
//! A save lists `Texas_3-5` instead of `Texas_3`, `Texas_4`, `Texas_5`. The
//! grammar is small:
//!
//! ```text
//! code   := plain | ranged
//! ranged := base "_" lower "-" upper      (base non-empty, bounds decimal)
//! ```
//!
//! [`expand`] turns one code into explicit ids and [`compress`] is its
//! inverse over canonical ids. Bounds are inclusive at both ends; an inverted
//! range is empty rather than an error.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::region_id::split_numeric_suffix;

/// Largest number of ids a single code may expand to by default.
pub const DEFAULT_MAX_RANGE_SPAN: u64 = 100_000;

/// Why a code carrying a range marker could not be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRangeReason {
    /// `_<n>-<m>` appears, but not as the trailing suffix of the code.
    MisplacedMarker,
    /// Nothing precedes the `_` of the range suffix.
    EmptyBase,
    /// A bound does not fit in `u64`.
    BoundOverflow,
    /// The range covers more ids than the configured limit.
    SpanTooLarge { limit: u64 },
}

/// A malformed range expression. Callers skip the code and continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRange {
    pub code: String,
    pub reason: InvalidRangeReason,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            InvalidRangeReason::MisplacedMarker => {
                write!(f, "range marker in {:?} is not a trailing suffix", self.code)
            }
            InvalidRangeReason::EmptyBase => {
                write!(f, "range code {:?} has an empty base", self.code)
            }
            InvalidRangeReason::BoundOverflow => {
                write!(f, "range bound in {:?} overflows", self.code)
            }
            InvalidRangeReason::SpanTooLarge { limit } => {
                write!(f, "range {:?} expands to more than {limit} ids", self.code)
            }
        }
    }
}

impl std::error::Error for InvalidRange {}

/// Expand one code with the default span limit.
pub fn expand(code: &str) -> Result<Vec<String>, InvalidRange> {
    expand_with_limit(code, DEFAULT_MAX_RANGE_SPAN)
}

/// Expand one code into the ids it names, in ascending order.
///
/// `max_span` caps how many ids a single range may produce.
pub fn expand_with_limit(code: &str, max_span: u64) -> Result<Vec<String>, InvalidRange> {
    if !has_range_marker(code) {
        return Ok(vec![code.to_owned()]);
    }

    let invalid = |reason| InvalidRange {
        code: code.to_owned(),
        reason,
    };

    let suffix = parse_trailing_range(code).ok_or_else(|| invalid(InvalidRangeReason::MisplacedMarker))?;
    if suffix.base.is_empty() {
        return Err(invalid(InvalidRangeReason::EmptyBase));
    }
    let lower = suffix
        .lower
        .parse::<u64>()
        .map_err(|_| invalid(InvalidRangeReason::BoundOverflow))?;
    let upper = suffix
        .upper
        .parse::<u64>()
        .map_err(|_| invalid(InvalidRangeReason::BoundOverflow))?;

    if lower > upper {
        return Ok(Vec::new());
    }
    if upper - lower >= max_span {
        return Err(invalid(InvalidRangeReason::SpanTooLarge { limit: max_span }));
    }

    Ok((lower..=upper)
        .map(|n| format!("{}_{n}", suffix.base))
        .collect())
}

/// Encode canonical ids as range codes.
///
/// Ids ending in `_<n>` are grouped by base and folded into maximal
/// contiguous runs; runs of two or more become `base_lo-hi`. Bases (and
/// plain ids) are emitted in order of first appearance, runs ascending
/// within a base. Duplicates collapse.
///
/// Ids that themselves contain a `_<n>-<m>` marker cannot survive a
/// compress/expand round trip; the map assets this targets never use them.
#[must_use]
pub fn compress<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    enum Slot {
        Plain(String),
        Numbered(String),
    }

    let mut order = Vec::new();
    let mut plain_seen = HashSet::new();
    let mut numbers: HashMap<String, BTreeSet<u64>> = HashMap::new();

    for id in ids {
        let id = id.as_ref();
        match split_numeric_suffix(id) {
            Some((base, n)) => {
                let set = numbers.entry(base.to_owned()).or_insert_with(|| {
                    order.push(Slot::Numbered(base.to_owned()));
                    BTreeSet::new()
                });
                set.insert(n);
            }
            None => {
                if plain_seen.insert(id.to_owned()) {
                    order.push(Slot::Plain(id.to_owned()));
                }
            }
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for slot in order {
        match slot {
            Slot::Plain(id) => out.push(id),
            Slot::Numbered(base) => {
                let Some(set) = numbers.get(&base) else {
                    continue;
                };
                for (lo, hi) in contiguous_runs(set) {
                    if lo == hi {
                        out.push(format!("{base}{lo}"));
                    } else {
                        out.push(format!("{base}{lo}-{hi}"));
                    }
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct RangeSuffix<'a> {
    base: &'a str,
    lower: &'a str,
    upper: &'a str,
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// True if `_<digits>-<digits>` occurs anywhere in `code`.
fn has_range_marker(code: &str) -> bool {
    let bytes = code.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'_' {
            continue;
        }
        let rest = &bytes[i + 1..];
        let lower_len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if lower_len == 0 || rest.get(lower_len) != Some(&b'-') {
            continue;
        }
        if rest.get(lower_len + 1).is_some_and(u8::is_ascii_digit) {
            return true;
        }
    }
    false
}

fn parse_trailing_range(code: &str) -> Option<RangeSuffix<'_>> {
    let (head, upper) = code.rsplit_once('-')?;
    let (base, lower) = head.rsplit_once('_')?;
    if !is_digits(lower) || !is_digits(upper) {
        return None;
    }
    Some(RangeSuffix { base, lower, upper })
}

fn contiguous_runs(set: &BTreeSet<u64>) -> Vec<(u64, u64)> {
    let mut runs = Vec::new();
    let mut iter = set.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };
    let (mut lo, mut hi) = (first, first);
    for n in iter {
        if hi.checked_add(1) == Some(n) {
            hi = n;
        } else {
            runs.push((lo, hi));
            lo = n;
            hi = n;
        }
    }
    runs.push((lo, hi));
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn inclusive_range_in_ascending_order() {
        assert_eq!(
            expand("Texas_3-5").unwrap(),
            vec!["Texas_3", "Texas_4", "Texas_5"]
        );
    }

    #[test]
    fn inverted_bounds_expand_to_nothing() {
        assert!(expand("Texas_5-3").unwrap().is_empty());
    }

    #[test]
    fn single_id_passes_through() {
        assert_eq!(expand("Texas_7").unwrap(), vec!["Texas_7"]);
        assert_eq!(expand("Ontario").unwrap(), vec!["Ontario"]);
    }

    #[test]
    fn degenerate_range_yields_one_id() {
        assert_eq!(expand("A_4-4").unwrap(), vec!["A_4"]);
    }

    #[test]
    fn padded_bounds_print_unpadded() {
        assert_eq!(expand("A_01-03").unwrap(), vec!["A_1", "A_2", "A_3"]);
    }

    #[test]
    fn base_may_contain_separators() {
        assert_eq!(
            expand("Rio_Grande-do_Sul_1-2").unwrap(),
            vec!["Rio_Grande-do_Sul_1", "Rio_Grande-do_Sul_2"]
        );
    }

    #[test]
    fn hyphen_without_range_is_plain() {
        assert_eq!(expand("Baden-Wurttemberg").unwrap(), vec!["Baden-Wurttemberg"]);
        assert_eq!(expand("A_1-b").unwrap(), vec!["A_1-b"]);
    }

    #[test]
    fn misplaced_marker_is_invalid() {
        let err = expand("A_1-2x").unwrap_err();
        assert_eq!(err.reason, InvalidRangeReason::MisplacedMarker);
        assert_eq!(err.code, "A_1-2x");
    }

    #[test]
    fn empty_base_is_invalid() {
        assert_eq!(
            expand("_1-3").unwrap_err().reason,
            InvalidRangeReason::EmptyBase
        );
    }

    #[test]
    fn overflowing_bound_is_invalid() {
        assert_eq!(
            expand("A_1-99999999999999999999999").unwrap_err().reason,
            InvalidRangeReason::BoundOverflow
        );
    }

    #[test]
    fn span_limit_is_enforced_at_the_boundary() {
        assert_eq!(expand_with_limit("A_1-10", 10).unwrap().len(), 10);
        assert_eq!(
            expand_with_limit("A_1-11", 10).unwrap_err().reason,
            InvalidRangeReason::SpanTooLarge { limit: 10 }
        );
    }

    #[test]
    fn compress_folds_contiguous_runs() {
        let ids = ["A_1", "A_2", "A_3", "B", "A_5", "C_10", "C_11"];
        assert_eq!(compress(ids), vec!["A_1-3", "A_5", "B", "C_10-11"]);
    }

    #[test]
    fn compress_handles_unordered_and_duplicate_input() {
        let ids = ["A_3", "A_1", "A_2", "A_2", "B", "B"];
        assert_eq!(compress(ids), vec!["A_1-3", "B"]);
    }

    #[test]
    fn compress_leaves_padded_ids_alone() {
        assert_eq!(compress(["A_01", "A_2"]), vec!["A_01", "A_2"]);
    }

    fn canonical_id() -> impl Strategy<Value = String> {
        prop_oneof![
            ("[A-C]{1,2}", 0u64..40).prop_map(|(base, n)| format!("{base}_{n}")),
            "[D-F]{1,3}",
        ]
    }

    proptest! {
        #[test]
        fn compress_then_expand_reproduces_the_id_set(ids in prop::collection::vec(canonical_id(), 0..60)) {
            let codes = compress(&ids);
            let mut expanded: Vec<String> = codes
                .iter()
                .flat_map(|code| expand(code).unwrap())
                .collect();
            expanded.sort();
            let mut expected = ids.clone();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(expanded, expected);
        }

        #[test]
        fn expansion_length_matches_bounds(lower in 0u64..500, upper in 0u64..500) {
            let out = expand(&format!("R_{lower}-{upper}")).unwrap();
            let expected = if lower > upper { 0 } else { (upper - lower + 1) as usize };
            prop_assert_eq!(out.len(), expected);
            if let (Some(first), Some(last)) = (out.first(), out.last()) {
                prop_assert_eq!(first, &format!("R_{lower}"));
                prop_assert_eq!(last, &format!("R_{upper}"));
            }
        }
    }
}
