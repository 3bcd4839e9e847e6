//! Ownership store: regions, groups, and the membership relation.
//!
//! The relation is kept as two one-directional tables, region → owner and
//! group → member set, instead of mutual references. Both sides change only
//! through [`TerritoryMap::set_owner_at`], which updates them together.
//!
//! Invariants (checked by [`TerritoryMap::check_invariants`]):
//!
//! 1. A region owned by `g` has a live group `g` whose members contain it.
//! 2. Every member id of a group names an existing region owned by that group.
//! 3. No region is a member of two groups.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::color::{FillColor, PaletteEntry};
use crate::region_id::{RegionId, normalize};

/// Opaque group identity.
///
/// Ids are allocated from a session-wide counter and never reused, so an id
/// held across [`TerritoryMap::reset`] can never alias a newer group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u32);

impl GroupId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One map shape and its current owner.
#[derive(Debug, Clone)]
pub struct Region<H> {
    id: RegionId,
    owner: Option<GroupId>,
    shape: H,
}

impl<H> Region<H> {
    #[must_use]
    pub fn id(&self) -> &RegionId {
        &self.id
    }

    #[must_use]
    pub fn owner(&self) -> Option<GroupId> {
        self.owner
    }

    /// Host handle for the shape; the engine never inspects it.
    #[must_use]
    pub fn shape(&self) -> &H {
        &self.shape
    }
}

/// A named, colored set of regions.
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    name: String,
    color: FillColor,
    members: HashSet<RegionId>,
}

impl Group {
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn color(&self) -> &FillColor {
        &self.color
    }

    #[must_use]
    pub fn members(&self) -> &HashSet<RegionId> {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, region: &str) -> bool {
        self.members.contains(region)
    }
}

/// Result of bulk region loading.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: usize,
    /// Raw ids whose normalized key was already present. The first shape wins.
    pub duplicates: usize,
}

/// A broken ownership invariant, reported by [`TerritoryMap::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Region points at a group that does not exist.
    DanglingOwner { region: RegionId, owner: GroupId },
    /// Region points at a group whose member set does not contain it.
    MissingMember { region: RegionId, owner: GroupId },
    /// Group lists a member id that is not a known region.
    UnknownMember { group: GroupId, region: RegionId },
    /// Group lists a region that is owned by someone else (or nobody).
    ForeignMember {
        group: GroupId,
        region: RegionId,
        owner: Option<GroupId>,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingOwner { region, owner } => {
                write!(f, "region {region} is owned by missing group {owner}")
            }
            Self::MissingMember { region, owner } => {
                write!(f, "region {region} is owned by {owner} but not in its members")
            }
            Self::UnknownMember { group, region } => {
                write!(f, "group {group} lists unknown region {region}")
            }
            Self::ForeignMember {
                group,
                region,
                owner,
            } => match owner {
                Some(owner) => write!(f, "group {group} lists {region}, owned by {owner}"),
                None => write!(f, "group {group} lists unowned region {region}"),
            },
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Regions, groups, and who owns what.
///
/// `H` is the host's shape handle (an SVG element on the web, `()` in tests).
/// Region and group iteration follow insertion order.
#[derive(Debug, Clone)]
pub struct TerritoryMap<H> {
    regions: Vec<Region<H>>,
    region_index: HashMap<RegionId, usize>,
    groups: Vec<Group>,
    group_index: HashMap<GroupId, usize>,
    next_group: u32,
    unowned: FillColor,
}

impl<H> Default for TerritoryMap<H> {
    fn default() -> Self {
        Self::new(FillColor::unowned())
    }
}

impl<H> TerritoryMap<H> {
    /// Create an empty map whose unowned regions show `unowned`.
    #[must_use]
    pub fn new(unowned: FillColor) -> Self {
        Self {
            regions: Vec::new(),
            region_index: HashMap::new(),
            groups: Vec::new(),
            group_index: HashMap::new(),
            next_group: 1,
            unowned,
        }
    }

    /// Add one shape under the normalized form of `raw_id`.
    ///
    /// Returns `false` (keeping the existing shape) if the key is taken.
    pub fn insert_region(&mut self, raw_id: &str, shape: H) -> bool {
        let id = normalize(raw_id);
        if self.region_index.contains_key(&id) {
            warn!(raw_id, region = %id, "duplicate region id after normalization");
            return false;
        }
        self.region_index.insert(id.clone(), self.regions.len());
        self.regions.push(Region {
            id,
            owner: None,
            shape,
        });
        true
    }

    /// Add every `(raw_id, shape)` pair in order.
    pub fn extend_regions<I, S>(&mut self, shapes: I) -> LoadReport
    where
        I: IntoIterator<Item = (S, H)>,
        S: AsRef<str>,
    {
        let mut report = LoadReport::default();
        for (raw_id, shape) in shapes {
            if self.insert_region(raw_id.as_ref(), shape) {
                report.inserted += 1;
            } else {
                report.duplicates += 1;
            }
        }
        report
    }

    #[must_use]
    pub fn region_exists(&self, region: &str) -> bool {
        self.region_index.contains_key(region)
    }

    #[must_use]
    pub fn owner_of(&self, region: &str) -> Option<GroupId> {
        self.region(region).and_then(Region::owner)
    }

    #[must_use]
    pub fn region(&self, region: &str) -> Option<&Region<H>> {
        self.region_index.get(region).map(|&idx| &self.regions[idx])
    }

    /// Regions in load order.
    pub fn regions(&self) -> impl Iterator<Item = &Region<H>> {
        self.regions.iter()
    }

    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.group_index.get(&id).map(|&idx| &self.groups[idx])
    }

    #[must_use]
    pub fn group_exists(&self, id: GroupId) -> bool {
        self.group_index.contains_key(&id)
    }

    /// Live groups in creation order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Member ids of `id` in region load order.
    #[must_use]
    pub fn members_of(&self, id: GroupId) -> Vec<&RegionId> {
        self.regions
            .iter()
            .filter(|r| r.owner == Some(id))
            .map(|r| &r.id)
            .collect()
    }

    #[must_use]
    pub fn unowned_fill(&self) -> &FillColor {
        &self.unowned
    }

    /// Create an empty group with a fresh id.
    pub fn create_group(&mut self, name: impl Into<String>, color: FillColor) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group = self.next_group.saturating_add(1);
        self.group_index.insert(id, self.groups.len());
        self.groups.push(Group {
            id,
            name: name.into(),
            color,
            members: HashSet::new(),
        });
        id
    }

    /// Create one group per palette entry, in order.
    pub fn install_palette(&mut self, palette: &[PaletteEntry]) -> Vec<GroupId> {
        palette
            .iter()
            .map(|entry| self.create_group(entry.name.clone(), entry.color.clone()))
            .collect()
    }

    /// Verify the ownership invariants in `O(regions + members)`.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for region in &self.regions {
            let Some(owner) = region.owner else {
                continue;
            };
            let Some(group) = self.group(owner) else {
                return Err(InvariantViolation::DanglingOwner {
                    region: region.id.clone(),
                    owner,
                });
            };
            if !group.members.contains(&region.id) {
                return Err(InvariantViolation::MissingMember {
                    region: region.id.clone(),
                    owner,
                });
            }
        }
        for group in &self.groups {
            for member in &group.members {
                let Some(region) = self.region(member.as_str()) else {
                    return Err(InvariantViolation::UnknownMember {
                        group: group.id,
                        region: member.clone(),
                    });
                };
                if region.owner != Some(group.id) {
                    return Err(InvariantViolation::ForeignMember {
                        group: group.id,
                        region: member.clone(),
                        owner: region.owner,
                    });
                }
            }
        }
        Ok(())
    }

    // -- Engine primitives ------------------------------------------------

    pub(crate) fn region_slot(&self, region: &str) -> Option<usize> {
        self.region_index.get(region).copied()
    }

    pub(crate) fn region_at(&self, idx: usize) -> &Region<H> {
        &self.regions[idx]
    }

    /// Move the region at `idx` to `owner`, updating both tables.
    ///
    /// `owner`, when `Some`, must be live.
    pub(crate) fn set_owner_at(&mut self, idx: usize, owner: Option<GroupId>) {
        let region = &mut self.regions[idx];
        let previous = std::mem::replace(&mut region.owner, owner);
        if let Some(prev) = previous
            && let Some(&g) = self.group_index.get(&prev)
        {
            self.groups[g].members.remove(&region.id);
        }
        if let Some(next) = owner
            && let Some(&g) = self.group_index.get(&next)
        {
            self.groups[g].members.insert(region.id.clone());
        }
    }

    /// Drop every group and clear every owner. Regions stay.
    pub(crate) fn clear_groups(&mut self) {
        self.groups.clear();
        self.group_index.clear();
        for region in &mut self.regions {
            region.owner = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(ids: &[&str]) -> TerritoryMap<()> {
        let mut map = TerritoryMap::default();
        map.extend_regions(ids.iter().map(|id| (*id, ())));
        map
    }

    #[test]
    fn region_ids_are_normalized_on_insert() {
        let map = map_with(&["Texas_03", "Ohio"]);
        assert!(map.region_exists("Texas_3"));
        assert!(!map.region_exists("Texas_03"));
        assert!(map.region_exists("Ohio"));
    }

    #[test]
    fn duplicate_normalized_ids_keep_the_first_shape() {
        let mut map = TerritoryMap::default();
        let report = map.extend_regions([("A_01", 1), ("A_1", 2), ("B", 3)]);
        assert_eq!(
            report,
            LoadReport {
                inserted: 2,
                duplicates: 1
            }
        );
        assert_eq!(map.region("A_1").map(|r| *r.shape()), Some(1));
    }

    #[test]
    fn group_ids_are_never_reused() {
        let mut map = map_with(&[]);
        let a = map.create_group("A", FillColor::new("#111111"));
        map.clear_groups();
        let b = map.create_group("B", FillColor::new("#222222"));
        assert_ne!(a, b);
        assert!(!map.group_exists(a));
        assert!(map.group_exists(b));
    }

    #[test]
    fn set_owner_moves_membership_atomically() {
        let mut map = map_with(&["A"]);
        let red = map.create_group("Red", FillColor::new("#FF0000"));
        let blue = map.create_group("Blue", FillColor::new("#0000FF"));
        let idx = map.region_slot("A").unwrap();

        map.set_owner_at(idx, Some(red));
        assert!(map.group(red).unwrap().contains("A"));

        map.set_owner_at(idx, Some(blue));
        assert!(!map.group(red).unwrap().contains("A"));
        assert!(map.group(blue).unwrap().contains("A"));
        assert_eq!(map.owner_of("A"), Some(blue));
        map.check_invariants().unwrap();
    }

    #[test]
    fn clear_groups_unowns_everything() {
        let mut map = map_with(&["A", "B"]);
        let red = map.create_group("Red", FillColor::new("#FF0000"));
        let idx = map.region_slot("A").unwrap();
        map.set_owner_at(idx, Some(red));

        map.clear_groups();
        assert_eq!(map.group_count(), 0);
        assert_eq!(map.owner_of("A"), None);
        assert_eq!(map.region_count(), 2);
        map.check_invariants().unwrap();
    }

    #[test]
    fn invariant_checker_reports_dangling_owner() {
        let mut map = map_with(&["A"]);
        map.regions[0].owner = Some(GroupId::new(99));
        assert_eq!(
            map.check_invariants(),
            Err(InvariantViolation::DanglingOwner {
                region: RegionId::from_canonical("A"),
                owner: GroupId::new(99),
            })
        );
    }

    #[test]
    fn members_follow_region_order() {
        let mut map = map_with(&["C", "A", "B"]);
        let red = map.create_group("Red", FillColor::new("#FF0000"));
        for id in ["B", "C"] {
            let idx = map.region_slot(id).unwrap();
            map.set_owner_at(idx, Some(red));
        }
        let members: Vec<&str> = map.members_of(red).into_iter().map(RegionId::as_str).collect();
        assert_eq!(members, ["C", "B"]);
    }
}
