//! Assignment engine: the only code that mutates ownership.
//!
//! Interactive edits repaint one region per change. Bulk paths (`reset`,
//! save import) use the `*_quiet` forms and finish with a single
//! [`TerritoryMap::render_all`] sweep instead of one signal per region.

use std::fmt;

use tracing::debug;

use crate::color::FillColor;
use crate::ownership::{GroupId, TerritoryMap};
use crate::view::MapView;

/// Reason an engine operation was refused. Never fatal: batch callers skip
/// the offending id, single actions treat it as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    UnknownRegion(String),
    UnknownGroup(GroupId),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRegion(id) => write!(f, "unknown region {id:?}"),
            Self::UnknownGroup(id) => write!(f, "unknown group {id}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The region already belonged to the requested group.
    Unchanged,
    Assigned { previous: Option<GroupId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignOutcome {
    /// The region was already unowned.
    Unchanged,
    Released { previous: GroupId },
}

impl<H> TerritoryMap<H> {
    /// Give `region` to `group` and repaint it.
    pub fn assign(
        &mut self,
        region: &str,
        group: GroupId,
        view: &mut impl MapView<H>,
    ) -> Result<AssignOutcome, EngineError> {
        let (idx, outcome) = self.assign_slot(region, group)?;
        if outcome != AssignOutcome::Unchanged {
            self.paint_slot(idx, view);
        }
        Ok(outcome)
    }

    /// [`Self::assign`] without the repaint signal.
    pub fn assign_quiet(&mut self, region: &str, group: GroupId) -> Result<AssignOutcome, EngineError> {
        self.assign_slot(region, group).map(|(_, outcome)| outcome)
    }

    /// Make `region` unowned and repaint it.
    pub fn unassign(
        &mut self,
        region: &str,
        view: &mut impl MapView<H>,
    ) -> Result<UnassignOutcome, EngineError> {
        let (idx, outcome) = self.unassign_slot(region)?;
        if outcome != UnassignOutcome::Unchanged {
            self.paint_slot(idx, view);
        }
        Ok(outcome)
    }

    /// [`Self::unassign`] without the repaint signal.
    pub fn unassign_quiet(&mut self, region: &str) -> Result<UnassignOutcome, EngineError> {
        self.unassign_slot(region).map(|(_, outcome)| outcome)
    }

    /// Discard every group and unown every region.
    ///
    /// Group ids issued before the reset become dead. The view is not
    /// touched; follow up with [`Self::render_all`] once groups are rebuilt.
    pub fn reset(&mut self) {
        debug!(
            groups = self.group_count(),
            regions = self.region_count(),
            "resetting ownership"
        );
        self.clear_groups();
    }

    /// Fill the view should show for `region`, or `None` if it is unknown.
    #[must_use]
    pub fn render_fill(&self, region: &str) -> Option<&FillColor> {
        self.region_slot(region).map(|idx| self.fill_at(idx))
    }

    /// Repaint every region in load order.
    pub fn render_all(&self, view: &mut impl MapView<H>) {
        for idx in 0..self.region_count() {
            self.paint_slot(idx, view);
        }
        view.full_repaint_done(self.region_count());
    }

    fn assign_slot(&mut self, region: &str, group: GroupId) -> Result<(usize, AssignOutcome), EngineError> {
        let idx = self
            .region_slot(region)
            .ok_or_else(|| EngineError::UnknownRegion(region.to_owned()))?;
        if !self.group_exists(group) {
            return Err(EngineError::UnknownGroup(group));
        }
        let previous = self.region_at(idx).owner();
        if previous == Some(group) {
            return Ok((idx, AssignOutcome::Unchanged));
        }
        self.set_owner_at(idx, Some(group));
        debug!(region, group = %group, ?previous, "assigned region");
        Ok((idx, AssignOutcome::Assigned { previous }))
    }

    fn unassign_slot(&mut self, region: &str) -> Result<(usize, UnassignOutcome), EngineError> {
        let idx = self
            .region_slot(region)
            .ok_or_else(|| EngineError::UnknownRegion(region.to_owned()))?;
        let Some(previous) = self.region_at(idx).owner() else {
            return Ok((idx, UnassignOutcome::Unchanged));
        };
        self.set_owner_at(idx, None);
        debug!(region, previous = %previous, "unassigned region");
        Ok((idx, UnassignOutcome::Released { previous }))
    }

    fn fill_at(&self, idx: usize) -> &FillColor {
        self.region_at(idx)
            .owner()
            .and_then(|owner| self.group(owner))
            .map_or(self.unowned_fill(), |group| group.color())
    }

    fn paint_slot(&self, idx: usize, view: &mut impl MapView<H>) {
        let region = self.region_at(idx);
        view.paint(region.id(), region.shape(), self.fill_at(idx));
    }
}
