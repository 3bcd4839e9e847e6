//! Session state and command dispatch.
//!
//! A [`Session`] owns everything one open map needs: the ownership store, the
//! viewport, the current brush, and the stroke memory used while painting
//! over shapes. Hosts translate their input into [`Command`]s and display the
//! returned [`Outcome`] as the status line.

use std::fmt;

use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::{AssignOutcome, EngineError, UnassignOutcome};
use crate::ownership::{GroupId, LoadReport, TerritoryMap};
use crate::region_id::RegionId;
use crate::save::{ImportError, ImportLimits, ImportOutcome, ImportReport, export, import_text};
use crate::view::MapView;
use crate::viewport::{Transform, Viewport, ViewportEffect};

/// What a click (or paint-over) does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Brush {
    /// Assign to this group.
    Group(GroupId),
    /// Make regions unowned.
    Erase,
    /// Clicks only report the region.
    #[default]
    None,
}

/// Every action a host can request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select(Brush),
    /// Apply the brush to one region.
    Click(RegionId),
    /// Apply the brush while dragging across shapes.
    PaintOver(RegionId),
    /// Forget the last region painted in the current stroke.
    EndStroke,
    /// Unassign one region regardless of brush.
    Erase(RegionId),
    /// Import save text; `None` means the prompt was declined.
    Import(Option<String>),
    Export,
    Zoom { x: f64, y: f64, delta_y: f64 },
    BeginDrag { pointer_id: u32, x: f64, y: f64 },
    UpdateDrag { pointer_id: u32, x: f64, y: f64 },
    EndDrag { pointer_id: u32 },
    CancelDrag,
    ResetView,
}

/// Effect of a brush stroke on one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionChange {
    Assigned { group: GroupId, previous: Option<GroupId> },
    Released { previous: GroupId },
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownRegion,
    /// Paint-over re-entered the region it last painted.
    SameRegionInStroke,
    /// The brush named a group that no longer exists; it was cleared.
    StaleBrush,
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Brush changed. `label` is the group name for group brushes.
    Selected { brush: Brush, label: Option<String> },
    Region { region: RegionId, change: RegionChange },
    Ignored(IgnoreReason),
    StrokeEnded,
    Imported(ImportReport),
    ImportCancelled,
    Exported { groups: usize, text: String },
    View(ViewportEffect),
}

impl Outcome {
    /// Whether the outcome carries a status message for the user.
    #[must_use]
    pub fn has_status(&self) -> bool {
        !matches!(self, Self::Ignored(_) | Self::StrokeEnded | Self::View(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selected { brush, label } => match (brush, label) {
                (Brush::Group(_), Some(name)) => write!(f, "Editing country {name}"),
                (Brush::Group(id), None) => write!(f, "Editing country {id}"),
                (Brush::Erase, _) => f.write_str("Removing territories"),
                (Brush::None, _) => f.write_str("No country selected"),
            },
            Self::Region { region, .. } => write!(f, "selected {region}"),
            Self::Imported(report) => write!(f, "{report}"),
            Self::ImportCancelled => f.write_str("import cancelled"),
            Self::Exported { groups, .. } => write!(f, "exported {groups} groups"),
            Self::Ignored(_) | Self::StrokeEnded | Self::View(_) => Ok(()),
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// A brush named a group that does not exist (or no longer exists).
    UnknownGroup(GroupId),
    Import(ImportError),
    Export(serde_json::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownGroup(id) => write!(f, "unknown group {id}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "export failed: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownGroup(_) => None,
            Self::Import(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<ImportError> for SessionError {
    fn from(err: ImportError) -> Self {
        Self::Import(err)
    }
}

/// One open map.
#[derive(Debug)]
pub struct Session<H> {
    map: TerritoryMap<H>,
    viewport: Viewport,
    brush: Brush,
    stroke_last: Option<RegionId>,
    config: EngineConfig,
}

impl<H> Default for Session<H> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<H> Session<H> {
    /// Start a session with the configured palette installed.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let mut map = TerritoryMap::new(config.unowned_color.clone());
        map.install_palette(&config.palette);
        let viewport = Viewport::new(config.effective_viewport());
        debug!(config = %config.summary_short(), "session created");
        Self {
            map,
            viewport,
            brush: Brush::None,
            stroke_last: None,
            config,
        }
    }

    /// Register map shapes, then paint all of them and apply the transform.
    pub fn load_shapes<I, S>(&mut self, shapes: I, view: &mut impl MapView<H>) -> LoadReport
    where
        I: IntoIterator<Item = (S, H)>,
        S: AsRef<str>,
    {
        let report = self.map.extend_regions(shapes);
        debug!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            "shapes loaded"
        );
        self.map.render_all(view);
        view.apply_transform(&self.viewport.transform());
        report
    }

    /// Drop every shape, group and the view state, then load a new map.
    ///
    /// Use when the host swaps its shape handles, e.g. after re-injecting the
    /// map document. Handles from the previous load are never painted again.
    pub fn replace_shapes<I, S>(&mut self, shapes: I, view: &mut impl MapView<H>) -> LoadReport
    where
        I: IntoIterator<Item = (S, H)>,
        S: AsRef<str>,
    {
        *self = Self::new(self.config.clone());
        self.load_shapes(shapes, view)
    }

    #[must_use]
    pub fn map(&self) -> &TerritoryMap<H> {
        &self.map
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    #[must_use]
    pub fn brush(&self) -> Brush {
        self.brush
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one command.
    pub fn dispatch(
        &mut self,
        command: Command,
        view: &mut impl MapView<H>,
    ) -> Result<Outcome, SessionError> {
        match command {
            Command::Select(brush) => self.select(brush),
            Command::Click(region) => Ok(self.apply_brush(region, view)),
            Command::PaintOver(region) => {
                if self.stroke_last.as_ref() == Some(&region) {
                    return Ok(Outcome::Ignored(IgnoreReason::SameRegionInStroke));
                }
                let outcome = self.apply_brush(region.clone(), view);
                if matches!(outcome, Outcome::Region { .. }) {
                    self.stroke_last = Some(region);
                }
                Ok(outcome)
            }
            Command::EndStroke => {
                self.stroke_last = None;
                Ok(Outcome::StrokeEnded)
            }
            Command::Erase(region) => Ok(self.erase(region, view)),
            Command::Import(text) => self.import(text.as_deref(), view),
            Command::Export => {
                let doc = export(&self.map);
                let text = doc.to_json_string().map_err(SessionError::Export)?;
                Ok(Outcome::Exported {
                    groups: doc.groups.len(),
                    text,
                })
            }
            Command::Zoom { x, y, delta_y } => {
                let effect = self.viewport.zoom(x, y, delta_y);
                Ok(self.view_outcome(effect, view))
            }
            Command::BeginDrag { pointer_id, x, y } => {
                let effect = self.viewport.begin_drag(pointer_id, x, y);
                Ok(self.view_outcome(effect, view))
            }
            Command::UpdateDrag { pointer_id, x, y } => {
                let effect = self.viewport.update_drag(pointer_id, x, y);
                Ok(self.view_outcome(effect, view))
            }
            Command::EndDrag { pointer_id } => {
                let effect = self.viewport.end_drag(pointer_id);
                Ok(self.view_outcome(effect, view))
            }
            Command::CancelDrag => {
                let effect = self.viewport.cancel_drag();
                Ok(self.view_outcome(effect, view))
            }
            Command::ResetView => {
                let effect = self.viewport.reset_transform();
                Ok(self.view_outcome(effect, view))
            }
        }
    }

    fn select(&mut self, brush: Brush) -> Result<Outcome, SessionError> {
        let label = match brush {
            Brush::Group(id) => {
                let group = self.map.group(id).ok_or(SessionError::UnknownGroup(id))?;
                Some(group.name().to_owned())
            }
            Brush::Erase | Brush::None => None,
        };
        self.brush = brush;
        Ok(Outcome::Selected { brush, label })
    }

    fn apply_brush(&mut self, region: RegionId, view: &mut impl MapView<H>) -> Outcome {
        let result = match self.brush {
            Brush::Group(group) => self
                .map
                .assign(region.as_str(), group, view)
                .map(|outcome| match outcome {
                    AssignOutcome::Unchanged => RegionChange::Unchanged,
                    AssignOutcome::Assigned { previous } => RegionChange::Assigned { group, previous },
                }),
            Brush::Erase => self.map.unassign(region.as_str(), view).map(released),
            Brush::None => {
                if self.map.region_exists(region.as_str()) {
                    Ok(RegionChange::Unchanged)
                } else {
                    Err(EngineError::UnknownRegion(region.as_str().to_owned()))
                }
            }
        };
        self.region_outcome(region, result)
    }

    fn erase(&mut self, region: RegionId, view: &mut impl MapView<H>) -> Outcome {
        let result = self.map.unassign(region.as_str(), view).map(released);
        self.region_outcome(region, result)
    }

    fn region_outcome(&mut self, region: RegionId, result: Result<RegionChange, EngineError>) -> Outcome {
        match result {
            Ok(change) => Outcome::Region { region, change },
            Err(EngineError::UnknownRegion(_)) => {
                debug!(region = %region, "ignoring action on unknown region");
                Outcome::Ignored(IgnoreReason::UnknownRegion)
            }
            Err(EngineError::UnknownGroup(group)) => {
                debug!(group = %group, "brush group is gone, clearing brush");
                self.brush = Brush::None;
                Outcome::Ignored(IgnoreReason::StaleBrush)
            }
        }
    }

    fn import(&mut self, text: Option<&str>, view: &mut impl MapView<H>) -> Result<Outcome, SessionError> {
        let limits = ImportLimits {
            max_range_span: self.config.max_range_span,
        };
        match import_text(&mut self.map, text, view, limits)? {
            ImportOutcome::Cancelled => Ok(Outcome::ImportCancelled),
            ImportOutcome::Imported(report) => {
                if let Brush::Group(id) = self.brush
                    && !self.map.group_exists(id)
                {
                    self.brush = Brush::None;
                }
                self.stroke_last = None;
                Ok(Outcome::Imported(report))
            }
        }
    }

    fn view_outcome(&self, effect: ViewportEffect, view: &mut impl MapView<H>) -> Outcome {
        if let Some(transform) = effect.transform() {
            view.apply_transform(&transform);
        }
        Outcome::View(effect)
    }
}

fn released(outcome: UnassignOutcome) -> RegionChange {
    match outcome {
        UnassignOutcome::Unchanged => RegionChange::Unchanged,
        UnassignOutcome::Released { previous } => RegionChange::Released { previous },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{FillColor, UNOWNED_FILL};
    use crate::region_id::normalize;
    use crate::view::RecordingView;
    use pretty_assertions::assert_eq;

    fn session() -> (Session<()>, RecordingView) {
        let mut session = Session::default();
        let mut view = RecordingView::new();
        session.load_shapes(["Texas_01", "Texas_02", "Ohio"].map(|id| (id, ())), &mut view);
        view.clear();
        (session, view)
    }

    fn red(session: &Session<()>) -> GroupId {
        session.map().groups().next().unwrap().id()
    }

    #[test]
    fn palette_uses_ids_one_to_n() {
        let (session, _) = session();
        let ids: Vec<u32> = session.map().groups().map(|g| g.id().get()).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn load_paints_everything_and_applies_home_transform() {
        let mut session: Session<()> = Session::default();
        let mut view = RecordingView::new();
        let report = session.load_shapes([("A", ()), ("B", ())], &mut view);
        assert_eq!(report.inserted, 2);
        assert_eq!(view.paints().len(), 2);
        assert_eq!(view.transforms(), [Transform::new(3.0, -1600.0, -50.0)]);
    }

    /// Records which handle each paint landed on.
    #[derive(Default)]
    struct HandleView(Vec<(String, u32)>);

    impl MapView<u32> for HandleView {
        fn paint(&mut self, region: &RegionId, shape: &u32, _fill: &FillColor) {
            self.0.push((region.as_str().to_owned(), *shape));
        }
    }

    #[test]
    fn second_load_keeps_first_handles() {
        let mut session: Session<u32> = Session::default();
        let mut view = HandleView::default();
        session.load_shapes([("A", 1)], &mut view);
        view.0.clear();

        let report = session.load_shapes([("A", 2)], &mut view);
        assert_eq!((report.inserted, report.duplicates), (0, 1));
        assert_eq!(view.0, [("A".to_owned(), 1)]);
    }

    #[test]
    fn replace_shapes_paints_new_handles_only() {
        let mut session: Session<u32> = Session::default();
        let mut view = HandleView::default();
        session.load_shapes([("A", 1), ("B", 2)], &mut view);
        let red = session.map().groups().next().unwrap().id();
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();
        session.dispatch(Command::Click(normalize("A")), &mut view).unwrap();
        view.0.clear();

        let report = session.replace_shapes([("A", 10)], &mut view);
        assert_eq!((report.inserted, report.duplicates), (1, 0));
        assert_eq!(view.0, [("A".to_owned(), 10)]);
        assert_eq!(session.map().region_count(), 1);
        assert_eq!(session.map().owner_of("A"), None);
        assert_eq!(session.brush(), Brush::None);

        view.0.clear();
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();
        session.dispatch(Command::Click(normalize("A")), &mut view).unwrap();
        assert_eq!(view.0, [("A".to_owned(), 10)]);
    }

    #[test]
    fn select_reports_status_line() {
        let (mut session, mut view) = session();
        let red = red(&session);
        let outcome = session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();
        assert_eq!(outcome.to_string(), "Editing country Red country");
        let outcome = session.dispatch(Command::Select(Brush::Erase), &mut view).unwrap();
        assert_eq!(outcome.to_string(), "Removing territories");
    }

    #[test]
    fn selecting_a_dead_group_fails() {
        let (mut session, mut view) = session();
        let err = session
            .dispatch(Command::Select(Brush::Group(GroupId::new(99))), &mut view)
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownGroup(id) if id == GroupId::new(99)));
        assert_eq!(session.brush(), Brush::None);
    }

    #[test]
    fn click_applies_group_brush() {
        let (mut session, mut view) = session();
        let red = red(&session);
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();

        let outcome = session.dispatch(Command::Click(normalize("Texas_03")), &mut view);
        assert!(matches!(outcome, Ok(Outcome::Ignored(IgnoreReason::UnknownRegion))));

        let outcome = session.dispatch(Command::Click(normalize("Texas_02")), &mut view).unwrap();
        assert_eq!(outcome.to_string(), "selected Texas_2");
        assert_eq!(session.map().owner_of("Texas_2"), Some(red));
        assert_eq!(view.last_fill("Texas_2").map(|f| f.as_str()), Some("#FF0000"));
    }

    #[test]
    fn click_without_brush_only_reports() {
        let (mut session, mut view) = session();
        let outcome = session.dispatch(Command::Click(normalize("Ohio")), &mut view).unwrap();
        assert_eq!(
            outcome,
            Outcome::Region {
                region: normalize("Ohio"),
                change: RegionChange::Unchanged
            }
        );
        assert!(view.paints().is_empty());
    }

    #[test]
    fn erase_brush_unassigns() {
        let (mut session, mut view) = session();
        let red = red(&session);
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();
        session.dispatch(Command::Click(normalize("Ohio")), &mut view).unwrap();
        session.dispatch(Command::Select(Brush::Erase), &mut view).unwrap();

        let outcome = session.dispatch(Command::Click(normalize("Ohio")), &mut view).unwrap();
        assert!(matches!(
            outcome,
            Outcome::Region {
                change: RegionChange::Released { .. },
                ..
            }
        ));
        assert_eq!(view.last_fill("Ohio").map(|f| f.as_str()), Some(UNOWNED_FILL));
    }

    #[test]
    fn paint_over_skips_the_region_it_just_painted() {
        let (mut session, mut view) = session();
        let red = red(&session);
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();

        session.dispatch(Command::PaintOver(normalize("Ohio")), &mut view).unwrap();
        let again = session.dispatch(Command::PaintOver(normalize("Ohio")), &mut view).unwrap();
        assert_eq!(again, Outcome::Ignored(IgnoreReason::SameRegionInStroke));

        session.dispatch(Command::EndStroke, &mut view).unwrap();
        let fresh = session.dispatch(Command::PaintOver(normalize("Ohio")), &mut view).unwrap();
        assert!(matches!(fresh, Outcome::Region { .. }));
    }

    #[test]
    fn import_clears_brush_referencing_dead_group() {
        let (mut session, mut view) = session();
        let red = red(&session);
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();

        let text = r##"{"groups": {"#abcdef": {"label": "Imported", "paths": ["Texas_1-2"]}}}"##;
        let outcome = session
            .dispatch(Command::Import(Some(text.to_owned())), &mut view)
            .unwrap();

        assert_eq!(outcome.to_string(), "imported 1 groups, 2 regions (0 skipped)");
        assert_eq!(session.brush(), Brush::None);
        assert!(!session.map().group_exists(red));
        assert_eq!(view.full_repaints(), 1);
    }

    #[test]
    fn malformed_import_is_an_error_and_keeps_state() {
        let (mut session, mut view) = session();
        let red = red(&session);
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();
        session.dispatch(Command::Click(normalize("Ohio")), &mut view).unwrap();

        let err = session
            .dispatch(Command::Import(Some("[1,2".to_owned())), &mut view)
            .unwrap_err();
        assert!(matches!(err, SessionError::Import(ImportError::MalformedSave(_))));
        assert_eq!(session.map().owner_of("Ohio"), Some(red));
        assert_eq!(session.brush(), Brush::Group(red));
    }

    #[test]
    fn declined_import_is_cancelled() {
        let (mut session, mut view) = session();
        let outcome = session.dispatch(Command::Import(None), &mut view).unwrap();
        assert_eq!(outcome, Outcome::ImportCancelled);
        assert_eq!(session.map().group_count(), 3);
    }

    #[test]
    fn export_produces_save_text() {
        let (mut session, mut view) = session();
        let red = red(&session);
        session.dispatch(Command::Select(Brush::Group(red)), &mut view).unwrap();
        session.dispatch(Command::Click(normalize("Texas_1")), &mut view).unwrap();
        session.dispatch(Command::Click(normalize("Texas_2")), &mut view).unwrap();

        let Outcome::Exported { groups, text } = session.dispatch(Command::Export, &mut view).unwrap() else {
            panic!("expected export outcome");
        };
        assert_eq!(groups, 1);
        assert_eq!(
            text,
            r##"{"groups":{"#FF0000":{"label":"Red country","paths":["Texas_1-2"]}}}"##
        );
    }

    #[test]
    fn viewport_commands_forward_transforms() {
        let (mut session, mut view) = session();
        session
            .dispatch(Command::Zoom { x: 100.0, y: 100.0, delta_y: -100.0 }, &mut view)
            .unwrap();
        session
            .dispatch(Command::BeginDrag { pointer_id: 1, x: 0.0, y: 0.0 }, &mut view)
            .unwrap();
        session
            .dispatch(Command::UpdateDrag { pointer_id: 1, x: 5.0, y: 5.0 }, &mut view)
            .unwrap();
        session.dispatch(Command::EndDrag { pointer_id: 1 }, &mut view).unwrap();
        session.dispatch(Command::ResetView, &mut view).unwrap();

        assert_eq!(view.transforms().len(), 3);
        assert_eq!(view.transforms().last(), Some(&Transform::new(3.0, -1600.0, -50.0)));
        assert!(!session.viewport().is_dragging());
    }
}
