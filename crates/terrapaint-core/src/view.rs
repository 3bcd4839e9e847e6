//! View collaborator seam.
//!
//! The engine decides what each shape should look like and pushes that
//! decision through [`MapView`]; it never reads anything back. Hosts
//! implement the trait over their display primitives. [`RecordingView`]
//! captures the stream instead, for tests and for hosts that batch updates.

use crate::color::FillColor;
use crate::region_id::RegionId;
use crate::viewport::Transform;

/// Receiver of fill and transform updates.
pub trait MapView<H> {
    /// Show `fill` on the shape for `region`.
    fn paint(&mut self, region: &RegionId, shape: &H, fill: &FillColor);

    /// Apply a new pan/zoom transform to the map group.
    fn apply_transform(&mut self, transform: &Transform) {
        let _ = transform;
    }

    /// Called once after a full sweep painted `painted` regions.
    fn full_repaint_done(&mut self, painted: usize) {
        let _ = painted;
    }
}

impl<H, V> MapView<H> for &mut V
where
    V: MapView<H> + ?Sized,
{
    fn paint(&mut self, region: &RegionId, shape: &H, fill: &FillColor) {
        (**self).paint(region, shape, fill);
    }

    fn apply_transform(&mut self, transform: &Transform) {
        (**self).apply_transform(transform);
    }

    fn full_repaint_done(&mut self, painted: usize) {
        (**self).full_repaint_done(painted);
    }
}

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl<H> MapView<H> for NullView {
    fn paint(&mut self, _region: &RegionId, _shape: &H, _fill: &FillColor) {}
}

/// One captured `paint` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintRecord {
    pub region: RegionId,
    pub fill: FillColor,
}

/// Captures updates for later inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingView {
    paints: Vec<PaintRecord>,
    transforms: Vec<Transform>,
    full_repaints: usize,
}

impl RecordingView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn paints(&self) -> &[PaintRecord] {
        &self.paints
    }

    #[must_use]
    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Number of completed full sweeps.
    #[must_use]
    pub fn full_repaints(&self) -> usize {
        self.full_repaints
    }

    /// Most recent fill painted on `region`, if any.
    #[must_use]
    pub fn last_fill(&self, region: &str) -> Option<&FillColor> {
        self.paints
            .iter()
            .rev()
            .find(|p| p.region.as_str() == region)
            .map(|p| &p.fill)
    }

    pub fn clear(&mut self) {
        self.paints.clear();
        self.transforms.clear();
        self.full_repaints = 0;
    }
}

impl<H> MapView<H> for RecordingView {
    fn paint(&mut self, region: &RegionId, _shape: &H, fill: &FillColor) {
        self.paints.push(PaintRecord {
            region: region.clone(),
            fill: fill.clone(),
        });
    }

    fn apply_transform(&mut self, transform: &Transform) {
        self.transforms.push(*transform);
    }

    fn full_repaint_done(&mut self, _painted: usize) {
        self.full_repaints += 1;
    }
}
