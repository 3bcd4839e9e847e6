//! Pan/zoom transform for the map group.
//!
//! Map space maps to screen space as `screen = map * scale + (tx, ty)`. The
//! geometry is never re-rendered; hosts apply [`Transform::to_svg_attribute`]
//! to the group element.
//!
//! Wheel zoom is exponential in the wheel delta so equal ticks multiply the
//! scale by the same factor at any zoom level, and is anchored so the map
//! point under the pointer stays under the pointer.

use serde::{Deserialize, Serialize};

/// Snapshot of the affine map → screen transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform {
    #[must_use]
    pub const fn new(scale: f64, tx: f64, ty: f64) -> Self {
        Self { scale, tx, ty }
    }

    /// Screen point → map point.
    #[must_use]
    pub fn to_map_space(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.tx) / self.scale, (y - self.ty) / self.scale)
    }

    /// Map point → screen point.
    #[must_use]
    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale + self.tx, y * self.scale + self.ty)
    }

    /// SVG `transform` attribute value: `translate(tx ty) scale(s)`.
    #[must_use]
    pub fn to_svg_attribute(&self) -> String {
        format!("translate({} {}) scale({})", self.tx, self.ty, self.scale)
    }
}

/// Zoom bounds, wheel sensitivity, and the home framing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Exponent per wheel `deltaY` unit.
    pub zoom_sensitivity: f64,
    /// Transform restored by [`Viewport::reset_transform`].
    pub home: Transform,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 1.2,
            max_scale: 30.0,
            zoom_sensitivity: 0.0015,
            home: Transform::new(3.0, -1600.0, -50.0),
        }
    }
}

/// Why a viewport operation changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportNoopReason {
    /// A coordinate or delta was NaN or infinite.
    NonFiniteInput,
    /// The scale was already pinned at the bound the wheel pushes toward.
    ScaleClamped,
    /// The wheel delta was zero or too small to move the scale.
    ZeroDelta,
    /// A drag is already in progress; the new pointer is ignored.
    DragAlreadyActive,
    NoActiveDrag,
    /// The event's pointer is not the one that began the drag.
    PointerMismatch,
    /// The pointer has not moved since the last update.
    Unmoved,
}

/// Result of a viewport operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEffect {
    /// The transform changed; hosts should apply it.
    Changed(Transform),
    /// Drag started or ended without moving the map.
    DragStateChanged,
    Noop(ViewportNoopReason),
}

impl ViewportEffect {
    #[must_use]
    pub fn transform(&self) -> Option<Transform> {
        match self {
            Self::Changed(t) => Some(*t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging {
        pointer_id: u32,
        start_x: f64,
        start_y: f64,
        origin_tx: f64,
        origin_ty: f64,
    },
}

/// Pan/zoom state plus a single-pointer drag machine.
#[derive(Debug, Clone)]
pub struct Viewport {
    config: ViewportConfig,
    transform: Transform,
    drag: DragState,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    /// Start at the configured home framing.
    ///
    /// The home scale is clamped into bounds.
    #[must_use]
    pub fn new(config: ViewportConfig) -> Self {
        let mut home = config.home;
        home.scale = clamp_scale(home.scale, &config);
        Self {
            config,
            transform: home,
            drag: DragState::Idle,
        }
    }

    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    #[must_use]
    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Pointer id of the active drag.
    #[must_use]
    pub fn drag_pointer(&self) -> Option<u32> {
        match self.drag {
            DragState::Dragging { pointer_id, .. } => Some(pointer_id),
            DragState::Idle => None,
        }
    }

    /// Wheel zoom anchored at the pointer.
    ///
    /// `(x, y)` is the pointer relative to the map container and `delta_y` is
    /// the DOM wheel `deltaY` (positive scrolls down, which zooms out).
    pub fn zoom(&mut self, x: f64, y: f64, delta_y: f64) -> ViewportEffect {
        if !(x.is_finite() && y.is_finite() && delta_y.is_finite()) {
            return ViewportEffect::Noop(ViewportNoopReason::NonFiniteInput);
        }
        if delta_y == 0.0 {
            return ViewportEffect::Noop(ViewportNoopReason::ZeroDelta);
        }

        let factor = (-delta_y * self.config.zoom_sensitivity).exp();
        let wanted = self.transform.scale * factor;
        if wanted == self.transform.scale {
            return ViewportEffect::Noop(ViewportNoopReason::ZeroDelta);
        }
        let (ax, ay) = self.transform.to_map_space(x, y);
        let scale = clamp_scale(wanted, &self.config);
        if scale == self.transform.scale {
            return ViewportEffect::Noop(ViewportNoopReason::ScaleClamped);
        }

        self.transform = Transform {
            scale,
            tx: x - ax * scale,
            ty: y - ay * scale,
        };
        ViewportEffect::Changed(self.transform)
    }

    /// Begin panning with `pointer_id` at `(x, y)`.
    ///
    /// While a drag is active, further pointer-downs are ignored and the
    /// active drag keeps its start point.
    pub fn begin_drag(&mut self, pointer_id: u32, x: f64, y: f64) -> ViewportEffect {
        if !(x.is_finite() && y.is_finite()) {
            return ViewportEffect::Noop(ViewportNoopReason::NonFiniteInput);
        }
        if self.is_dragging() {
            return ViewportEffect::Noop(ViewportNoopReason::DragAlreadyActive);
        }
        self.drag = DragState::Dragging {
            pointer_id,
            start_x: x,
            start_y: y,
            origin_tx: self.transform.tx,
            origin_ty: self.transform.ty,
        };
        ViewportEffect::DragStateChanged
    }

    /// Move the active drag; translation follows the total pointer delta.
    pub fn update_drag(&mut self, pointer_id: u32, x: f64, y: f64) -> ViewportEffect {
        let DragState::Dragging {
            pointer_id: active,
            start_x,
            start_y,
            origin_tx,
            origin_ty,
        } = self.drag
        else {
            return ViewportEffect::Noop(ViewportNoopReason::NoActiveDrag);
        };
        if active != pointer_id {
            return ViewportEffect::Noop(ViewportNoopReason::PointerMismatch);
        }
        if !(x.is_finite() && y.is_finite()) {
            return ViewportEffect::Noop(ViewportNoopReason::NonFiniteInput);
        }

        let tx = origin_tx + (x - start_x);
        let ty = origin_ty + (y - start_y);
        if tx == self.transform.tx && ty == self.transform.ty {
            return ViewportEffect::Noop(ViewportNoopReason::Unmoved);
        }
        self.transform.tx = tx;
        self.transform.ty = ty;
        ViewportEffect::Changed(self.transform)
    }

    /// Release the drag if `pointer_id` owns it.
    pub fn end_drag(&mut self, pointer_id: u32) -> ViewportEffect {
        match self.drag {
            DragState::Idle => ViewportEffect::Noop(ViewportNoopReason::NoActiveDrag),
            DragState::Dragging { pointer_id: active, .. } if active != pointer_id => {
                ViewportEffect::Noop(ViewportNoopReason::PointerMismatch)
            }
            DragState::Dragging { .. } => {
                self.drag = DragState::Idle;
                ViewportEffect::DragStateChanged
            }
        }
    }

    /// Drop any active drag regardless of pointer (pointer cancel).
    pub fn cancel_drag(&mut self) -> ViewportEffect {
        if self.is_dragging() {
            self.drag = DragState::Idle;
            ViewportEffect::DragStateChanged
        } else {
            ViewportEffect::Noop(ViewportNoopReason::NoActiveDrag)
        }
    }

    /// Return to the home framing. Any drag is cancelled.
    pub fn reset_transform(&mut self) -> ViewportEffect {
        self.drag = DragState::Idle;
        let mut home = self.config.home;
        home.scale = clamp_scale(home.scale, &self.config);
        self.transform = home;
        ViewportEffect::Changed(self.transform)
    }
}

// `f64::clamp` panics on inverted or NaN bounds; config is caller-supplied.
fn clamp_scale(scale: f64, config: &ViewportConfig) -> f64 {
    scale.max(config.min_scale).min(config.max_scale)
}
