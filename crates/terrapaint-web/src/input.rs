#![forbid(unsafe_code)]

//! Deterministic, JSON-friendly input schema for `terrapaint-web`.
//!
//! The web host (JS/TS) is expected to provide:
//! - pointer coordinates relative to the map container (CSS pixels),
//! - the raw DOM `deltaY` for wheel events, and
//! - the raw `id` attribute of the shape for region events.
//!
//! This module focuses on:
//! - a compact modifier bitset (`mods: u8`) and button bitset (`buttons: u8`),
//! - JSON encoding suitable for record/replay, and
//! - [`InputRouter`], which turns events into session [`Command`]s.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use terrapaint_core::{Command, normalize};
use tracing::trace;

bitflags! {
    /// Modifier keys held during an input event.
    ///
    /// These flags are encoded as a compact `u8` bitset in JSON (`mods`).
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

impl Modifiers {
    #[must_use]
    pub const fn from_bits_truncate_u8(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

bitflags! {
    /// Pressed pointer buttons, bit-compatible with DOM `PointerEvent.buttons`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Buttons: u8 {
        const PRIMARY   = 0b0001;
        const SECONDARY = 0b0010;
        const AUXILIARY = 0b0100;
    }
}

/// Phase for pointer events on the map container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Phase for events targeted at one map shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionPhase {
    Click,
    /// The pointer entered the shape (`pointerenter`/`mouseover`).
    Enter,
}

/// Normalized pointer event in container coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub phase: PointerPhase,
    pub pointer_id: u32,
    pub x: f64,
    pub y: f64,
    pub buttons: Buttons,
    pub mods: Modifiers,
}

/// Normalized wheel event. `delta_y` is the DOM `deltaY` in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub x: f64,
    pub y: f64,
    pub delta_y: f64,
    pub mods: Modifiers,
}

/// Normalized event on one map shape; `id` is the raw shape id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionInput {
    pub phase: RegionPhase,
    pub id: Box<str>,
    pub buttons: Buttons,
    pub mods: Modifiers,
}

/// Normalized, deterministic web input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pointer(PointerInput),
    Wheel(WheelInput),
    Region(RegionInput),
}

/// JSON encoding used by the host page and recorded traces.
///
/// This is intentionally small and stable: a `kind` tag plus the minimum
/// semantic fields needed for replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEventJson {
    PointerDown {
        pointer_id: u32,
        x: f64,
        y: f64,
        #[serde(default)]
        buttons: u8,
        #[serde(default)]
        mods: u8,
    },
    PointerMove {
        pointer_id: u32,
        x: f64,
        y: f64,
        #[serde(default)]
        buttons: u8,
        #[serde(default)]
        mods: u8,
    },
    PointerUp {
        pointer_id: u32,
        x: f64,
        y: f64,
        #[serde(default)]
        buttons: u8,
        #[serde(default)]
        mods: u8,
    },
    PointerCancel {
        pointer_id: u32,
    },
    Wheel {
        x: f64,
        y: f64,
        dy: f64,
        #[serde(default)]
        mods: u8,
    },
    RegionClick {
        id: String,
        #[serde(default)]
        mods: u8,
    },
    RegionEnter {
        id: String,
        #[serde(default)]
        buttons: u8,
        #[serde(default)]
        mods: u8,
    },
}

impl InputEvent {
    /// Encode this event as a stable JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&InputEventJson::from(self))
    }

    /// Decode an event JSON string.
    ///
    /// Errors occur if the JSON does not match the expected schema.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let json: InputEventJson = serde_json::from_str(s)?;
        Ok(Self::from(json))
    }
}

impl From<&InputEvent> for InputEventJson {
    fn from(value: &InputEvent) -> Self {
        match value {
            InputEvent::Pointer(p) => {
                let (pointer_id, x, y, buttons, mods) =
                    (p.pointer_id, p.x, p.y, p.buttons.bits(), p.mods.bits());
                match p.phase {
                    PointerPhase::Down => Self::PointerDown {
                        pointer_id,
                        x,
                        y,
                        buttons,
                        mods,
                    },
                    PointerPhase::Move => Self::PointerMove {
                        pointer_id,
                        x,
                        y,
                        buttons,
                        mods,
                    },
                    PointerPhase::Up => Self::PointerUp {
                        pointer_id,
                        x,
                        y,
                        buttons,
                        mods,
                    },
                    PointerPhase::Cancel => Self::PointerCancel { pointer_id },
                }
            }
            InputEvent::Wheel(w) => Self::Wheel {
                x: w.x,
                y: w.y,
                dy: w.delta_y,
                mods: w.mods.bits(),
            },
            InputEvent::Region(r) => match r.phase {
                RegionPhase::Click => Self::RegionClick {
                    id: r.id.to_string(),
                    mods: r.mods.bits(),
                },
                RegionPhase::Enter => Self::RegionEnter {
                    id: r.id.to_string(),
                    buttons: r.buttons.bits(),
                    mods: r.mods.bits(),
                },
            },
        }
    }
}

impl From<InputEventJson> for InputEvent {
    fn from(value: InputEventJson) -> Self {
        let pointer = |phase, pointer_id, x, y, buttons, mods| {
            Self::Pointer(PointerInput {
                phase,
                pointer_id,
                x,
                y,
                buttons: Buttons::from_bits_truncate(buttons),
                mods: Modifiers::from_bits_truncate_u8(mods),
            })
        };
        match value {
            InputEventJson::PointerDown {
                pointer_id,
                x,
                y,
                buttons,
                mods,
            } => pointer(PointerPhase::Down, pointer_id, x, y, buttons, mods),
            InputEventJson::PointerMove {
                pointer_id,
                x,
                y,
                buttons,
                mods,
            } => pointer(PointerPhase::Move, pointer_id, x, y, buttons, mods),
            InputEventJson::PointerUp {
                pointer_id,
                x,
                y,
                buttons,
                mods,
            } => pointer(PointerPhase::Up, pointer_id, x, y, buttons, mods),
            InputEventJson::PointerCancel { pointer_id } => {
                pointer(PointerPhase::Cancel, pointer_id, 0.0, 0.0, 0, 0)
            }
            InputEventJson::Wheel { x, y, dy, mods } => Self::Wheel(WheelInput {
                x,
                y,
                delta_y: dy,
                mods: Modifiers::from_bits_truncate_u8(mods),
            }),
            InputEventJson::RegionClick { id, mods } => Self::Region(RegionInput {
                phase: RegionPhase::Click,
                id: id.into(),
                buttons: Buttons::empty(),
                mods: Modifiers::from_bits_truncate_u8(mods),
            }),
            InputEventJson::RegionEnter { id, buttons, mods } => Self::Region(RegionInput {
                phase: RegionPhase::Enter,
                id: id.into(),
                buttons: Buttons::from_bits_truncate(buttons),
                mods: Modifiers::from_bits_truncate_u8(mods),
            }),
        }
    }
}

/// Pointer travel (CSS px) beyond which a press counts as a pan, not a click.
pub const DEFAULT_CLICK_SLOP: f64 = 4.0;

/// Router settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterConfig {
    /// Held modifier that turns a press into a paint stroke instead of a pan.
    pub paint_modifier: Modifiers,
    pub click_slop: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            paint_modifier: Modifiers::SHIFT,
            click_slop: DEFAULT_CLICK_SLOP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Panning {
        pointer_id: u32,
        start_x: f64,
        start_y: f64,
        moved: bool,
    },
    Painting {
        pointer_id: u32,
    },
}

/// Translates input events into session commands.
///
/// A plain press pans the map (the first pointer wins). A press with the
/// paint modifier starts a stroke: every shape entered with the primary
/// button held is painted. Releasing ends both. A click that follows a pan
/// which travelled past `click_slop` is dropped.
#[derive(Debug, Clone)]
pub struct InputRouter {
    config: RouterConfig,
    gesture: Gesture,
    suppress_click: bool,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl InputRouter {
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            gesture: Gesture::Idle,
            suppress_click: false,
        }
    }

    #[must_use]
    pub fn is_painting(&self) -> bool {
        matches!(self.gesture, Gesture::Painting { .. })
    }

    #[must_use]
    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    /// Commands for one event, in dispatch order.
    pub fn route(&mut self, event: &InputEvent) -> Vec<Command> {
        match event {
            InputEvent::Pointer(p) => self.route_pointer(p),
            InputEvent::Wheel(w) => vec![Command::Zoom {
                x: w.x,
                y: w.y,
                delta_y: w.delta_y,
            }],
            InputEvent::Region(r) => self.route_region(r),
        }
    }

    fn route_pointer(&mut self, p: &PointerInput) -> Vec<Command> {
        match (p.phase, self.gesture) {
            (PointerPhase::Down, Gesture::Idle) => {
                self.suppress_click = false;
                if p.mods.contains(self.config.paint_modifier) {
                    self.gesture = Gesture::Painting {
                        pointer_id: p.pointer_id,
                    };
                    Vec::new()
                } else {
                    self.gesture = Gesture::Panning {
                        pointer_id: p.pointer_id,
                        start_x: p.x,
                        start_y: p.y,
                        moved: false,
                    };
                    vec![Command::BeginDrag {
                        pointer_id: p.pointer_id,
                        x: p.x,
                        y: p.y,
                    }]
                }
            }
            (PointerPhase::Down, _) => {
                trace!(pointer_id = p.pointer_id, "ignoring pointer down during gesture");
                Vec::new()
            }
            (
                PointerPhase::Move,
                Gesture::Panning {
                    pointer_id,
                    start_x,
                    start_y,
                    moved,
                },
            ) if pointer_id == p.pointer_id => {
                let travelled = (p.x - start_x).hypot(p.y - start_y) > self.config.click_slop;
                self.gesture = Gesture::Panning {
                    pointer_id,
                    start_x,
                    start_y,
                    moved: moved || travelled,
                };
                vec![Command::UpdateDrag {
                    pointer_id,
                    x: p.x,
                    y: p.y,
                }]
            }
            (PointerPhase::Up, Gesture::Panning { pointer_id, moved, .. })
                if pointer_id == p.pointer_id =>
            {
                self.gesture = Gesture::Idle;
                self.suppress_click = moved;
                vec![Command::EndDrag { pointer_id }]
            }
            (PointerPhase::Up, Gesture::Painting { pointer_id }) if pointer_id == p.pointer_id => {
                self.gesture = Gesture::Idle;
                vec![Command::EndStroke]
            }
            (PointerPhase::Cancel, _) => {
                self.gesture = Gesture::Idle;
                self.suppress_click = false;
                vec![Command::CancelDrag, Command::EndStroke]
            }
            _ => Vec::new(),
        }
    }

    fn route_region(&mut self, r: &RegionInput) -> Vec<Command> {
        match r.phase {
            RegionPhase::Click => {
                if std::mem::take(&mut self.suppress_click) {
                    trace!(id = %r.id, "dropping click that ended a pan");
                    return Vec::new();
                }
                vec![Command::Click(normalize(&r.id))]
            }
            RegionPhase::Enter => {
                if self.is_painting() && r.buttons.contains(Buttons::PRIMARY) {
                    vec![Command::PaintOver(normalize(&r.id))]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pointer(phase: PointerPhase, pointer_id: u32, x: f64, y: f64, mods: Modifiers) -> InputEvent {
        InputEvent::Pointer(PointerInput {
            phase,
            pointer_id,
            x,
            y,
            buttons: Buttons::PRIMARY,
            mods,
        })
    }

    fn region(phase: RegionPhase, id: &str, buttons: Buttons) -> InputEvent {
        InputEvent::Region(RegionInput {
            phase,
            id: id.into(),
            buttons,
            mods: Modifiers::empty(),
        })
    }

    #[test]
    fn json_uses_kind_tags() {
        let ev = InputEvent::Wheel(WheelInput {
            x: 10.0,
            y: 20.5,
            delta_y: -120.0,
            mods: Modifiers::CTRL,
        });
        assert_eq!(
            ev.to_json_string().unwrap(),
            r#"{"kind":"wheel","x":10.0,"y":20.5,"dy":-120.0,"mods":4}"#
        );
    }

    #[test]
    fn host_json_with_omitted_bitsets_parses() {
        let ev = InputEvent::from_json_str(r#"{"kind":"region_click","id":"Texas_03"}"#).unwrap();
        assert_eq!(ev, region(RegionPhase::Click, "Texas_03", Buttons::empty()));

        let ev = InputEvent::from_json_str(r#"{"kind":"pointer_down","pointer_id":1,"x":5,"y":6}"#)
            .unwrap();
        assert!(matches!(
            ev,
            InputEvent::Pointer(PointerInput {
                phase: PointerPhase::Down,
                pointer_id: 1,
                ..
            })
        ));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(InputEvent::from_json_str(r#"{"kind":"key","code":"a"}"#).is_err());
    }

    #[test]
    fn wheel_routes_to_zoom() {
        let mut router = InputRouter::default();
        let ev = InputEvent::from_json_str(r#"{"kind":"wheel","x":1,"y":2,"dy":53}"#).unwrap();
        assert_eq!(
            router.route(&ev),
            vec![Command::Zoom {
                x: 1.0,
                y: 2.0,
                delta_y: 53.0
            }]
        );
    }

    #[test]
    fn plain_press_pans() {
        let mut router = InputRouter::default();
        let none = Modifiers::empty();
        assert_eq!(
            router.route(&pointer(PointerPhase::Down, 1, 0.0, 0.0, none)),
            vec![Command::BeginDrag {
                pointer_id: 1,
                x: 0.0,
                y: 0.0
            }]
        );
        assert_eq!(
            router.route(&pointer(PointerPhase::Move, 1, 9.0, 0.0, none)),
            vec![Command::UpdateDrag {
                pointer_id: 1,
                x: 9.0,
                y: 0.0
            }]
        );
        assert!(router.route(&pointer(PointerPhase::Move, 2, 9.0, 0.0, none)).is_empty());
        assert_eq!(
            router.route(&pointer(PointerPhase::Up, 1, 9.0, 0.0, none)),
            vec![Command::EndDrag { pointer_id: 1 }]
        );
        assert!(!router.is_panning());
    }

    #[test]
    fn click_after_long_pan_is_dropped() {
        let mut router = InputRouter::default();
        let none = Modifiers::empty();
        router.route(&pointer(PointerPhase::Down, 1, 0.0, 0.0, none));
        router.route(&pointer(PointerPhase::Move, 1, 30.0, 40.0, none));
        router.route(&pointer(PointerPhase::Up, 1, 30.0, 40.0, none));

        assert!(router.route(&region(RegionPhase::Click, "Ohio", Buttons::empty())).is_empty());
        // Only the one click is swallowed.
        assert_eq!(
            router.route(&region(RegionPhase::Click, "Ohio", Buttons::empty())),
            vec![Command::Click(normalize("Ohio"))]
        );
    }

    #[test]
    fn click_after_tiny_jitter_goes_through() {
        let mut router = InputRouter::default();
        let none = Modifiers::empty();
        router.route(&pointer(PointerPhase::Down, 1, 0.0, 0.0, none));
        router.route(&pointer(PointerPhase::Move, 1, 1.0, 1.0, none));
        router.route(&pointer(PointerPhase::Up, 1, 1.0, 1.0, none));

        assert_eq!(
            router.route(&region(RegionPhase::Click, "Texas_03", Buttons::empty())),
            vec![Command::Click(normalize("Texas_3"))]
        );
    }

    #[test]
    fn modifier_press_paints_entered_regions() {
        let mut router = InputRouter::default();
        assert!(
            router
                .route(&pointer(PointerPhase::Down, 1, 0.0, 0.0, Modifiers::SHIFT))
                .is_empty()
        );
        assert!(router.is_painting());

        assert_eq!(
            router.route(&region(RegionPhase::Enter, "A_01", Buttons::PRIMARY)),
            vec![Command::PaintOver(normalize("A_1"))]
        );
        assert!(router.route(&region(RegionPhase::Enter, "A_2", Buttons::empty())).is_empty());
        assert!(
            router
                .route(&pointer(PointerPhase::Move, 1, 5.0, 5.0, Modifiers::SHIFT))
                .is_empty()
        );
        assert_eq!(
            router.route(&pointer(PointerPhase::Up, 1, 5.0, 5.0, Modifiers::SHIFT)),
            vec![Command::EndStroke]
        );
    }

    #[test]
    fn enter_without_stroke_does_nothing() {
        let mut router = InputRouter::default();
        assert!(router.route(&region(RegionPhase::Enter, "A", Buttons::PRIMARY)).is_empty());
    }

    #[test]
    fn second_pointer_is_ignored_while_panning() {
        let mut router = InputRouter::default();
        let none = Modifiers::empty();
        router.route(&pointer(PointerPhase::Down, 1, 0.0, 0.0, none));
        assert!(router.route(&pointer(PointerPhase::Down, 2, 50.0, 50.0, none)).is_empty());
        assert!(router.route(&pointer(PointerPhase::Up, 2, 50.0, 50.0, none)).is_empty());
        assert!(router.is_panning());
    }

    #[test]
    fn cancel_resets_everything() {
        let mut router = InputRouter::default();
        router.route(&pointer(PointerPhase::Down, 1, 0.0, 0.0, Modifiers::SHIFT));
        let ev = InputEvent::from_json_str(r#"{"kind":"pointer_cancel","pointer_id":7}"#).unwrap();
        assert_eq!(router.route(&ev), vec![Command::CancelDrag, Command::EndStroke]);
        assert!(!router.is_painting());
    }
}
