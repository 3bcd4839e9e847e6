#![forbid(unsafe_code)]

//! Host-agnostic territory-assignment engine.
//!
//! `terrapaint-core` is the platform-independent model behind the map
//! painter. It decides which group owns each map region and which fill each
//! shape should show, all without touching a DOM or doing any I/O.
//!
//! # Primary responsibilities
//!
//! - **Region ids**: canonical keys for shapes (`Texas_03` → `Texas_3`).
//! - **Ownership**: regions, groups, and the membership relation between them.
//! - **Engine**: assign / unassign / reset, with one repaint per change.
//! - **Range codes**: `Texas_3-5` expansion and the inverse compression.
//! - **Saves**: MapChart-style JSON import and export.
//! - **Viewport**: anchored wheel zoom and pointer-drag panning.
//! - **Session**: brush state and a closed command set for hosts.
//!
//! # Design principles
//!
//! - **No I/O**: hosts supply shapes and save text, and receive paint calls
//!   through [`MapView`].
//! - **Deterministic**: regions and groups iterate in insertion order.
//! - **`#![forbid(unsafe_code)]`**: safety enforced at compile time.

pub mod color;
pub mod config;
pub mod engine;
pub mod ownership;
pub mod range_code;
pub mod region_id;
pub mod save;
pub mod session;
pub mod view;
pub mod viewport;

pub use color::{FillColor, PaletteEntry, UNOWNED_FILL, default_palette};
pub use config::{ConfigError, ConfigParse, EngineConfig};
pub use engine::{AssignOutcome, EngineError, UnassignOutcome};
pub use ownership::{Group, GroupId, InvariantViolation, LoadReport, Region, TerritoryMap};
pub use range_code::{
    DEFAULT_MAX_RANGE_SPAN, InvalidRange, InvalidRangeReason, compress, expand, expand_with_limit,
};
pub use region_id::{RegionId, normalize};
pub use save::{
    ImportError, ImportLimits, ImportOutcome, ImportReport, SaveDocument, SaveEntry, SaveGroup,
    SkipError, SkippedCode, export, group_color, import, import_text,
};
pub use session::{Brush, Command, IgnoreReason, Outcome, RegionChange, Session, SessionError};
pub use view::{MapView, NullView, PaintRecord, RecordingView};
pub use viewport::{Transform, Viewport, ViewportConfig, ViewportEffect, ViewportNoopReason};
