#![forbid(unsafe_code)]

//! WASM frontend for terrapaint.
//!
//! This crate is intentionally host-specific (web/WASM). It provides a stable
//! `wasm-bindgen` API surface for:
//! - loading an SVG map into a container and registering its shapes,
//! - routing DOM pointer/wheel/shape events into session commands,
//! - importing and exporting MapChart-style saves.
//!
//! The input schema in [`input`] is target-independent so it can be tested
//! and replayed natively.

pub mod input;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::TerrapaintWeb;

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct TerrapaintWeb;

#[cfg(not(target_arch = "wasm32"))]
impl TerrapaintWeb {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}
