// src/display/mod.rs
//! Host display side of the canvas pipeline.
//!
//! - geometry: virtual-to-physical sizing and placement
//! - DisplayDriver: the host surface that receives composed frames
//! - drivers: concrete drivers (headless)

pub mod driver;
pub mod drivers;
pub mod geometry;

pub use driver::DisplayDriver;
pub use drivers::HeadlessDisplayDriver;
pub use geometry::{compute_layout, Rect, ScreenLayout, SizingInput};
