// src/display/drivers/mod.rs
//! Display driver implementations.

pub mod headless;

pub use headless::{FrameLog, HeadlessDisplayDriver};
