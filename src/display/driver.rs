// src/display/driver.rs
//! DisplayDriver trait - the host surface a composed frame is handed to.
//!
//! ## Threading Model
//! - The driver is owned by the canvas frame state and only touched while the
//!   paint lock is held, so `present` is never called concurrently.
//! - Presentation happens on whichever thread ran the paint cycle: the
//!   dispatch thread normally, or a `service_repaints` caller.
//!
//! ## Lifecycle
//! 1. Construct the driver and hand it to `Canvas::new`.
//! 2. `present()` once per composed frame.
//! 3. `Drop` - Cleanup (no explicit shutdown message)

use crate::error::LcduiError;
use crate::image::Image;

/// Minimal host display interface.
pub trait DisplayDriver: Send {
    /// Displays a physical-size frame.
    ///
    /// ## Error Handling
    /// A failed presentation is logged by the caller and the frame is
    /// dropped; the next paint cycle presents again.
    fn present(&mut self, frame: &Image) -> Result<(), LcduiError>;

    /// Short name for log lines.
    fn name(&self) -> &'static str {
        "display"
    }
}
