//! Headless display driver implementation.
//!
//! Keeps the last presented frame and a frame counter in a shared
//! [`FrameLog`] so tests and the demo binary can inspect what reached the
//! "screen" after the driver itself has been moved into the canvas.

use crate::display::driver::DisplayDriver;
use crate::error::LcduiError;
use crate::image::Image;
use log::trace;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FrameLogState {
    presented: u64,
    last_frame: Option<Image>,
}

/// Shared record of presented frames.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    state: Arc<Mutex<FrameLogState>>,
}

impl FrameLog {
    fn lock(&self) -> MutexGuard<'_, FrameLogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.lock().presented
    }

    /// Copy of the most recently presented frame.
    pub fn last_frame(&self) -> Option<Image> {
        self.lock().last_frame.clone()
    }
}

pub struct HeadlessDisplayDriver {
    log: FrameLog,
    fail_present: bool,
}

impl HeadlessDisplayDriver {
    pub fn new() -> Self {
        Self {
            log: FrameLog::default(),
            fail_present: false,
        }
    }

    /// A driver whose `present` always fails. Used to exercise error paths.
    pub fn failing() -> Self {
        Self {
            log: FrameLog::default(),
            fail_present: true,
        }
    }

    pub fn frame_log(&self) -> FrameLog {
        self.log.clone()
    }
}

impl Default for HeadlessDisplayDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayDriver for HeadlessDisplayDriver {
    fn present(&mut self, frame: &Image) -> Result<(), LcduiError> {
        if self.fail_present {
            return Err(LcduiError::PresentFailed(
                "headless driver configured to fail".to_string(),
            ));
        }
        let mut state = self.log.lock();
        state.presented += 1;
        trace!(
            "HeadlessDisplayDriver: Present #{} ({}x{})",
            state.presented,
            frame.width(),
            frame.height()
        );
        match state.last_frame.as_mut() {
            Some(last) if last.width() == frame.width() && last.height() == frame.height() => {
                frame.copy_pixels(last)
            }
            _ => state.last_frame = Some(frame.clone()),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}
