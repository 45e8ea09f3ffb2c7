// src/canvas/paint.rs

//! The paint cycle: application paint into `offscreen`, copy to
//! `offscreen_copy`, and composition of the copy onto the physical screen.
//!
//! All of it runs under the frame lock (`Canvas::lock_frame`), which is the
//! paint-serialization lock. A thread-local flag marks the thread currently
//! inside the application's paint callback so that `service_repaints` and
//! friends can detect re-entry instead of deadlocking on that lock.

use super::Canvas;
use crate::display::driver::DisplayDriver;
use crate::display::geometry::{Rect, ScreenLayout};
use crate::event::queue::panic_message;
use crate::graphics::Graphics;
use crate::image::Image;
use log::{debug, error, trace, warn};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

thread_local! {
    static PAINTING: Cell<bool> = const { Cell::new(false) };
}

/// True while the calling thread is inside a paint callback.
pub fn is_painting() -> bool {
    PAINTING.with(|flag| flag.get())
}

/// Marks the current thread as painting until dropped.
struct PaintingGuard {
    previous: bool,
}

impl PaintingGuard {
    fn enter() -> Self {
        let previous = PAINTING.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for PaintingGuard {
    fn drop(&mut self) {
        let previous = self.previous;
        PAINTING.with(|flag| flag.set(previous));
    }
}

/// How a paint cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOutcome {
    /// The canvas is not shown; nothing was painted.
    Hidden,
    /// Painted and copied; composed unless redraw runs in parallel.
    Painted,
    /// The paint callback failed; the copy was skipped.
    Failed,
}

/// Counts compositions and logs the rate once per second.
#[derive(Debug)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    last_fps: u32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frames: 0,
            window_start: Instant::now(),
            last_fps: 0,
        }
    }

    pub fn increment(&mut self) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            self.last_fps = (u128::from(self.frames) * 1000 / elapsed.as_millis().max(1)) as u32;
            debug!("Canvas: {} FPS", self.last_fps);
            self.frames = 0;
            self.window_start = Instant::now();
        }
    }

    /// Rate measured over the last complete window.
    pub fn fps(&self) -> u32 {
        self.last_fps
    }
}

/// Buffers and output owned by the paint lock.
pub(crate) struct FrameState {
    /// Written by the paint callback only.
    pub offscreen: Image,
    /// Read by composition only.
    pub offscreen_copy: Image,
    /// Physical-size composed frame.
    pub screen: Image,
    pub driver: Box<dyn DisplayDriver>,
    pub fps: Option<FpsCounter>,
    pub presented: u64,
}

impl FrameState {
    pub fn new(layout: &ScreenLayout, driver: Box<dyn DisplayDriver>, show_fps: bool) -> Self {
        Self {
            offscreen: Image::new(layout.width, layout.height),
            offscreen_copy: Image::new(layout.width, layout.height),
            screen: Image::new(layout.display_width, layout.display_height),
            driver,
            fps: show_fps.then(FpsCounter::new),
            presented: 0,
        }
    }

    /// Reallocates buffers whose dimensions no longer match `layout`.
    pub fn resize(&mut self, layout: &ScreenLayout) {
        if self.offscreen.width() != layout.width || self.offscreen.height() != layout.height {
            debug!(
                "Canvas: Reallocating offscreen pair {}x{} -> {}x{}",
                self.offscreen.width(),
                self.offscreen.height(),
                layout.width,
                layout.height
            );
            let offscreen = std::mem::replace(&mut self.offscreen, Image::new(1, 1));
            self.offscreen = Image::reallocate(Some(offscreen), layout.width, layout.height);
            let copy = std::mem::replace(&mut self.offscreen_copy, Image::new(1, 1));
            self.offscreen_copy = Image::reallocate(Some(copy), layout.width, layout.height);
        }
        if self.screen.width() != layout.display_width
            || self.screen.height() != layout.display_height
        {
            let screen = std::mem::replace(&mut self.screen, Image::new(1, 1));
            self.screen =
                Image::reallocate(Some(screen), layout.display_width, layout.display_height);
        }
    }

    /// Clears the screen, blits `offscreen_copy` at the placement and
    /// presents the result.
    pub fn compose(&mut self, layout: &ScreenLayout, background: u32, filter: bool) {
        let FrameState {
            offscreen_copy,
            screen,
            driver,
            fps,
            presented,
            ..
        } = self;
        let mut g = Graphics::new(screen);
        g.clear(background | 0xFF00_0000);
        g.draw_image_scaled(offscreen_copy, layout.placement, filter);

        match driver.present(screen) {
            Ok(()) => *presented += 1,
            Err(e) => warn!("Canvas: {} present failed: {}", driver.name(), e),
        }
        if let Some(counter) = fps {
            counter.increment();
        }
    }
}

impl Canvas {
    /// Runs one full paint cycle on the calling thread.
    pub(crate) fn paint_cycle(&self) -> PaintOutcome {
        if !self.is_shown() {
            trace!("Canvas: Not shown, skipping paint");
            return PaintOutcome::Hidden;
        }

        let mut frame = self.lock_frame();
        let result = {
            let _painting = PaintingGuard::enter();
            let mut g = Graphics::new(&mut frame.offscreen);
            g.reset();
            panic::catch_unwind(AssertUnwindSafe(|| self.app().paint(self, &mut g)))
        };

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Canvas: paint failed: {:#}", e);
                return PaintOutcome::Failed;
            }
            Err(payload) => {
                error!("Canvas: paint panicked: {}", panic_message(payload.as_ref()));
                return PaintOutcome::Failed;
            }
        }

        let FrameState {
            offscreen,
            offscreen_copy,
            ..
        } = &mut *frame;
        offscreen.copy_pixels(offscreen_copy);

        let settings = self.settings();
        if !settings.parallel_redraw {
            let layout = self.layout();
            frame.compose(&layout, settings.background_color, settings.filter);
        }
        PaintOutcome::Painted
    }

    /// Host-driven composition of the last completed frame, for parallel
    /// redraw. Does nothing when called from inside a paint callback.
    pub fn compose(&self) {
        if is_painting() {
            trace!("Canvas: compose() from inside paint ignored");
            return;
        }
        let settings = self.settings();
        let mut frame = self.lock_frame();
        let layout = self.layout();
        frame.compose(&layout, settings.background_color, settings.filter);
    }

    /// Submits a finished frame directly, bypassing the paint callback.
    ///
    /// Throttled by the frame limiter like `repaint`. Ignored, without
    /// waiting, when called from inside a paint callback.
    pub fn flush_buffer(&self, image: &Image) {
        if is_painting() {
            warn!("Canvas: flush_buffer() from inside paint ignored");
            return;
        }
        self.throttle();
        let settings = self.settings();
        let mut frame = self.lock_frame();
        image.copy_pixels(&mut frame.offscreen_copy);
        if !settings.parallel_redraw {
            let layout = self.layout();
            frame.compose(&layout, settings.background_color, settings.filter);
        }
    }

    /// The last completed frame scaled to the on-screen placement size.
    ///
    /// `None` when called from inside a paint callback.
    pub fn offscreen_snapshot(&self) -> Option<Image> {
        if is_painting() {
            return None;
        }
        let filter = self.settings().filter;
        let frame = self.lock_frame();
        let placement = self.layout().placement;
        let mut image = Image::new(placement.width, placement.height);
        let mut g = Graphics::new(&mut image);
        g.draw_image_scaled(
            &frame.offscreen_copy,
            Rect::new(0, 0, placement.width, placement.height),
            filter,
        );
        Some(image)
    }

    /// Number of frames successfully handed to the display driver.
    pub fn presented_frames(&self) -> u64 {
        if is_painting() {
            return 0;
        }
        self.lock_frame().presented
    }

    /// Composition rate over the last second, when `show_fps` is enabled.
    pub fn fps(&self) -> Option<u32> {
        if is_painting() {
            return None;
        }
        self.lock_frame().fps.as_ref().map(FpsCounter::fps)
    }
}
