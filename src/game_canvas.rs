// src/game_canvas.rs

//! Game-style canvas: polled key state and an application-owned back buffer
//! pushed to the screen with [`GameCanvas::flush_graphics`].

use crate::canvas::{Canvas, CanvasApp};
use crate::graphics::Graphics;
use crate::image::Image;
use crate::keys::{
    KEY_DOWN, KEY_FIRE, KEY_LEFT, KEY_NUM2, KEY_NUM4, KEY_NUM5, KEY_NUM6, KEY_NUM7, KEY_NUM8,
    KEY_NUM9, KEY_POUND, KEY_RIGHT, KEY_STAR, KEY_UP,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

bitflags! {
    /// Held game keys, one bit per game action code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct GameKeys: u32 {
        const UP_PRESSED = 1 << 1;
        const LEFT_PRESSED = 1 << 2;
        const RIGHT_PRESSED = 1 << 5;
        const DOWN_PRESSED = 1 << 6;
        const FIRE_PRESSED = 1 << 8;
        const GAME_A_PRESSED = 1 << 9;
        const GAME_B_PRESSED = 1 << 10;
        const GAME_C_PRESSED = 1 << 11;
        const GAME_D_PRESSED = 1 << 12;
    }
}

/// Game key bit for a handset key code (before vendor remapping).
pub fn convert_game_key_code(code: i32) -> GameKeys {
    match code {
        KEY_LEFT | KEY_NUM4 => GameKeys::LEFT_PRESSED,
        KEY_UP | KEY_NUM2 => GameKeys::UP_PRESSED,
        KEY_RIGHT | KEY_NUM6 => GameKeys::RIGHT_PRESSED,
        KEY_DOWN | KEY_NUM8 => GameKeys::DOWN_PRESSED,
        KEY_FIRE | KEY_NUM5 => GameKeys::FIRE_PRESSED,
        KEY_NUM7 => GameKeys::GAME_A_PRESSED,
        KEY_NUM9 => GameKeys::GAME_B_PRESSED,
        KEY_STAR => GameKeys::GAME_C_PRESSED,
        KEY_POUND => GameKeys::GAME_D_PRESSED,
        _ => GameKeys::empty(),
    }
}

/// Shared back buffer. As a [`CanvasApp`] it paints itself at the origin,
/// which is all a game canvas that only uses `flush_graphics` needs.
#[derive(Debug, Clone)]
pub struct BackBuffer {
    image: Arc<Mutex<Image>>,
}

impl BackBuffer {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            image: Arc::new(Mutex::new(Image::new(width, height))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Image> {
        self.image.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn width(&self) -> i32 {
        self.lock().width()
    }

    pub fn height(&self) -> i32 {
        self.lock().height()
    }

    /// Draws the buffer at the origin of `g`.
    pub fn paint_into(&self, g: &mut Graphics<'_>) {
        g.draw_image(&self.lock(), 0, 0);
    }

    fn resize(&self, width: i32, height: i32) {
        let mut image = self.lock();
        if image.width() != width || image.height() != height {
            let previous = std::mem::replace(&mut *image, Image::new(1, 1));
            *image = Image::reallocate(Some(previous), width, height);
        }
    }
}

impl CanvasApp for BackBuffer {
    fn paint(&self, _canvas: &Canvas, g: &mut Graphics<'_>) -> anyhow::Result<()> {
        self.paint_into(g);
        Ok(())
    }
}

pub struct GameCanvas {
    canvas: Canvas,
    buffer: BackBuffer,
    /// Copy of the back buffer handed to `flush_buffer`, so the back buffer
    /// lock is never held while waiting for the frame lock.
    staging: Mutex<Image>,
}

impl GameCanvas {
    /// Wraps `canvas`, sizing `buffer` to it. With `suppress_commands` the
    /// game keys only update [`key_states`](Self::key_states) and are not
    /// delivered as key events.
    pub fn new(canvas: Canvas, buffer: BackBuffer, suppress_commands: bool) -> Self {
        buffer.resize(canvas.width(), canvas.height());
        canvas.set_suppress_game_keys(suppress_commands);
        let staging = Mutex::new(Image::new(canvas.width(), canvas.height()));
        Self {
            canvas,
            buffer,
            staging,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn back_buffer(&self) -> &BackBuffer {
        &self.buffer
    }

    pub fn key_states(&self) -> GameKeys {
        self.canvas.key_states()
    }

    /// Draws into the back buffer.
    pub fn with_graphics<R>(&self, f: impl FnOnce(&mut Graphics<'_>) -> R) -> R {
        let mut image = self.buffer.lock();
        let mut g = Graphics::new(&mut image);
        f(&mut g)
    }

    /// For applications with their own paint: draws the back buffer into `g`.
    pub fn paint_back_buffer(&self, g: &mut Graphics<'_>) {
        self.buffer.paint_into(g);
    }

    /// Pushes the back buffer to the screen.
    pub fn flush_graphics(&self) {
        let mut staging = self.staging.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        {
            let image = self.buffer.lock();
            if staging.width() != image.width() || staging.height() != image.height() {
                *staging = image.clone();
            } else {
                image.copy_pixels(&mut staging);
            }
        }
        self.canvas.flush_buffer(&staging);
    }

    /// Region variant; the whole buffer is flushed.
    pub fn flush_graphics_region(&self, _x: i32, _y: i32, _width: i32, _height: i32) {
        self.flush_graphics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::display::drivers::HeadlessDisplayDriver;
    use crate::event::{EventQueue, EventTag};
    use crate::keys::{KEY_CLEAR, KEY_NUM0};
    use test_log::test;

    fn game_canvas(suppress: bool) -> (GameCanvas, crate::display::drivers::FrameLog) {
        let queue = Arc::new(EventQueue::new());
        let buffer = BackBuffer::new(1, 1);
        let driver = HeadlessDisplayDriver::new();
        let log = driver.frame_log();
        let mut config = Config::default();
        config.display.virtual_width = 120;
        config.display.virtual_height = 160;
        config.display.force_fullscreen = true;
        let canvas = Canvas::new(
            queue,
            Arc::new(buffer.clone()),
            Box::new(driver),
            &config,
            240,
            320,
        );
        (GameCanvas::new(canvas, buffer, suppress), log)
    }

    #[test]
    fn game_key_bits_follow_game_action_codes() {
        assert_eq!(GameKeys::UP_PRESSED.bits(), 1 << 1);
        assert_eq!(GameKeys::FIRE_PRESSED.bits(), 1 << 8);
        assert_eq!(convert_game_key_code(KEY_NUM5), GameKeys::FIRE_PRESSED);
        assert_eq!(convert_game_key_code(KEY_UP), GameKeys::UP_PRESSED);
        assert_eq!(convert_game_key_code(KEY_STAR), GameKeys::GAME_C_PRESSED);
        assert!(convert_game_key_code(KEY_NUM0).is_empty());
        assert!(convert_game_key_code(KEY_CLEAR).is_empty());
    }

    #[test]
    fn back_buffer_is_sized_to_the_canvas() {
        let (game, _) = game_canvas(false);
        assert_eq!(game.back_buffer().width(), 120);
        assert_eq!(game.back_buffer().height(), 160);
    }

    #[test]
    fn key_states_track_presses_and_releases() {
        let (game, _) = game_canvas(false);
        game.canvas().post_key_pressed(KEY_LEFT);
        game.canvas().post_key_pressed(KEY_NUM5);
        assert_eq!(
            game.key_states(),
            GameKeys::LEFT_PRESSED | GameKeys::FIRE_PRESSED
        );
        game.canvas().post_key_released(KEY_LEFT);
        assert_eq!(game.key_states(), GameKeys::FIRE_PRESSED);
        assert_eq!(game.canvas().queue().queued_count(EventTag::Key), 3);
    }

    #[test]
    fn suppressed_game_keys_are_not_posted() {
        let (game, _) = game_canvas(true);
        game.canvas().post_key_pressed(KEY_FIRE);
        game.canvas().post_key_pressed(KEY_NUM0);
        assert_eq!(game.key_states(), GameKeys::FIRE_PRESSED);
        // Only the non-game key reaches the queue.
        assert_eq!(game.canvas().queue().queued_count(EventTag::Key), 1);
    }

    #[test]
    fn flush_graphics_presents_the_back_buffer() {
        let (game, log) = game_canvas(false);
        game.with_graphics(|g| {
            g.set_color(0x00FF00);
            g.fill_rect(0, 0, g.width(), g.height());
        });
        game.flush_graphics();

        assert_eq!(log.presented(), 1);
        let frame = log.last_frame().unwrap();
        // 120x160 fills 240x320 exactly at 2x.
        assert_eq!(frame.pixel(0, 0), Some(0xFF00FF00));
        assert_eq!(frame.pixel(239, 319), Some(0xFF00FF00));
    }

    #[test]
    fn back_buffer_paints_at_the_origin() {
        let (game, _) = game_canvas(false);
        game.with_graphics(|g| {
            g.set_color(0x0000FF);
            g.fill_rect(0, 0, 10, 10);
        });
        let mut target = Image::new(120, 160);
        let mut g = Graphics::new(&mut target);
        game.paint_back_buffer(&mut g);
        assert_eq!(target.pixel(5, 5), Some(0xFF0000FF));
        assert_eq!(target.pixel(50, 50), Some(0xFFFFFFFF));
    }
}
