// src/main.rs

//! Headless demo: a bouncing box driven through the full event pipeline.
//!
//! Usage: `lcdui-core [config.json]`

use anyhow::Context;
use lcdui_core::display::HeadlessDisplayDriver;
use lcdui_core::graphics::Graphics;
use lcdui_core::keys::KEY_FIRE;
use lcdui_core::{Canvas, CanvasApp, Config, Dispatcher, EventQueue};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

const DISPLAY_WIDTH: i32 = 240;
const DISPLAY_HEIGHT: i32 = 320;
const FRAMES: u32 = 120;
const BOX_SIZE: i32 = 16;

/// Moves a box around the canvas, one step per paint.
#[derive(Default)]
struct BouncingBox {
    x: AtomicI32,
    y: AtomicI32,
    dx: AtomicI32,
    dy: AtomicI32,
    color: AtomicU32,
    paints: AtomicU32,
}

impl BouncingBox {
    fn new() -> Self {
        let app = Self::default();
        app.dx.store(3, Ordering::Relaxed);
        app.dy.store(2, Ordering::Relaxed);
        app.color.store(0xFF4040, Ordering::Relaxed);
        app
    }

    fn step(position: &AtomicI32, velocity: &AtomicI32, limit: i32) -> i32 {
        let mut p = position.load(Ordering::Relaxed) + velocity.load(Ordering::Relaxed);
        if p < 0 || p > limit {
            velocity.store(-velocity.load(Ordering::Relaxed), Ordering::Relaxed);
            p = p.clamp(0, limit.max(0));
        }
        position.store(p, Ordering::Relaxed);
        p
    }
}

impl CanvasApp for BouncingBox {
    fn paint(&self, _canvas: &Canvas, g: &mut Graphics<'_>) -> anyhow::Result<()> {
        let x = Self::step(&self.x, &self.dx, g.width() - BOX_SIZE);
        let y = Self::step(&self.y, &self.dy, g.height() - BOX_SIZE);

        g.set_color(0x000000);
        g.fill_rect(0, 0, g.width(), g.height());
        g.set_color(self.color.load(Ordering::Relaxed));
        g.fill_rect(x, y, BOX_SIZE, BOX_SIZE);
        self.paints.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn size_changed(&self, _canvas: &Canvas, width: i32, height: i32) {
        info!("Demo: Canvas is {}x{}", width, height);
    }

    fn key_pressed(&self, _canvas: &Canvas, code: i32) {
        if code == KEY_FIRE {
            self.color.fetch_xor(0xFFFFFF, Ordering::Relaxed);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting lcdui-core demo...");

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Config::load(&path).context("Failed to load configuration")?,
        None => {
            info!("No configuration file given, using defaults.");
            Config::default()
        }
    };
    debug!("Configuration: {:?}", config);

    let queue = Arc::new(EventQueue::new());
    let app = Arc::new(BouncingBox::new());
    let driver = HeadlessDisplayDriver::new();
    let frame_log = driver.frame_log();
    let canvas = Canvas::new(
        Arc::clone(&queue),
        app.clone(),
        Box::new(driver),
        &config,
        DISPLAY_WIDTH,
        DISPLAY_HEIGHT,
    );

    let dispatcher = Dispatcher::spawn(Arc::clone(&queue), canvas.clone())
        .context("Failed to start the dispatcher")?;

    canvas.surface_created();
    canvas.surface_changed(DISPLAY_WIDTH, DISPLAY_HEIGHT);

    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            canvas.post_key_pressed(KEY_FIRE);
            canvas.post_key_released(KEY_FIRE);
        }
        canvas.repaint();
        canvas.service_repaints();
    }

    dispatcher.shutdown();

    info!(
        "Demo finished: {} paints, {} frames presented",
        app.paints.load(Ordering::Relaxed),
        frame_log.presented()
    );
    Ok(())
}
