// src/canvas/mod.rs

//! The canvas: input ingestion, configuration, and event processing for one
//! virtual screen.
//!
//! A [`Canvas`] is a cheap, cloneable handle. Host threads call the input
//! and lifecycle entry points, which only post events. The dispatcher drains
//! the queue and calls [`EventHandler::process`] on the canvas, which is where
//! the application callbacks run.
//!
//! ## Locks
//! - frame (`Mutex<FrameState>`): paint serialization; buffers and driver.
//! - layout (`RwLock<ScreenLayout>`): written only under the frame lock, so
//!   queries like [`Canvas::width`] work from inside paint.
//! - queue: a leaf, taken last.
//!
//! Application callbacks never run with the queue lock held.

pub mod limiter;
pub mod paint;


pub use limiter::FrameLimiter;
pub use paint::{is_painting, FpsCounter, PaintOutcome};

use crate::config::{validate_scale_ratio, Config, FixedKeyboardConfig};
use crate::display::driver::DisplayDriver;
use crate::display::geometry::{compute_layout, Rect, ScreenLayout, SizingInput};
use crate::error::LcduiError;
use crate::event::{
    Event, EventHandler, EventKind, EventQueue, EventTag, Flush, KeyAction, PointerAction,
    PostOutcome, Task,
};
use crate::game_canvas::{convert_game_key_code, GameKeys};
use crate::graphics::Graphics;
use crate::keys::{GameAction, HostKeyTable, KeyLayout, KeyMap};
use log::{debug, info, trace};
use paint::FrameState;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Application side of a canvas.
///
/// Callbacks take `&self`: they are invoked from the dispatch thread and,
/// for `paint`, possibly from a `service_repaints` caller. Implementations
/// keep their own state behind interior mutability.
pub trait CanvasApp: Send + Sync {
    /// Draws the frame into the offscreen buffer.
    fn paint(&self, canvas: &Canvas, g: &mut Graphics<'_>) -> anyhow::Result<()>;

    fn size_changed(&self, _canvas: &Canvas, _width: i32, _height: i32) {}

    fn show_notify(&self, _canvas: &Canvas) {}

    fn hide_notify(&self, _canvas: &Canvas) {}

    fn key_pressed(&self, _canvas: &Canvas, _code: i32) {}

    fn key_repeated(&self, _canvas: &Canvas, _code: i32) {}

    fn key_released(&self, _canvas: &Canvas, _code: i32) {}

    fn pointer_pressed(&self, _canvas: &Canvas, _x: i32, _y: i32) {}

    fn pointer_dragged(&self, _canvas: &Canvas, _x: i32, _y: i32) {}

    fn pointer_released(&self, _canvas: &Canvas, _x: i32, _y: i32) {}
}

/// Host-drawn layer over the canvas (virtual keyboard and the like).
///
/// Input methods get first refusal: returning `true` consumes the event.
/// Coordinates are physical display pixels.
pub trait Overlay: Send + Sync {
    fn resize(&self, _screen: Rect, _virtual_screen: Rect) {}

    fn key_pressed(&self, _code: i32) -> bool {
        false
    }

    fn key_repeated(&self, _code: i32) -> bool {
        false
    }

    fn key_released(&self, _code: i32) -> bool {
        false
    }

    fn pointer_pressed(&self, _pointer: i32, _x: f32, _y: f32) -> bool {
        false
    }

    fn pointer_dragged(&self, _pointer: i32, _x: f32, _y: f32) -> bool {
        false
    }

    fn pointer_released(&self, _pointer: i32, _x: f32, _y: f32) -> bool {
        false
    }

    fn show(&self) {}

    fn hide(&self) {}
}

/// Configuration consumed at the next size recomputation or paint cycle.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub display_width: i32,
    pub display_height: i32,
    pub virtual_width: i32,
    pub virtual_height: i32,
    pub fullscreen: bool,
    pub scale_to_fit: bool,
    pub keep_aspect_ratio: bool,
    pub scale_ratio: i32,
    pub keyboard: Option<FixedKeyboardConfig>,
    pub filter: bool,
    pub touch_input: bool,
    pub hardware_acceleration: bool,
    pub parallel_redraw: bool,
    pub background_color: u32,
}

impl Settings {
    fn from_config(config: &Config, display_width: i32, display_height: i32) -> Self {
        Self {
            display_width,
            display_height,
            virtual_width: config.display.virtual_width,
            virtual_height: config.display.virtual_height,
            fullscreen: config.display.force_fullscreen,
            scale_to_fit: config.scaling.scale_to_fit,
            keep_aspect_ratio: config.scaling.keep_aspect_ratio,
            scale_ratio: config.scaling.scale_ratio,
            keyboard: config.keyboard.clone(),
            filter: config.scaling.filter,
            touch_input: config.input.touch_input,
            hardware_acceleration: config.performance.hardware_acceleration,
            parallel_redraw: config.performance.parallel_redraw,
            background_color: 0xFF00_0000 | config.display.background_color,
        }
    }

    fn sizing_input(&self) -> SizingInput {
        SizingInput {
            display_width: self.display_width,
            display_height: self.display_height,
            virtual_width: self.virtual_width,
            virtual_height: self.virtual_height,
            fullscreen: self.fullscreen,
            scale_to_fit: self.scale_to_fit,
            keep_aspect_ratio: self.keep_aspect_ratio,
            scale_ratio: self.scale_ratio,
            keyboard_reserved_height: self
                .keyboard
                .as_ref()
                .map_or(0, |keyboard| keyboard.reserved_height(self.display_width)),
        }
    }
}

struct CanvasInner {
    queue: Arc<EventQueue>,
    app: Arc<dyn CanvasApp>,
    settings: RwLock<Settings>,
    layout: RwLock<ScreenLayout>,
    frame: Mutex<FrameState>,
    keys: RwLock<KeyMap>,
    host_keys: RwLock<HostKeyTable>,
    overlay: RwLock<Option<Arc<dyn Overlay>>>,
    limiter: FrameLimiter,
    shown: AtomicBool,
    size_changed_called: AtomicBool,
    key_states: AtomicU32,
    suppress_game_keys: AtomicBool,
}

/// Handle to a canvas. Clones share the same canvas.
#[derive(Clone)]
pub struct Canvas {
    inner: Arc<CanvasInner>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("layout", &self.layout())
            .field("shown", &self.is_shown())
            .finish_non_exhaustive()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Canvas {
    /// Creates a canvas for a display of the given physical size.
    ///
    /// The canvas starts hidden; the host reports the surface with
    /// [`surface_created`](Self::surface_created) and
    /// [`surface_changed`](Self::surface_changed).
    pub fn new(
        queue: Arc<EventQueue>,
        app: Arc<dyn CanvasApp>,
        driver: Box<dyn DisplayDriver>,
        config: &Config,
        display_width: i32,
        display_height: i32,
    ) -> Self {
        let settings = Settings::from_config(config, display_width, display_height);
        let layout = compute_layout(&settings.sizing_input());
        info!(
            "Canvas: Created. display={}x{} virtual={}x{} placement={:?}",
            layout.display_width, layout.display_height, layout.width, layout.height, layout.placement
        );

        let frame = FrameState::new(&layout, driver, config.display.show_fps);
        Self {
            inner: Arc::new(CanvasInner {
                queue,
                app,
                settings: RwLock::new(settings),
                layout: RwLock::new(layout),
                frame: Mutex::new(frame),
                keys: RwLock::new(KeyMap::with_layout(config.input.layout)),
                host_keys: RwLock::new(HostKeyTable::from_bindings(&config.input.key_bindings)),
                overlay: RwLock::new(None),
                limiter: FrameLimiter::new(config.performance.fps_limit),
                shown: AtomicBool::new(false),
                size_changed_called: AtomicBool::new(false),
                key_states: AtomicU32::new(0),
                suppress_game_keys: AtomicBool::new(false),
            }),
        }
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.inner.queue
    }

    pub(crate) fn app(&self) -> &dyn CanvasApp {
        self.inner.app.as_ref()
    }

    pub(crate) fn lock_frame(&self) -> MutexGuard<'_, FrameState> {
        self.inner
            .frame
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn settings(&self) -> Settings {
        read(&self.inner.settings).clone()
    }

    fn overlay(&self) -> Option<Arc<dyn Overlay>> {
        read(&self.inner.overlay).clone()
    }

    fn post(&self, kind: EventKind) -> PostOutcome {
        self.inner.queue.post_event(kind)
    }

    pub(crate) fn throttle(&self) {
        self.inner.limiter.throttle();
    }

    // --- Output ---

    /// Requests a repaint of the whole canvas.
    pub fn repaint(&self) {
        self.throttle();
        self.post(EventKind::Paint);
    }

    /// Requests a repaint. The region is ignored; the whole canvas is redrawn.
    pub fn repaint_region(&self, _x: i32, _y: i32, _width: i32, _height: i32) {
        self.repaint();
    }

    /// Returns once a full paint cycle has completed after the call.
    ///
    /// If a paint is in flight, waits for it. If one is queued, removes it
    /// and runs it on the calling thread. From inside the paint callback it
    /// returns immediately.
    pub fn service_repaints(&self) {
        match self.inner.queue.flush(EventTag::Paint, is_painting()) {
            Flush::Reentrant => trace!("Canvas: service_repaints() from inside paint"),
            Flush::Completed => trace!("Canvas: service_repaints() waited for in-flight paint"),
            Flush::Take(run) => {
                trace!("Canvas: service_repaints() running queued paint inline");
                self.paint_cycle();
                drop(run);
            }
            Flush::Idle => {}
        }
    }

    /// Runs `task` on the dispatch thread, in queue order.
    pub fn run_on_dispatcher<F>(&self, task: F) -> PostOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(EventKind::Task(Task::new(task)))
    }

    // --- Input ---

    pub fn post_key_pressed(&self, code: i32) {
        self.post_key(KeyAction::Pressed, code);
    }

    pub fn post_key_repeated(&self, code: i32) {
        self.post_key(KeyAction::Repeated, code);
    }

    pub fn post_key_released(&self, code: i32) {
        self.post_key(KeyAction::Released, code);
    }

    fn post_key(&self, action: KeyAction, code: i32) {
        let game = convert_game_key_code(code);
        match action {
            KeyAction::Pressed | KeyAction::Repeated => {
                self.inner.key_states.fetch_or(game.bits(), Ordering::AcqRel);
            }
            KeyAction::Released => {
                self.inner.key_states.fetch_and(!game.bits(), Ordering::AcqRel);
            }
        }
        if !game.is_empty() && self.inner.suppress_game_keys.load(Ordering::Acquire) {
            trace!("Canvas: Game key {} suppressed", code);
            return;
        }
        let code = read(&self.inner.keys).convert_key_code(code);
        self.post(EventKind::Key { action, code });
    }

    /// Host key press. Returns `false` if the host code is not bound.
    pub fn host_key_down(&self, host_code: i32, repeat: bool) -> bool {
        let Some(code) = read(&self.inner.host_keys).convert(host_code) else {
            trace!("Canvas: Unbound host key {}", host_code);
            return false;
        };
        let consumed = self.overlay().is_some_and(|overlay| {
            if repeat {
                overlay.key_repeated(code)
            } else {
                overlay.key_pressed(code)
            }
        });
        if !consumed {
            if repeat {
                self.post_key_repeated(code);
            } else {
                self.post_key_pressed(code);
            }
        }
        true
    }

    /// Host key release. Returns `false` if the host code is not bound.
    pub fn host_key_up(&self, host_code: i32) -> bool {
        let Some(code) = read(&self.inner.host_keys).convert(host_code) else {
            trace!("Canvas: Unbound host key {}", host_code);
            return false;
        };
        if !self.overlay().is_some_and(|overlay| overlay.key_released(code)) {
            self.post_key_released(code);
        }
        true
    }

    /// Pointer down at physical coordinates.
    pub fn host_pointer_pressed(&self, pointer: i32, x: f32, y: f32) {
        let overlay = self.overlay();
        if let Some(overlay) = &overlay {
            if pointer == 0 {
                overlay.show();
            }
            if overlay.pointer_pressed(pointer, x, y) {
                return;
            }
        }
        self.post_pointer(PointerAction::Pressed, pointer, x, y);
    }

    pub fn host_pointer_dragged(&self, pointer: i32, x: f32, y: f32) {
        if self
            .overlay()
            .is_some_and(|overlay| overlay.pointer_dragged(pointer, x, y))
        {
            return;
        }
        self.post_pointer(PointerAction::Dragged, pointer, x, y);
    }

    pub fn host_pointer_released(&self, pointer: i32, x: f32, y: f32) {
        let overlay = self.overlay();
        if let Some(overlay) = &overlay {
            if pointer == 0 {
                overlay.hide();
            }
            if overlay.pointer_released(pointer, x, y) {
                return;
            }
        }
        self.post_pointer(PointerAction::Released, pointer, x, y);
    }

    /// Only the primary pointer reaches the application.
    fn post_pointer(&self, action: PointerAction, pointer: i32, x: f32, y: f32) {
        if pointer != 0 || !self.has_pointer_events() {
            return;
        }
        let (x, y) = self.layout().to_virtual(x, y);
        self.post(EventKind::Pointer {
            action,
            pointer,
            x,
            y,
        });
    }

    // --- Host surface lifecycle ---

    pub fn surface_created(&self) {
        debug!("Canvas: Surface created");
        self.post(EventKind::ShowNotify);
    }

    pub fn surface_destroyed(&self) {
        debug!("Canvas: Surface destroyed");
        self.post(EventKind::HideNotify);
    }

    /// The host surface now measures `width` x `height`. The new layout is
    /// applied in queue order, ahead of the repaint posted here.
    pub fn surface_changed(&self, width: i32, height: i32) {
        debug!("Canvas: Surface changed to {}x{}", width, height);
        self.post(EventKind::DisplayResized { width, height });
        self.post(EventKind::Paint);
    }

    // --- Configuration ---

    pub fn set_full_screen_mode(&self, fullscreen: bool) {
        {
            let mut settings = write(&self.inner.settings);
            if settings.fullscreen == fullscreen {
                return;
            }
            settings.fullscreen = fullscreen;
        }
        if is_painting() {
            // The frame lock is held by this thread; apply in queue order.
            let layout = self.layout();
            self.post(EventKind::DisplayResized {
                width: layout.display_width,
                height: layout.display_height,
            });
            return;
        }
        self.update_size();
        let layout = self.layout();
        self.post(EventKind::SizeChanged {
            width: layout.width,
            height: layout.height,
        });
    }

    /// Negative dimensions are derived from the display aspect ratio.
    /// Takes effect at the next size recomputation.
    pub fn set_virtual_size(&self, width: i32, height: i32) {
        let mut settings = write(&self.inner.settings);
        settings.virtual_width = width;
        settings.virtual_height = height;
    }

    /// Takes effect at the next size recomputation. `scale_ratio` is a
    /// percentage and must be positive.
    pub fn set_scale(
        &self,
        scale_to_fit: bool,
        keep_aspect_ratio: bool,
        scale_ratio: i32,
    ) -> Result<(), LcduiError> {
        validate_scale_ratio(scale_ratio)?;
        let mut settings = write(&self.inner.settings);
        settings.scale_to_fit = scale_to_fit;
        settings.keep_aspect_ratio = keep_aspect_ratio;
        settings.scale_ratio = scale_ratio;
        Ok(())
    }

    pub fn set_filter_bitmap(&self, filter: bool) {
        write(&self.inner.settings).filter = filter;
    }

    /// 0 disables the frame limiter.
    pub fn set_fps_limit(&self, fps_limit: u32) {
        self.inner.limiter.set_fps_limit(fps_limit);
    }

    /// Lets callers blocked in the frame limiter proceed immediately.
    pub fn interrupt_frame_wait(&self) {
        self.inner.limiter.interrupt();
    }

    pub fn set_touch_input(&self, touch_input: bool) {
        write(&self.inner.settings).touch_input = touch_input;
    }

    /// `enabled` is only recorded for the host (see
    /// [`is_hardware_accelerated`](Self::is_hardware_accelerated)).
    /// `parallel_redraw` leaves composition to [`compose`](Self::compose).
    pub fn set_hardware_acceleration(&self, enabled: bool, parallel_redraw: bool) {
        let mut settings = write(&self.inner.settings);
        settings.hardware_acceleration = enabled;
        settings.parallel_redraw = parallel_redraw;
    }

    pub fn set_key_layout(&self, layout: KeyLayout) {
        info!("Canvas: Key layout {:?}", layout);
        write(&self.inner.keys).set_layout(layout);
    }

    pub fn set_host_key_table(&self, table: HostKeyTable) {
        *write(&self.inner.host_keys) = table;
    }

    /// 0xRRGGBB shown around the virtual screen. Alpha is forced opaque.
    pub fn set_background_color(&self, rgb: u32) {
        write(&self.inner.settings).background_color = 0xFF00_0000 | rgb;
    }

    /// Installs (or removes) the overlay and tells it the current geometry.
    pub fn set_overlay(&self, overlay: Option<Arc<dyn Overlay>>) {
        if let Some(overlay) = &overlay {
            let layout = self.layout();
            overlay.resize(layout.screen_rect(), layout.placement);
        }
        *write(&self.inner.overlay) = overlay;
    }

    pub(crate) fn set_suppress_game_keys(&self, suppress: bool) {
        self.inner
            .suppress_game_keys
            .store(suppress, Ordering::Release);
    }

    // --- Queries ---

    pub fn layout(&self) -> ScreenLayout {
        *read(&self.inner.layout)
    }

    pub fn width(&self) -> i32 {
        self.layout().width
    }

    pub fn height(&self) -> i32 {
        self.layout().height
    }

    pub fn max_height(&self) -> i32 {
        self.layout().max_height
    }

    pub fn is_full_screen_mode(&self) -> bool {
        read(&self.inner.settings).fullscreen
    }

    /// Whether the host should back the surface with a GPU layer.
    pub fn is_hardware_accelerated(&self) -> bool {
        read(&self.inner.settings).hardware_acceleration
    }

    pub fn is_shown(&self) -> bool {
        self.inner.shown.load(Ordering::Acquire)
    }

    pub fn has_pointer_events(&self) -> bool {
        read(&self.inner.settings).touch_input
    }

    pub fn has_pointer_motion_events(&self) -> bool {
        self.has_pointer_events()
    }

    pub fn has_repeat_events(&self) -> bool {
        true
    }

    pub fn is_double_buffered(&self) -> bool {
        true
    }

    pub fn fps_limit(&self) -> u32 {
        self.inner.limiter.fps_limit()
    }

    pub fn key_layout(&self) -> KeyLayout {
        read(&self.inner.keys).layout()
    }

    pub fn game_action(&self, code: i32) -> Result<Option<GameAction>, LcduiError> {
        read(&self.inner.keys).game_action(code)
    }

    pub fn key_code(&self, game_action: i32) -> Result<i32, LcduiError> {
        read(&self.inner.keys).key_code(game_action)
    }

    pub fn key_name(&self, code: i32) -> Result<&'static str, LcduiError> {
        read(&self.inner.keys).key_name(code)
    }

    /// Game keys currently held down.
    pub fn key_states(&self) -> GameKeys {
        GameKeys::from_bits_truncate(self.inner.key_states.load(Ordering::Acquire))
    }

    // --- Sizing ---

    /// Recomputes the layout and reallocates buffers whose size changed.
    /// Returns whether the logical canvas size changed.
    ///
    /// The settings are read under the frame lock, so the last recomputation
    /// to publish a layout has seen every settings write before it.
    fn update_size(&self) -> bool {
        let (layout, previous) = {
            let mut frame = self.lock_frame();
            let layout = compute_layout(&self.settings().sizing_input());
            frame.resize(&layout);
            let previous = std::mem::replace(&mut *write(&self.inner.layout), layout);
            (layout, previous)
        };
        debug!(
            "Canvas: Layout virtual={}x{} (max height {}) placement={:?}",
            layout.width, layout.height, layout.max_height, layout.placement
        );
        if let Some(overlay) = self.overlay() {
            overlay.resize(layout.screen_rect(), layout.placement);
        }
        previous.width != layout.width || previous.height != layout.height
    }

    fn display_resized(&self, width: i32, height: i32) {
        {
            let mut settings = write(&self.inner.settings);
            settings.display_width = width;
            settings.display_height = height;
        }
        let changed = self.update_size();
        let first = !self.inner.size_changed_called.swap(true, Ordering::AcqRel);
        if changed || first {
            let layout = self.layout();
            self.app().size_changed(self, layout.width, layout.height);
        }
    }
}

impl EventHandler for Canvas {
    fn process(&self, event: Event) -> anyhow::Result<()> {
        let app = self.app();
        match event.into_kind() {
            EventKind::Paint => {
                self.paint_cycle();
            }
            EventKind::Key { action, code } => match action {
                KeyAction::Pressed => app.key_pressed(self, code),
                KeyAction::Repeated => app.key_repeated(self, code),
                KeyAction::Released => app.key_released(self, code),
            },
            EventKind::Pointer { action, x, y, .. } => {
                let (x, y) = (x.round() as i32, y.round() as i32);
                match action {
                    PointerAction::Pressed => app.pointer_pressed(self, x, y),
                    PointerAction::Dragged => app.pointer_dragged(self, x, y),
                    PointerAction::Released => app.pointer_released(self, x, y),
                }
            }
            EventKind::SizeChanged { width, height } => app.size_changed(self, width, height),
            EventKind::DisplayResized { width, height } => self.display_resized(width, height),
            EventKind::ShowNotify => {
                self.inner.shown.store(true, Ordering::Release);
                app.show_notify(self);
            }
            EventKind::HideNotify => {
                self.inner.shown.store(false, Ordering::Release);
                app.hide_notify(self);
            }
            EventKind::Task(task) => task.run(),
        }
        Ok(())
    }
}
