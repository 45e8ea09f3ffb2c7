//! lcdui-core library crate.
//!
//! Event queue and canvas/display pipeline of a handset UI toolkit shim:
//! ordered event dispatch, coalescing repaints, synchronous repaint flushing,
//! and virtual screen sizing. Widgets, assets and the host application
//! lifecycle live outside this crate.

pub mod canvas;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod event;
pub mod game_canvas;
pub mod graphics;
pub mod image;
pub mod keys;

pub use canvas::{Canvas, CanvasApp, Overlay};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::LcduiError;
pub use event::{EventQueue, EventTag};
