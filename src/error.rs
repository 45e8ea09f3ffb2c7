// src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LcduiError {
    #[error("unknown keycode {0}")]
    UnknownKeyCode(i32),
    #[error("unknown game action {0}")]
    UnknownGameAction(i32),
    #[error("Frame presentation failed: {0}")]
    PresentFailed(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
