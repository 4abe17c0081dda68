//! Error types for the oxidized-rr scripting layer

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for script sessions
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to compile {path}: {message}")]
    Compile { path: String, message: String },

    #[error("Script error: {0}")]
    Runtime(String),

    #[error("Killed by user request.")]
    Killed,

    #[error("There's no script to reload.")]
    NoScript,

    #[error("Script not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Errors reported by the host machine collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("popup subsystem unavailable")]
    PopupUnavailable,

    #[error("invalid savestate filename")]
    InvalidSavestate(String),

    #[error("no movie")]
    NoMovie,

    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

/// Color resolution and image blit errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("unknown colour {0}")]
    UnknownColor(String),

    #[error("invalid colour")]
    InvalidColor,

    #[error("bad image data")]
    BadImageData,

    #[error("image data truncated: need {needed} bytes, got {actual}")]
    TruncatedImage { needed: usize, actual: usize },
}

/// Result type for script operations
pub type Result<T> = std::result::Result<T, ScriptError>;
