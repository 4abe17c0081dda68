//! Core types for the oxidized-rr scripting layer
//!
//! This crate provides the error taxonomy, configuration, logging setup
//! and the host-facing traits every other crate talks to the emulated
//! machine through.

pub mod config;
pub mod error;
pub mod host;
pub mod logging;

pub use config::Config;
pub use error::{HostError, OverlayError, Result, ScriptError};
pub use host::{
    Host, HostInputState, InputField, InputPorts, MachineControl, MemoryBus, MovieMode,
    PopupAnswer, PopupButtons, PopupIcon, SharedHost, UserInterface,
};
