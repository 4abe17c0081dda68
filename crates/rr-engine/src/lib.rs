//! Lua scripting engine for oxidized-rr
//!
//! Runs a user script in lockstep with the host's emulated frames and
//! exposes the machine to it through the `emu`, `memory`, `joypad`,
//! `savestate`, `movie`, `gui`, `input` and `bit` namespaces.

mod api;
mod callbacks;
pub mod engine;
pub mod session;
mod stringify;
mod task;
mod watchdog;

pub use engine::{Engine, EngineState};
pub use session::{FrameSkip, SpeedMode, StopHandle};
