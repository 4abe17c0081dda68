//! Joypad bridge for oxidized-rr scripts
//!
//! Translates between the host's ordered list of named digital input
//! fields and the flat `name -> bool` tables scripts read and write.

pub mod joypad;
pub mod pad;

pub use joypad::{read_report, JoypadOverrideSet, JoypadOverrides, ReportFilter, MAX_DIGITAL_FIELDS};
pub use pad::{PadButtons, PadState};
