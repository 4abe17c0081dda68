//! Host collaborator interfaces
//!
//! The emulated machine is opaque to the scripting layer. Everything the
//! scripts can observe or change goes through the traits in this module,
//! which a frontend implements once for its machine driver.

use crate::error::HostError;
use std::cell::RefCell;
use std::rc::Rc;

/// Debugger-style access to the emulated CPU address space
pub trait MemoryBus {
    fn read_byte(&self, addr: u32) -> u8;
    fn read_word(&self, addr: u32) -> u16;
    fn read_dword(&self, addr: u32) -> u32;
    fn write_byte(&mut self, addr: u32, value: u8);
    fn write_word(&mut self, addr: u32, value: u16);
    fn write_dword(&mut self, addr: u32, value: u32);
}

/// One named digital input field of the current port configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    pub name: String,
    pub pressed: bool,
}

impl InputField {
    pub fn new(name: impl Into<String>, pressed: bool) -> Self {
        Self {
            name: name.into(),
            pressed,
        }
    }
}

/// Snapshot of the physical keyboard and pointer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInputState {
    /// Names of keys currently held down
    pub keys: Vec<String>,
    /// Pointer position in screen coordinates, if the host has one
    pub mouse: Option<(i32, i32)>,
}

/// Emulated input ports
pub trait InputPorts {
    /// Active digital fields, in port order. The index of a field in this
    /// list is the index used by [`InputPorts::set_digital_field`].
    fn digital_fields(&self) -> Vec<InputField>;

    /// Force a digital field for the frame currently being polled
    fn set_digital_field(&mut self, index: usize, pressed: bool);

    fn physical_input(&self) -> HostInputState {
        HostInputState::default()
    }
}

/// Movie recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovieMode {
    #[default]
    Inactive,
    Record,
    Playback,
}

/// Machine-level control
pub trait MachineControl {
    fn frame_number(&self) -> u64;
    fn set_paused(&mut self, paused: bool);
    fn set_fast_forward(&mut self, enabled: bool);

    /// Schedule a state save at the end of the current frame
    fn schedule_save(&mut self, filename: &str) -> Result<(), HostError>;

    /// Schedule a state load at the end of the current frame
    fn schedule_load(&mut self, filename: &str) -> Result<(), HostError>;

    fn movie_mode(&self) -> MovieMode {
        MovieMode::Inactive
    }

    fn stop_movie(&mut self) -> Result<(), HostError> {
        Err(HostError::NoMovie)
    }
}

/// Button set shown by a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupButtons {
    Ok,
    YesNo,
    YesNoCancel,
    OkCancel,
    AbortRetryIgnore,
}

impl PopupButtons {
    /// Case-insensitive lookup of a button set name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ok" => Some(PopupButtons::Ok),
            "yesno" => Some(PopupButtons::YesNo),
            "yesnocancel" => Some(PopupButtons::YesNoCancel),
            "okcancel" => Some(PopupButtons::OkCancel),
            "abortretryignore" => Some(PopupButtons::AbortRetryIgnore),
            _ => None,
        }
    }

    /// Answers the user can give to this button set
    pub fn answers(&self) -> &'static [PopupAnswer] {
        match self {
            PopupButtons::Ok => &[PopupAnswer::Ok],
            PopupButtons::YesNo => &[PopupAnswer::Yes, PopupAnswer::No],
            PopupButtons::YesNoCancel => &[PopupAnswer::Yes, PopupAnswer::No, PopupAnswer::Cancel],
            PopupButtons::OkCancel => &[PopupAnswer::Ok, PopupAnswer::Cancel],
            PopupButtons::AbortRetryIgnore => {
                &[PopupAnswer::Abort, PopupAnswer::Retry, PopupAnswer::Ignore]
            }
        }
    }
}

/// Icon class shown by a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupIcon {
    Notice,
    Question,
    Warning,
    Error,
}

impl PopupIcon {
    /// Case-insensitive lookup; "message" is an alias for notice
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "message" | "notice" => Some(PopupIcon::Notice),
            "question" => Some(PopupIcon::Question),
            "warning" => Some(PopupIcon::Warning),
            "error" => Some(PopupIcon::Error),
            _ => None,
        }
    }
}

/// Button pressed to dismiss a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupAnswer {
    Ok,
    Cancel,
    Abort,
    Retry,
    Ignore,
    Yes,
    No,
}

impl PopupAnswer {
    pub fn as_str(&self) -> &'static str {
        match self {
            PopupAnswer::Ok => "ok",
            PopupAnswer::Cancel => "cancel",
            PopupAnswer::Abort => "abort",
            PopupAnswer::Retry => "retry",
            PopupAnswer::Ignore => "ignore",
            PopupAnswer::Yes => "yes",
            PopupAnswer::No => "no",
        }
    }
}

/// Message and dialog surface
pub trait UserInterface {
    /// Non-blocking on-screen message
    fn message(&mut self, text: &str);

    /// Script console output
    fn print(&mut self, text: &str);

    /// Error-report channel for compile errors, script errors and
    /// callback failures
    fn report_error(&mut self, text: &str);

    /// Blocking dialog
    fn popup(
        &mut self,
        text: &str,
        buttons: PopupButtons,
        icon: PopupIcon,
    ) -> Result<PopupAnswer, HostError>;
}

/// Everything the scripting layer needs from the machine
pub trait Host: MemoryBus + InputPorts + MachineControl + UserInterface {}

impl<T: MemoryBus + InputPorts + MachineControl + UserInterface> Host for T {}

/// Host handle shared between the engine and the script bindings.
///
/// Script execution and host callbacks run on one thread, so a
/// `RefCell` is enough; borrows are never held across a call into Lua.
pub type SharedHost = Rc<RefCell<dyn Host>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_names() {
        assert_eq!(PopupButtons::from_name("YesNo"), Some(PopupButtons::YesNo));
        assert_eq!(
            PopupButtons::from_name("abortretryignore"),
            Some(PopupButtons::AbortRetryIgnore)
        );
        assert_eq!(PopupButtons::from_name("maybe"), None);
        assert_eq!(PopupIcon::from_name("MESSAGE"), Some(PopupIcon::Notice));
        assert_eq!(PopupIcon::from_name("notice"), Some(PopupIcon::Notice));
        assert_eq!(PopupIcon::from_name("bang"), None);
    }

    #[test]
    fn test_popup_answers() {
        assert_eq!(PopupAnswer::Retry.as_str(), "retry");
        assert!(PopupButtons::YesNo.answers().contains(&PopupAnswer::No));
        assert_eq!(PopupButtons::Ok.answers(), &[PopupAnswer::Ok]);
    }
}
