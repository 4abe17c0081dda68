//! Headless host
//!
//! A stand-in machine for running scripts without an emulator: 64 KiB of
//! flat RAM, one digital pad and a frame counter. Every emulated frame
//! stores the low byte of the frame counter at [`FRAME_COUNTER_ADDR`] so
//! write watches have something to observe. Script output goes to stdout,
//! errors to stderr, and popups are answered on stdin.

use rr_core::{
    HostError, InputField, InputPorts, MachineControl, MemoryBus, PopupAnswer, PopupButtons,
    PopupIcon, UserInterface,
};
use rr_input::PadState;
use rr_memory::{Endianness, FlatMemory};
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// RAM size of the headless machine
pub const RAM_SIZE: usize = 64 * 1024;

/// Address the frame counter is written to every frame
pub const FRAME_COUNTER_ADDR: u32 = 0x0000;

/// State operation requested by a script, applied at the end of the frame
#[derive(Debug, Clone)]
enum StateRequest {
    Save(String),
    Load(String),
}

pub struct HeadlessHost {
    ram: FlatMemory,
    pad: PadState,
    frame: u64,
    paused: bool,
    fast_forward: bool,
    /// Save states kept in memory, by filename
    states: HashMap<String, Vec<u8>>,
    pending: Vec<StateRequest>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            ram: FlatMemory::new(RAM_SIZE, Endianness::Little),
            pad: PadState::new(1),
            frame: 0,
            paused: false,
            fast_forward: false,
            states: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_fast_forward(&self) -> bool {
        self.fast_forward
    }

    /// Emulate one frame
    pub fn run_frame(&mut self) {
        self.frame += 1;
        self.ram.write_byte(FRAME_COUNTER_ADDR, self.frame as u8);
    }

    /// Apply scheduled state operations and release the pad
    pub fn end_frame(&mut self) {
        for request in std::mem::take(&mut self.pending) {
            match request {
                StateRequest::Save(name) => {
                    tracing::info!("Saved state {}", name);
                    self.states.insert(name, self.ram.as_slice().to_vec());
                }
                StateRequest::Load(name) => match self.states.get(&name) {
                    Some(bytes) => {
                        self.ram.load(0, bytes);
                        tracing::info!("Loaded state {}", name);
                    }
                    None => tracing::warn!("No saved state named {}", name),
                },
            }
        }
        self.pad.release_all();
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for HeadlessHost {
    fn read_byte(&self, addr: u32) -> u8 {
        self.ram.read_byte(addr)
    }

    fn read_word(&self, addr: u32) -> u16 {
        self.ram.read_word(addr)
    }

    fn read_dword(&self, addr: u32) -> u32 {
        self.ram.read_dword(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.ram.write_byte(addr, value)
    }

    fn write_word(&mut self, addr: u32, value: u16) {
        self.ram.write_word(addr, value)
    }

    fn write_dword(&mut self, addr: u32, value: u32) {
        self.ram.write_dword(addr, value)
    }
}

impl InputPorts for HeadlessHost {
    fn digital_fields(&self) -> Vec<InputField> {
        self.pad.fields()
    }

    fn set_digital_field(&mut self, index: usize, pressed: bool) {
        self.pad.set_field(index, pressed);
    }
}

impl MachineControl for HeadlessHost {
    fn frame_number(&self) -> u64 {
        self.frame
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn set_fast_forward(&mut self, enabled: bool) {
        self.fast_forward = enabled;
    }

    fn schedule_save(&mut self, filename: &str) -> Result<(), HostError> {
        self.pending.push(StateRequest::Save(filename.to_string()));
        Ok(())
    }

    fn schedule_load(&mut self, filename: &str) -> Result<(), HostError> {
        self.pending.push(StateRequest::Load(filename.to_string()));
        Ok(())
    }
}

impl UserInterface for HeadlessHost {
    fn message(&mut self, text: &str) {
        println!("[message] {}", text);
    }

    fn print(&mut self, text: &str) {
        println!("{}", text);
    }

    fn report_error(&mut self, text: &str) {
        eprintln!("{}", text);
    }

    fn popup(
        &mut self,
        text: &str,
        buttons: PopupButtons,
        icon: PopupIcon,
    ) -> Result<PopupAnswer, HostError> {
        let answers = buttons.answers();
        let choices: Vec<&str> = answers.iter().map(|a| a.as_str()).collect();

        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "[{:?}] {}", icon, text);
        let _ = write!(stdout, "({}) > ", choices.join("/"));
        let _ = stdout.flush();

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line);
        if matches!(read, Ok(0) | Err(_)) {
            return Err(HostError::PopupUnavailable);
        }
        Ok(parse_answer(answers, line.trim()))
    }
}

/// Match typed input against the offered answers by prefix; anything
/// unrecognised picks the first answer
fn parse_answer(answers: &[PopupAnswer], input: &str) -> PopupAnswer {
    let input = input.to_ascii_lowercase();
    answers
        .iter()
        .copied()
        .find(|a| !input.is_empty() && a.as_str().starts_with(&input))
        .or_else(|| answers.first().copied())
        .unwrap_or(PopupAnswer::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        let yes_no = PopupButtons::YesNo.answers();
        assert_eq!(parse_answer(yes_no, "n"), PopupAnswer::No);
        assert_eq!(parse_answer(yes_no, "YES"), PopupAnswer::Yes);
        assert_eq!(parse_answer(yes_no, ""), PopupAnswer::Yes);
        assert_eq!(parse_answer(yes_no, "maybe"), PopupAnswer::Yes);
    }

    #[test]
    fn test_frame_counter_in_ram() {
        let mut host = HeadlessHost::new();
        host.run_frame();
        host.run_frame();
        assert_eq!(host.frame_number(), 2);
        assert_eq!(host.read_byte(FRAME_COUNTER_ADDR), 2);
    }

    #[test]
    fn test_states_applied_at_end_of_frame() {
        let mut host = HeadlessHost::new();
        host.write_dword(0x100, 0xDEADBEEF);
        host.schedule_save("a").unwrap();
        assert_eq!(host.states.len(), 0);
        host.end_frame();

        host.write_dword(0x100, 0);
        host.schedule_load("a").unwrap();
        host.schedule_load("missing").unwrap();
        host.end_frame();
        assert_eq!(host.read_dword(0x100), 0xDEADBEEF);
    }

    #[test]
    fn test_pad_released_each_frame() {
        let mut host = HeadlessHost::new();
        host.set_digital_field(0, true);
        assert!(host.digital_fields()[0].pressed);
        host.end_frame();
        assert!(!host.digital_fields()[0].pressed);
    }
}
