//! Scriptable mock host for engine tests

#![allow(dead_code)]

use rr_core::{
    Config, HostError, HostInputState, InputField, InputPorts, MachineControl, MemoryBus,
    MovieMode, PopupAnswer, PopupButtons, PopupIcon, UserInterface,
};
use rr_engine::Engine;
use rr_input::PadState;
use rr_memory::{Endianness, FlatMemory};
use std::cell::RefCell;
use std::rc::Rc;

pub struct MockHost {
    pub memory: FlatMemory,
    pub pad: PadState,
    pub frame: u64,
    pub paused: bool,
    pub fast_forward: bool,
    pub movie: MovieMode,
    pub input: HostInputState,
    pub messages: Vec<String>,
    pub printed: Vec<String>,
    pub errors: Vec<String>,
    pub popups: Vec<String>,
    pub popup_answer: Result<PopupAnswer, HostError>,
    pub saves: Vec<String>,
    pub loads: Vec<String>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            memory: FlatMemory::new(0x1000, Endianness::Little),
            pad: PadState::new(1),
            frame: 0,
            paused: false,
            fast_forward: false,
            movie: MovieMode::Inactive,
            input: HostInputState::default(),
            messages: Vec::new(),
            printed: Vec::new(),
            errors: Vec::new(),
            popups: Vec::new(),
            popup_answer: Ok(PopupAnswer::Ok),
            saves: Vec::new(),
            loads: Vec::new(),
        }
    }
}

impl MemoryBus for MockHost {
    fn read_byte(&self, addr: u32) -> u8 {
        self.memory.read_byte(addr)
    }
    fn read_word(&self, addr: u32) -> u16 {
        self.memory.read_word(addr)
    }
    fn read_dword(&self, addr: u32) -> u32 {
        self.memory.read_dword(addr)
    }
    fn write_byte(&mut self, addr: u32, value: u8) {
        self.memory.write_byte(addr, value)
    }
    fn write_word(&mut self, addr: u32, value: u16) {
        self.memory.write_word(addr, value)
    }
    fn write_dword(&mut self, addr: u32, value: u32) {
        self.memory.write_dword(addr, value)
    }
}

impl InputPorts for MockHost {
    fn digital_fields(&self) -> Vec<InputField> {
        self.pad.fields()
    }
    fn set_digital_field(&mut self, index: usize, pressed: bool) {
        self.pad.set_field(index, pressed)
    }
    fn physical_input(&self) -> HostInputState {
        self.input.clone()
    }
}

impl MachineControl for MockHost {
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
        self.saves.push(filename.to_string());
        Ok(())
    }
    fn schedule_load(&mut self, filename: &str) -> Result<(), HostError> {
        self.loads.push(filename.to_string());
        Ok(())
    }
    fn movie_mode(&self) -> MovieMode {
        self.movie
    }
    fn stop_movie(&mut self) -> Result<(), HostError> {
        self.movie = MovieMode::Inactive;
        Ok(())
    }
}

impl UserInterface for MockHost {
    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }
    fn print(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }
    fn report_error(&mut self, text: &str) {
        self.errors.push(text.to_string());
    }
    fn popup(
        &mut self,
        text: &str,
        _buttons: PopupButtons,
        _icon: PopupIcon,
    ) -> Result<PopupAnswer, HostError> {
        self.popups.push(text.to_string());
        self.popup_answer.clone()
    }
}

pub fn setup_with(config: Config) -> (Engine, Rc<RefCell<MockHost>>) {
    let host = Rc::new(RefCell::new(MockHost::new()));
    let engine = Engine::new(host.clone(), config);
    (engine, host)
}

pub fn setup() -> (Engine, Rc<RefCell<MockHost>>) {
    setup_with(Config::default())
}

/// Load `source` and run `frames` frame boundaries
pub fn run(source: &str, frames: usize) -> (Engine, Rc<RefCell<MockHost>>) {
    let (mut engine, host) = setup();
    engine.load_source("test.lua", source).unwrap();
    for _ in 0..frames {
        engine.on_frame_boundary();
        host.borrow_mut().frame += 1;
    }
    (engine, host)
}
