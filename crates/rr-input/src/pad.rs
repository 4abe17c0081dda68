//! Standard digital pad
//!
//! A fixed arcade-style control panel for hosts that do not enumerate
//! their own input ports (the headless runner, tests).

use bitflags::bitflags;
use rr_core::InputField;

bitflags! {
    /// Digital pad button flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PadButtons: u16 {
        const UP       = 0x0001;
        const DOWN     = 0x0002;
        const LEFT     = 0x0004;
        const RIGHT    = 0x0008;
        const BUTTON1  = 0x0010;
        const BUTTON2  = 0x0020;
        const BUTTON3  = 0x0040;
        const BUTTON4  = 0x0080;
        const START    = 0x0100;
        const COIN     = 0x0200;
    }
}

/// Field names in port order, paired with their flag
const LAYOUT: [(&str, PadButtons); 10] = [
    ("Up", PadButtons::UP),
    ("Down", PadButtons::DOWN),
    ("Left", PadButtons::LEFT),
    ("Right", PadButtons::RIGHT),
    ("Button 1", PadButtons::BUTTON1),
    ("Button 2", PadButtons::BUTTON2),
    ("Button 3", PadButtons::BUTTON3),
    ("Button 4", PadButtons::BUTTON4),
    ("Start", PadButtons::START),
    ("Coin", PadButtons::COIN),
];

/// One player's pad
#[derive(Debug, Clone)]
pub struct PadState {
    /// Player number, 1-based
    pub player: u8,
    /// Button state (bitflags)
    pub buttons: PadButtons,
}

impl PadState {
    pub fn new(player: u8) -> Self {
        Self {
            player,
            buttons: PadButtons::empty(),
        }
    }

    pub fn is_button_pressed(&self, button: PadButtons) -> bool {
        self.buttons.contains(button)
    }

    pub fn set_button(&mut self, button: PadButtons, pressed: bool) {
        self.buttons.set(button, pressed);
    }

    /// Number of digital fields this pad exposes
    pub const fn field_count() -> usize {
        LAYOUT.len()
    }

    /// Named fields, e.g. "P1 Button 1"
    pub fn fields(&self) -> Vec<InputField> {
        LAYOUT
            .iter()
            .map(|(name, flag)| {
                InputField::new(format!("P{} {}", self.player, name), self.is_button_pressed(*flag))
            })
            .collect()
    }

    /// Set the field at `index` of [`PadState::fields`]
    pub fn set_field(&mut self, index: usize, pressed: bool) {
        if let Some((_, flag)) = LAYOUT.get(index) {
            self.set_button(*flag, pressed);
        }
    }

    pub fn release_all(&mut self) {
        self.buttons = PadButtons::empty();
    }
}
