//! Per-script session state
//!
//! The engine and every script binding share one [`Session`]. Host entry
//! points and Lua calls run on the same thread, so the session lives in an
//! `Rc<RefCell<..>>`; borrows are always released before calling into Lua.

use crate::watchdog::Watchdog;
use mlua::Function;
use rr_core::Config;
use rr_input::JoypadOverrides;
use rr_memory::WriteWatchTable;
use rr_overlay::{FrameBuffer, OverlayCanvas};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Emulation speed requested by the script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedMode {
    /// Host decides
    #[default]
    Normal,
    /// Unthrottled, every frame rendered
    NoThrottle,
    /// Fast-forward, every frame rendered
    Turbo,
    /// As fast as possible, rendering skipped
    Maximum,
}

impl SpeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedMode::Normal => "normal",
            SpeedMode::NoThrottle => "nothrottle",
            SpeedMode::Turbo => "turbo",
            SpeedMode::Maximum => "maximum",
        }
    }

    /// Whether the host should let the script drive the speed
    pub fn wants_speed_control(&self) -> bool {
        *self != SpeedMode::Normal
    }

    /// Rendering policy for the host's frame skipper
    pub fn frame_skip(&self) -> FrameSkip {
        match self {
            SpeedMode::Normal => FrameSkip::NoPreference,
            SpeedMode::NoThrottle | SpeedMode::Turbo => FrameSkip::NoSkip,
            SpeedMode::Maximum => FrameSkip::Skip,
        }
    }
}

impl FromStr for SpeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(SpeedMode::Normal),
            "nothrottle" => Ok(SpeedMode::NoThrottle),
            "turbo" => Ok(SpeedMode::Turbo),
            "maximum" => Ok(SpeedMode::Maximum),
            _ => Err(format!("Invalid mode {}", s)),
        }
    }
}

impl fmt::Display for SpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame rendering preference reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSkip {
    /// Always skip rendering
    Skip,
    /// Never skip rendering
    NoSkip,
    /// Leave it to the host's frame skipper
    NoPreference,
}

/// Host-invoked script callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallbackSlot {
    BeforeEmulation,
    AfterEmulation,
    BeforeExit,
    Gui,
}

impl CallbackSlot {
    pub fn name(&self) -> &'static str {
        match self {
            CallbackSlot::BeforeEmulation => "registerbefore",
            CallbackSlot::AfterEmulation => "registerafter",
            CallbackSlot::BeforeExit => "registerexit",
            CallbackSlot::Gui => "gui.register",
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CallbackSlots {
    before: Option<Function>,
    after: Option<Function>,
    exit: Option<Function>,
    gui: Option<Function>,
}

impl CallbackSlots {
    fn slot_mut(&mut self, slot: CallbackSlot) -> &mut Option<Function> {
        match slot {
            CallbackSlot::BeforeEmulation => &mut self.before,
            CallbackSlot::AfterEmulation => &mut self.after,
            CallbackSlot::BeforeExit => &mut self.exit,
            CallbackSlot::Gui => &mut self.gui,
        }
    }

    pub fn get(&self, slot: CallbackSlot) -> Option<Function> {
        match slot {
            CallbackSlot::BeforeEmulation => self.before.clone(),
            CallbackSlot::AfterEmulation => self.after.clone(),
            CallbackSlot::BeforeExit => self.exit.clone(),
            CallbackSlot::Gui => self.gui.clone(),
        }
    }

    /// Store `callback` and hand back what was there
    pub fn replace(&mut self, slot: CallbackSlot, callback: Option<Function>) -> Option<Function> {
        std::mem::replace(self.slot_mut(slot), callback)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Clonable request to stop the running script.
///
/// Host UI code can hold one of these without borrowing the engine. The
/// request is picked up the next time control returns to the engine.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    pub fn request(&self) {
        self.0.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.0.get()
    }

    /// Consume a pending request
    pub(crate) fn take(&self) -> bool {
        self.0.replace(false)
    }
}

/// State shared between the engine and the script bindings
#[derive(Debug)]
pub(crate) struct Session {
    /// A script task is alive
    pub running: bool,
    pub speed: SpeedMode,
    /// Set by `movie.rerecordcounting(false)`
    pub skip_rerecords: bool,
    /// The task asked to be suspended until the next frame boundary
    pub frame_advance_waiting: bool,
    /// The task is being resumed from a frame boundary
    pub in_frame_boundary: bool,
    /// Nesting depth of host-invoked callbacks
    pub callback_depth: u32,
    /// Identity of the task's coroutine
    pub task_thread: usize,
    pub watchdog: Watchdog,
    pub callback_budget: u32,
    pub overrides: JoypadOverrides,
    pub watches: WriteWatchTable<Function>,
    /// A write scan is in progress
    pub scan_active: bool,
    /// A write happened during the active scan
    pub rescan: bool,
    pub canvas: OverlayCanvas,
    /// Copy of the last frame handed to the overlay renderer
    pub screen: Option<FrameBuffer>,
    pub callbacks: CallbackSlots,
    pub max_print_len: usize,
}

pub(crate) type SharedSession = Rc<RefCell<Session>>;

impl Session {
    pub fn new(config: &Config) -> Self {
        let mut canvas = OverlayCanvas::new(config.gui.default_width, config.gui.default_height);
        canvas.set_persist(config.gui.persist_between_frames);
        canvas.set_enabled(config.gui.enabled);

        Self {
            running: false,
            speed: SpeedMode::Normal,
            skip_rerecords: false,
            frame_advance_waiting: false,
            in_frame_boundary: false,
            callback_depth: 0,
            task_thread: 0,
            watchdog: Watchdog::new(config.watchdog.budget, config.watchdog.enabled),
            callback_budget: config.watchdog.callback_budget,
            overrides: JoypadOverrides::new(),
            watches: WriteWatchTable::new(),
            scan_active: false,
            rescan: false,
            canvas,
            screen: None,
            callbacks: CallbackSlots::default(),
            max_print_len: config.output.max_print_len,
        }
    }

    /// Reset transient settings for a freshly loaded script. The speed
    /// mode carries over from the previous script.
    pub fn begin(&mut self) {
        self.running = true;
        self.skip_rerecords = false;
        self.frame_advance_waiting = false;
        self.in_frame_boundary = false;
        self.canvas.reset_opacity();
        self.overrides.clear();
        self.watches.clear();
        self.callbacks.clear();
        self.watchdog.rearm();
    }

    /// The task finished or failed
    pub fn finish(&mut self) {
        self.running = false;
        self.frame_advance_waiting = false;
        self.in_frame_boundary = false;
        self.overrides.clear();
        self.watches.clear();
        self.canvas.clear();
    }

    /// Whether `emu.frameadvance()` called on `thread` may suspend the
    /// task right now
    pub fn can_frame_advance(&self, thread: usize) -> bool {
        !self.frame_advance_waiting
            && self.in_frame_boundary
            && self.callback_depth == 0
            && thread == self.task_thread
    }
}
