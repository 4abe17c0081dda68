//! Script engine driven by the host's frame loop
//!
//! The [`Engine`] owns the Lua interpreter and the running script. The host
//! calls its entry points from the emulation thread:
//! - [`Engine::on_before_emulation`] / [`Engine::on_after_emulation`]
//!   around each emulated frame
//! - [`Engine::on_frame_boundary`] once per frame, which resumes the script
//! - [`Engine::on_memory_write`] after CPU writes commit
//! - [`Engine::on_render_overlay`] with every rendered frame
//!
//! None of these may be called while the caller holds a borrow of the
//! shared host.

use crate::api::{self, ApiContext};
use crate::callbacks::{call_with_budget, notify_writes, report_error};
use crate::session::{CallbackSlot, FrameSkip, Session, SharedSession, SpeedMode, StopHandle};
use crate::task::{ExecutionTask, TaskOutcome};
use crate::watchdog;
use mlua::{Lua, Table};
use rr_core::{Config, Result, ScriptError, SharedHost};
use rr_input::JoypadOverrideSet;
use rr_overlay::{composite_overlay, FrameBuffer};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Registry key holding `package.path` as the interpreter started with it
const BASE_PACKAGE_PATH: &str = "rr.base_package_path";

/// Engine lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// No interpreter
    Uninitialized,
    /// Interpreter ready, no script running
    Idle,
    /// Script loaded or executing
    Running,
    /// Script waiting for the next frame boundary
    Suspended,
    /// Script ended with an error
    StoppedWithError(String),
}

/// Lua script engine
pub struct Engine {
    /// Configuration
    config: Config,
    /// Current state
    state: EngineState,
    /// Host collaborators
    host: SharedHost,
    /// State shared with the script bindings
    session: SharedSession,
    /// Interpreter, created by the first load and kept until stop
    lua: Option<Lua>,
    /// Running script
    task: Option<ExecutionTask>,
    /// Last script loaded from disk
    script_path: Option<PathBuf>,
    /// Stop requests from host UI code
    stop_handle: StopHandle,
}

impl Engine {
    /// Create an engine for `host`
    pub fn new(host: SharedHost, config: Config) -> Self {
        tracing::info!("Creating script engine");
        let session = Rc::new(RefCell::new(Session::new(&config)));
        Self {
            config,
            state: EngineState::Uninitialized,
            host,
            session,
            lua: None,
            task: None,
            script_path: None,
            stop_handle: StopHandle::default(),
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a script task is alive
    pub fn is_running(&self) -> bool {
        self.session.borrow().running
    }

    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    /// Handle for requesting a stop without access to the engine
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    fn ctx(&self) -> ApiContext {
        ApiContext::new(self.session.clone(), self.host.clone())
    }

    /// Point the watchdog hook at the task's coroutine, or at the main
    /// state for callbacks run by the host
    fn arm_watchdog(&self, on_task: bool) {
        let settings = &self.config.watchdog;
        if !settings.enabled {
            return;
        }
        let interval = settings.instruction_interval;
        if on_task {
            if let Some(task) = &self.task {
                watchdog::install_on_thread(task.thread(), self.ctx(), interval);
            }
        } else if let Some(lua) = &self.lua {
            watchdog::install(lua, self.ctx(), interval);
        }
    }

    fn report(&self, message: &str) {
        report_error(&self.ctx(), message);
    }

    /// Get the interpreter, creating it on first use
    fn interpreter(&mut self) -> Result<Lua> {
        if let Some(lua) = &self.lua {
            return Ok(lua.clone());
        }

        let lua = Lua::new();
        api::register_all(&lua, &self.ctx()).map_err(|e| ScriptError::Runtime(e.to_string()))?;

        let settings = &self.config.watchdog;
        if settings.enabled {
            tracing::debug!(
                "Watchdog hook every {} instructions, budget {}",
                settings.instruction_interval,
                settings.budget
            );
        }

        tracing::info!("Lua interpreter created");
        self.lua = Some(lua.clone());
        if self.state == EngineState::Uninitialized {
            self.state = EngineState::Idle;
        }
        Ok(lua)
    }

    // Lifecycle

    /// Load and start a script file. On failure a running script is left
    /// untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::info!("Loading script {}", path.display());
        self.script_path = Some(path.to_path_buf());

        let source = match std::fs::read(path) {
            Ok(source) => source,
            Err(e) => {
                let err = if e.kind() == std::io::ErrorKind::NotFound {
                    ScriptError::NotFound(path.to_path_buf())
                } else {
                    ScriptError::Io(e)
                };
                self.report(&err.to_string());
                return Err(err);
            }
        };

        let lua = self.interpreter()?;
        let dir = path.parent().unwrap_or(Path::new(""));
        if let Err(e) = set_search_path(&lua, dir) {
            tracing::warn!("Could not set package.path: {}", e);
        }
        self.start(&lua, &path.display().to_string(), &source)
    }

    /// Load and start a script held in memory
    pub fn load_source(&mut self, name: &str, source: &str) -> Result<()> {
        tracing::info!("Loading script {}", name);
        let lua = self.interpreter()?;
        self.start(&lua, name, source.as_bytes())
    }

    /// Load the last script file again
    pub fn reload(&mut self) -> Result<()> {
        match self.script_path.clone() {
            Some(path) => self.load(path),
            None => {
                let err = ScriptError::NoScript;
                self.report(&err.to_string());
                Err(err)
            }
        }
    }

    fn start(&mut self, lua: &Lua, name: &str, source: &[u8]) -> Result<()> {
        let entry = match lua.load(source).set_name(format!("@{}", name)).into_function() {
            Ok(entry) => entry,
            Err(e) => {
                let err = ScriptError::Compile {
                    path: name.to_string(),
                    message: e.to_string(),
                };
                tracing::warn!("{}", err);
                self.report(&err.to_string());
                return Err(err);
            }
        };

        let task = ExecutionTask::new(lua, entry).map_err(|e| ScriptError::Runtime(e.to_string()))?;
        {
            let mut session = self.session.borrow_mut();
            session.begin();
            session.task_thread = task.thread_id();
        }
        self.stop_handle.take();
        self.task = Some(task);
        self.state = EngineState::Running;
        tracing::info!("Script {} started", name);
        Ok(())
    }

    /// Stop the script, run its exit callback and tear down the
    /// interpreter
    pub fn stop(&mut self) {
        self.stop_handle.take();
        if self.lua.is_none() {
            return;
        }
        tracing::info!("Stopping script");

        let exit = self
            .session
            .borrow_mut()
            .callbacks
            .replace(CallbackSlot::BeforeExit, None);
        if let Some(exit) = exit {
            self.arm_watchdog(false);
            let budget = {
                let mut session = self.session.borrow_mut();
                session.watchdog.reset();
                session.watchdog.budget()
            };
            if let Err(e) = call_with_budget(&self.ctx(), &exit, (), budget) {
                self.report(&format!("registerexit callback failed: {}", e));
            }
        }

        self.task = None;
        {
            let mut session = self.session.borrow_mut();
            session.finish();
            session.callbacks.clear();
            session.watchdog.clear_kill();
            session.speed = SpeedMode::Normal;
        }
        self.host.borrow_mut().set_fast_forward(false);
        self.lua = None;
        self.state = EngineState::Uninitialized;
        tracing::info!("Lua interpreter closed");
    }

    fn process_stop_request(&mut self) {
        if self.stop_handle.is_requested() {
            tracing::info!("Processing deferred stop request");
            self.stop();
        }
    }

    /// The task ended; keep the interpreter and its callbacks
    fn finish_task(&mut self, error: Option<String>) {
        let resumes = self.task.take().map_or(0, |task| task.resumes());
        self.session.borrow_mut().finish();
        match error {
            None => {
                tracing::info!("Script finished after {} frames", resumes);
                self.state = EngineState::Idle;
            }
            Some(message) => {
                self.report(&message);
                self.state = EngineState::StoppedWithError(message);
            }
        }
    }

    // Host entry points

    /// Resume the script for this frame
    pub fn on_frame_boundary(&mut self) {
        self.process_stop_request();
        if !self.session.borrow().running {
            return;
        }
        if self.task.is_none() {
            return;
        }
        self.arm_watchdog(true);

        {
            let mut session = self.session.borrow_mut();
            session.in_frame_boundary = true;
            session.frame_advance_waiting = false;
            session.watchdog.reset();
        }
        self.state = EngineState::Running;

        let Some(task) = self.task.as_mut() else {
            return;
        };
        let outcome = task.resume();

        let waiting = {
            let mut session = self.session.borrow_mut();
            session.in_frame_boundary = false;
            session.watchdog.clear_kill();
            session.frame_advance_waiting
        };

        match outcome {
            TaskOutcome::Yielded if waiting => self.state = EngineState::Suspended,
            // yielded without a frame advance request
            TaskOutcome::Yielded | TaskOutcome::Completed => self.finish_task(None),
            TaskOutcome::Failed(message) => self.finish_task(Some(message)),
        }

        self.process_stop_request();
    }

    /// Run write watches after a memory write by the emulated machine
    pub fn on_memory_write(&mut self) {
        if self.lua.is_none() {
            return;
        }
        self.arm_watchdog(false);
        notify_writes(&self.ctx());
        self.session.borrow_mut().watchdog.clear_kill();
        self.process_stop_request();
    }

    /// Run the `emu.registerbefore` callback
    pub fn on_before_emulation(&mut self) {
        self.run_host_callback(CallbackSlot::BeforeEmulation);
    }

    /// Run the `emu.registerafter` callback
    pub fn on_after_emulation(&mut self) {
        self.run_host_callback(CallbackSlot::AfterEmulation);
    }

    /// Hand a rendered frame to the scripts: remember it for
    /// `gui.getpixel`, run the `gui.register` callback, then composite the
    /// overlay into it. Returns whether the frame was modified.
    pub fn on_render_overlay(&mut self, frame: &mut FrameBuffer) -> bool {
        self.process_stop_request();
        if self.lua.is_none() {
            return false;
        }

        {
            let mut session = self.session.borrow_mut();
            let session = &mut *session;
            session.canvas.resize(frame.width, frame.height);
            match &mut session.screen {
                Some(screen) => screen.clone_from(frame),
                slot @ None => *slot = Some(frame.clone()),
            }
        }

        self.run_host_callback(CallbackSlot::Gui);

        let mut session = self.session.borrow_mut();
        composite_overlay(frame, &mut session.canvas)
    }

    fn run_host_callback(&mut self, slot: CallbackSlot) {
        self.process_stop_request();
        if self.lua.is_none() {
            return;
        }
        let Some(callback) = self.session.borrow().callbacks.get(slot) else {
            return;
        };

        self.arm_watchdog(false);
        let budget = {
            let mut session = self.session.borrow_mut();
            session.watchdog.reset();
            session.watchdog.budget()
        };
        let result = call_with_budget(&self.ctx(), &callback, (), budget);
        self.session.borrow_mut().watchdog.clear_kill();

        if let Err(e) = result {
            let message = format!("{} callback failed: {}", slot.name(), e);
            self.session.borrow_mut().callbacks.replace(slot, None);
            if slot != CallbackSlot::Gui && self.is_running() {
                self.finish_task(Some(message));
            } else {
                self.report(&message);
            }
        }

        self.process_stop_request();
    }

    // Host queries

    pub fn speed_mode(&self) -> SpeedMode {
        self.session.borrow().speed
    }

    /// Whether the script wants to control emulation speed
    pub fn wants_speed_control(&self) -> bool {
        let session = self.session.borrow();
        session.running && session.speed.wants_speed_control()
    }

    /// The script's frame rendering preference
    pub fn frame_skip_policy(&self) -> FrameSkip {
        let session = self.session.borrow();
        if session.running {
            session.speed.frame_skip()
        } else {
            FrameSkip::NoPreference
        }
    }

    /// Whether `joypad.set` overrides are pending
    pub fn using_joypad_override(&self) -> bool {
        let session = self.session.borrow();
        session.running && session.overrides.in_use()
    }

    /// Take the pending joypad overrides. Call at most once per frame; a
    /// second call returns `None`.
    pub fn consume_joypad_overrides(&mut self) -> Option<JoypadOverrideSet> {
        self.session.borrow_mut().overrides.take()
    }

    /// Take the pending overrides and press the forced fields through the
    /// host's input ports. Returns how many fields were forced.
    pub fn apply_joypad_overrides(&mut self) -> usize {
        let Some(overrides) = self.consume_joypad_overrides() else {
            return 0;
        };
        let mut host = self.host.borrow_mut();
        let mut forced = 0;
        for index in overrides.forced_indices() {
            host.set_digital_field(index, true);
            forced += 1;
        }
        tracing::trace!("Applied {} joypad overrides", forced);
        forced
    }

    /// Whether `movie.rerecordcounting(false)` is in effect
    pub fn rerecord_counting_suppressed(&self) -> bool {
        let session = self.session.borrow();
        session.running && session.skip_rerecords
    }

    // Overlay control

    /// Size the overlay to the host's screen. Call when the video mode is
    /// known so drawing from the first frame is kept.
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.session.borrow_mut().canvas.resize(width, height);
    }

    /// Drop uncommitted overlay drawing
    pub fn clear_overlay(&mut self) {
        self.session.borrow_mut().canvas.clear();
    }

    pub fn set_overlay_enabled(&mut self, enabled: bool) {
        self.session.borrow_mut().canvas.set_enabled(enabled);
    }
}

/// Put the script's directory in front of `package.path`
fn set_search_path(lua: &Lua, dir: &Path) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;
    let base = match lua.named_registry_value::<Option<String>>(BASE_PACKAGE_PATH)? {
        Some(base) => base,
        None => {
            let base: String = package.get("path")?;
            lua.set_named_registry_value(BASE_PACKAGE_PATH, base.as_str())?;
            base
        }
    };

    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    package.set(
        "path",
        format!("{0}/?.lua;{0}/?/init.lua;{1}", dir.display(), base),
    )
}
