//! Runaway script watchdog
//!
//! An instruction-count hook decrements a budget every
//! `instruction_interval` VM instructions. The budget is refilled at every
//! frame boundary and around long-running operations. When it runs out the
//! user is asked whether to kill the script; answering no switches the
//! check off until the next load.

use crate::api::ApiContext;
use mlua::{HookTriggers, Lua, Thread, VmState};
use rr_core::{PopupAnswer, PopupButtons, PopupIcon};

pub(crate) const KILL_MESSAGE: &str = "Killed by user request.";

const PROMPT: &str = "The Lua script running has been running a long time. \
It may have gone crazy. Kill it?\n\n(No = don't check anymore either)";

/// Result of one hook hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    Continue,
    /// Budget exhausted, ask the user
    Expired,
    /// The user already chose to kill this run
    Killed,
}

/// Budget counter behind the instruction hook
#[derive(Debug, Clone)]
pub(crate) struct Watchdog {
    budget: u32,
    remaining: u32,
    /// Configured on
    enabled: bool,
    /// Switched off by the user for the rest of this run
    dismissed: bool,
    killed: bool,
}

impl Watchdog {
    pub fn new(budget: u32, enabled: bool) -> Self {
        Self {
            budget,
            remaining: budget,
            enabled,
            dismissed: false,
            killed: false,
        }
    }

    /// Ceiling the budget is refilled to
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Refill the budget
    pub fn reset(&mut self) {
        self.remaining = self.budget;
    }

    /// Replace the remaining budget, returning the previous value
    pub fn swap_remaining(&mut self, remaining: u32) -> u32 {
        std::mem::replace(&mut self.remaining, remaining)
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.dismissed
    }

    pub fn tick(&mut self) -> Tick {
        if self.killed {
            return Tick::Killed;
        }
        if !self.is_active() {
            return Tick::Continue;
        }
        if self.remaining == 0 {
            return Tick::Expired;
        }
        self.remaining -= 1;
        Tick::Continue
    }

    pub fn kill(&mut self) {
        self.killed = true;
    }

    /// Forget a kill once the killed code has unwound
    pub fn clear_kill(&mut self) {
        self.killed = false;
    }

    pub fn dismiss(&mut self) {
        self.dismissed = true;
    }

    /// Fresh state for a newly loaded script
    pub fn rearm(&mut self) {
        self.dismissed = false;
        self.killed = false;
        self.reset();
    }
}

fn triggers(instruction_interval: u32) -> HookTriggers {
    HookTriggers::new().every_nth_instruction(instruction_interval.max(1))
}

/// Install the instruction hook on the main state, where host-driven
/// callbacks run. Only one thread carries the hook at a time, so this
/// takes it away from the task's coroutine.
pub(crate) fn install(lua: &Lua, ctx: ApiContext, instruction_interval: u32) {
    lua.set_hook(triggers(instruction_interval), move |_lua, _debug| on_hook(&ctx));
}

/// Install the instruction hook on a script coroutine
pub(crate) fn install_on_thread(thread: &Thread, ctx: ApiContext, instruction_interval: u32) {
    thread.set_hook(triggers(instruction_interval), move |_lua, _debug| on_hook(&ctx));
}

fn on_hook(ctx: &ApiContext) -> mlua::Result<VmState> {
    let tick = ctx.session.borrow_mut().watchdog.tick();
    match tick {
        Tick::Continue => Ok(VmState::Continue),
        Tick::Killed => Err(mlua::Error::runtime(KILL_MESSAGE)),
        Tick::Expired => {
            tracing::warn!("Script exhausted its watchdog budget");
            let answer = ctx
                .host
                .borrow_mut()
                .popup(PROMPT, PopupButtons::YesNo, PopupIcon::Warning);

            let kill = match answer {
                Ok(answer) => answer == PopupAnswer::Yes,
                Err(e) => {
                    tracing::warn!("Watchdog prompt failed ({}), killing script", e);
                    true
                }
            };

            let mut session = ctx.session.borrow_mut();
            if kill {
                tracing::error!("Script killed by user request");
                session.watchdog.kill();
                Err(mlua::Error::runtime(KILL_MESSAGE))
            } else {
                tracing::info!("Watchdog disabled until the next script load");
                session.watchdog.dismiss();
                Ok(VmState::Continue)
            }
        }
    }
}
