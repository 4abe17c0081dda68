//! `emu` / `mame`: machine control

use super::{slot_register, ApiContext};
use crate::session::{CallbackSlot, SpeedMode};
use mlua::{Function, Lua, Table};

const FRAMEADVANCE_ERROR: &str = "can't call emu.frameadvance() from here";
const PAUSE_ERROR: &str = "can't call emu.pause() from here";
const UNPAUSE_ERROR: &str = "can't call emu.unpause() from here";
const CALLBACK_ERROR: &str = "function or nil expected";

/// Wraps a Rust gate function so the task yields after it returns. Rust
/// functions cannot yield themselves, so the yield happens in Lua.
const YIELD_WRAPPER: &str = r#"
local gate, yield = ...
return function(...)
    gate(...)
    return yield()
end
"#;

fn suspending(lua: &Lua, gate: Function) -> mlua::Result<Function> {
    let yield_fn: Function = lua.globals().get::<Table>("coroutine")?.get("yield")?;
    lua.load(YIELD_WRAPPER)
        .set_name("=frameadvance")
        .call::<Function>((gate, yield_fn))
}

pub(super) fn create(lua: &Lua, ctx: &ApiContext) -> mlua::Result<Table> {
    let emu = lua.create_table()?;

    let c = ctx.clone();
    emu.set(
        "speedmode",
        lua.create_function(move |_, mode: String| {
            let speed = mode.parse::<SpeedMode>().map_err(mlua::Error::runtime)?;
            c.session.borrow_mut().speed = speed;
            c.host.borrow_mut().set_fast_forward(speed == SpeedMode::Turbo);
            tracing::debug!("Speed mode set to {}", speed);
            Ok(())
        })?,
    )?;

    let c = ctx.clone();
    let gate = lua.create_function(move |lua, ()| {
        let thread = lua.current_thread().to_pointer() as usize;
        let mut session = c.session.borrow_mut();
        if !session.can_frame_advance(thread) {
            return Err(mlua::Error::runtime(FRAMEADVANCE_ERROR));
        }
        session.frame_advance_waiting = true;
        Ok(())
    })?;
    emu.set("frameadvance", suspending(lua, gate)?)?;

    let c = ctx.clone();
    let gate = lua.create_function(move |lua, ()| {
        let thread = lua.current_thread().to_pointer() as usize;
        {
            let mut session = c.session.borrow_mut();
            if !session.can_frame_advance(thread) {
                return Err(mlua::Error::runtime(PAUSE_ERROR));
            }
            session.frame_advance_waiting = true;
            session.speed = SpeedMode::Normal;
        }
        let mut host = c.host.borrow_mut();
        host.set_fast_forward(false);
        host.set_paused(true);
        Ok(())
    })?;
    emu.set("pause", suspending(lua, gate)?)?;

    let c = ctx.clone();
    let gate = lua.create_function(move |lua, ()| {
        let thread = lua.current_thread().to_pointer() as usize;
        {
            let mut session = c.session.borrow_mut();
            if !session.can_frame_advance(thread) {
                return Err(mlua::Error::runtime(UNPAUSE_ERROR));
            }
            session.frame_advance_waiting = true;
        }
        c.host.borrow_mut().set_paused(false);
        Ok(())
    })?;
    emu.set("unpause", suspending(lua, gate)?)?;

    let c = ctx.clone();
    emu.set(
        "framecount",
        lua.create_function(move |_, ()| Ok(c.host.borrow().frame_number()))?,
    )?;

    emu.set(
        "registerbefore",
        slot_register(lua, ctx, CallbackSlot::BeforeEmulation, CALLBACK_ERROR)?,
    )?;
    emu.set(
        "registerafter",
        slot_register(lua, ctx, CallbackSlot::AfterEmulation, CALLBACK_ERROR)?,
    )?;
    emu.set(
        "registerexit",
        slot_register(lua, ctx, CallbackSlot::BeforeExit, CALLBACK_ERROR)?,
    )?;

    let c = ctx.clone();
    emu.set(
        "message",
        lua.create_function(move |_, text: String| {
            c.host.borrow_mut().message(&text);
            Ok(())
        })?,
    )?;

    Ok(emu)
}
