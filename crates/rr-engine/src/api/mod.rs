//! Script-facing Lua namespaces
//!
//! Each submodule builds one global table. Bindings share an
//! [`ApiContext`] holding the session and the host; neither is borrowed
//! across a call back into Lua.

mod bit;
mod emu;
mod globals;
mod gui;
mod input;
mod joypad;
mod memory;
mod movie;
mod savestate;

use crate::session::{CallbackSlot, SharedSession};
use crate::stringify::BUILTIN_TOSTRING;
use mlua::{Function, Lua, Value};
use rr_core::{HostError, PopupButtons, PopupIcon, SharedHost};

/// Handles captured by every binding closure
#[derive(Clone)]
pub(crate) struct ApiContext {
    pub session: SharedSession,
    pub host: SharedHost,
}

impl ApiContext {
    pub fn new(session: SharedSession, host: SharedHost) -> Self {
        Self { session, host }
    }
}

/// Install every namespace and global helper into `lua`
pub(crate) fn register_all(lua: &Lua, ctx: &ApiContext) -> mlua::Result<()> {
    let globals = lua.globals();
    lua.set_named_registry_value(BUILTIN_TOSTRING, globals.get::<Value>("tostring")?)?;

    globals::register(lua, ctx)?;

    let emu = emu::create(lua, ctx)?;
    emu.set("print", globals.get::<Function>("print")?)?;
    globals.set("emu", emu.clone())?;
    globals.set("mame", emu)?;

    globals.set("memory", memory::create(lua, ctx)?)?;
    globals.set("joypad", joypad::create(lua, ctx)?)?;
    globals.set("savestate", savestate::create(lua, ctx)?)?;
    globals.set("movie", movie::create(lua, ctx)?)?;
    globals.set("gui", gui::create(lua, ctx)?)?;
    globals.set("input", input::create(lua, ctx)?)?;
    globals.set("bit", bit::create(lua)?)?;
    bit::register_legacy(lua)?;

    Ok(())
}

pub(crate) fn host_error(e: HostError) -> mlua::Error {
    mlua::Error::runtime(e.to_string())
}

/// Error in the style of `luaL_argerror`
pub(crate) fn bad_argument(index: usize, function: &str, expected: &str, got: &Value) -> mlua::Error {
    mlua::Error::runtime(format!(
        "bad argument #{} to '{}' ({} expected, got {})",
        index,
        function,
        expected,
        got.type_name()
    ))
}

/// Accept a function or nil, otherwise raise `message`
pub(crate) fn function_or_nil(value: Value, message: &str) -> mlua::Result<Option<Function>> {
    match value {
        Value::Function(f) => Ok(Some(f)),
        Value::Nil => Ok(None),
        _ => Err(mlua::Error::runtime(message)),
    }
}

/// Binding for the `register*` functions: store the callback in `slot`
/// and return the previous one
pub(crate) fn slot_register(
    lua: &Lua,
    ctx: &ApiContext,
    slot: CallbackSlot,
    message: &'static str,
) -> mlua::Result<Function> {
    let ctx = ctx.clone();
    lua.create_function(move |_, callback: Value| {
        let callback = function_or_nil(callback, message)?;
        let registered = callback.is_some();
        let previous = ctx.session.borrow_mut().callbacks.replace(slot, callback);
        tracing::debug!(
            "{} callback {}",
            slot.name(),
            if registered { "registered" } else { "cleared" }
        );
        Ok(previous.map_or(Value::Nil, Value::Function))
    })
}

/// Show a blocking popup, falling back to the given defaults for unknown
/// button set or icon names
pub(crate) fn show_popup(
    ctx: &ApiContext,
    message: &str,
    buttons: Option<String>,
    icon: Option<String>,
    default_buttons: PopupButtons,
    default_icon: PopupIcon,
) -> mlua::Result<&'static str> {
    let buttons = buttons
        .as_deref()
        .and_then(PopupButtons::from_name)
        .unwrap_or(default_buttons);
    let icon = icon
        .as_deref()
        .and_then(PopupIcon::from_name)
        .unwrap_or(default_icon);

    let answer = ctx
        .host
        .borrow_mut()
        .popup(message, buttons, icon)
        .map_err(host_error)?;
    Ok(answer.as_str())
}

/// Lua truthiness
pub(crate) fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Boolean(false))
}
