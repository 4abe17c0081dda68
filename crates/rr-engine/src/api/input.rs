//! `input`: physical keyboard and pointer

use super::{show_popup, ApiContext};
use mlua::{Lua, Table};
use rr_core::{PopupButtons, PopupIcon};

pub(super) fn create(lua: &Lua, ctx: &ApiContext) -> mlua::Result<Table> {
    let input = lua.create_table()?;

    let c = ctx.clone();
    let get = lua.create_function(move |lua, ()| {
        let state = c.host.borrow().physical_input();
        let table = lua.create_table()?;
        for key in state.keys {
            table.set(key, true)?;
        }
        if let Some((x, y)) = state.mouse {
            table.set("xmouse", x)?;
            table.set("ymouse", y)?;
        }
        Ok(table)
    })?;
    input.set("get", get.clone())?;
    input.set("read", get)?;

    let c = ctx.clone();
    input.set(
        "popup",
        lua.create_function(
            move |_, (message, buttons, icon): (String, Option<String>, Option<String>)| {
                show_popup(
                    &c,
                    &message,
                    buttons,
                    icon,
                    PopupButtons::YesNo,
                    PopupIcon::Question,
                )
            },
        )?,
    )?;

    Ok(input)
}
