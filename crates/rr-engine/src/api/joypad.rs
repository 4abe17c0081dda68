//! `joypad`: digital input reports and per-frame overrides

use super::ApiContext;
use mlua::{Lua, Table, Value};
use rr_input::{read_report, ReportFilter};

const SET_ERROR: &str = "table expected in arg 1 to joypad.set";

pub(super) fn create(lua: &Lua, ctx: &ApiContext) -> mlua::Result<Table> {
    let joypad = lua.create_table()?;

    for (names, filter) in [
        (["get", "read"], ReportFilter::ALL),
        (["getdown", "readdown"], ReportFilter::DOWN),
        (["getup", "readup"], ReportFilter::UP),
    ] {
        let c = ctx.clone();
        let report = lua.create_function(move |lua, ()| {
            let fields = c.host.borrow().digital_fields();
            lua.create_table_from(read_report(&fields, filter))
        })?;
        for name in names {
            joypad.set(name, report.clone())?;
        }
    }

    let c = ctx.clone();
    let set = lua.create_function(move |_, buttons: Value| {
        let Value::Table(buttons) = buttons else {
            return Err(mlua::Error::runtime(SET_ERROR));
        };
        let fields = c.host.borrow().digital_fields();
        let mut session = c.session.borrow_mut();
        session.overrides.set(&fields, |name| {
            buttons
                .raw_get::<Value>(name)
                .map(|v| !v.is_nil())
                .unwrap_or(false)
        });
        Ok(())
    })?;
    joypad.set("set", set.clone())?;
    joypad.set("write", set)?;

    Ok(joypad)
}
