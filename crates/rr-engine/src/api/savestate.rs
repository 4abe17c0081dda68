//! `savestate`: handles bound to a state filename

use super::{host_error, ApiContext};
use mlua::{Lua, MetaMethod, Table, UserData, UserDataFields, UserDataMethods, Value};
use rr_core::HostError;

const NOT_A_SAVESTATE: &str = "object not a savestate object";

/// Script handle naming a save state slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SavestateHandle {
    filename: String,
}

impl UserData for SavestateHandle {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("filename", |_, this| Ok(this.filename.clone()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("savestate({})", this.filename))
        });
    }
}

fn filename_of(value: &Value) -> mlua::Result<String> {
    match value {
        Value::UserData(ud) => ud
            .borrow::<SavestateHandle>()
            .map(|handle| handle.filename.clone())
            .map_err(|_| mlua::Error::runtime(NOT_A_SAVESTATE)),
        _ => Err(mlua::Error::runtime(NOT_A_SAVESTATE)),
    }
}

pub(super) fn create(lua: &Lua, ctx: &ApiContext) -> mlua::Result<Table> {
    let savestate = lua.create_table()?;

    savestate.set(
        "create",
        lua.create_function(|lua, filename: String| {
            if filename.is_empty() {
                return Err(host_error(HostError::InvalidSavestate(filename)));
            }
            lua.create_userdata(SavestateHandle { filename })
        })?,
    )?;

    let c = ctx.clone();
    savestate.set(
        "save",
        lua.create_function(move |_, handle: Value| {
            let filename = filename_of(&handle)?;
            c.session.borrow_mut().watchdog.reset();
            tracing::info!("Scheduling state save to {}", filename);
            c.host.borrow_mut().schedule_save(&filename).map_err(host_error)
        })?,
    )?;

    let c = ctx.clone();
    savestate.set(
        "load",
        lua.create_function(move |_, handle: Value| {
            let filename = filename_of(&handle)?;
            c.session.borrow_mut().watchdog.reset();
            tracing::info!("Scheduling state load from {}", filename);
            c.host.borrow_mut().schedule_load(&filename).map_err(host_error)
        })?,
    )?;

    Ok(savestate)
}
