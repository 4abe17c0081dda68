//! `movie`: recording state queries

use super::{host_error, truthy, ApiContext};
use mlua::{Lua, Table, Value, Variadic};
use rr_core::{HostError, MovieMode};

pub(super) fn create(lua: &Lua, ctx: &ApiContext) -> mlua::Result<Table> {
    let movie = lua.create_table()?;

    let c = ctx.clone();
    movie.set(
        "framecount",
        lua.create_function(move |_, ()| Ok(c.host.borrow().frame_number()))?,
    )?;

    let c = ctx.clone();
    movie.set(
        "mode",
        lua.create_function(move |_, ()| {
            Ok(match c.host.borrow().movie_mode() {
                MovieMode::Record => Some("record"),
                MovieMode::Playback => Some("playback"),
                MovieMode::Inactive => None,
            })
        })?,
    )?;

    let c = ctx.clone();
    movie.set(
        "rerecordcounting",
        lua.create_function(move |_, args: Variadic<Value>| {
            let Some(counting) = args.first() else {
                return Err(mlua::Error::runtime("no parameters specified"));
            };
            c.session.borrow_mut().skip_rerecords = !truthy(counting);
            Ok(())
        })?,
    )?;

    let c = ctx.clone();
    let stop = lua.create_function(move |_, ()| {
        let mut host = c.host.borrow_mut();
        if host.movie_mode() == MovieMode::Inactive {
            return Err(host_error(HostError::NoMovie));
        }
        host.stop_movie().map_err(host_error)
    })?;
    movie.set("stop", stop.clone())?;
    movie.set("close", stop)?;

    Ok(movie)
}
