//! `memory`: sized reads and writes, byte ranges, write watches

use super::ApiContext;
use crate::callbacks::notify_writes;
use mlua::{Lua, Table, Value};
use rr_memory::{read_range, read_sized, write_sized, AccessWidth};

const REGISTER_ERROR: &str = "function or nil expected in arg 2 to memory.register";

const READS: &[(&str, AccessWidth, bool)] = &[
    ("readbyte", AccessWidth::Byte, false),
    ("readbyteunsigned", AccessWidth::Byte, false),
    ("readbytesigned", AccessWidth::Byte, true),
    ("readword", AccessWidth::Word, false),
    ("readwordunsigned", AccessWidth::Word, false),
    ("readwordsigned", AccessWidth::Word, true),
    ("readshort", AccessWidth::Word, false),
    ("readshortunsigned", AccessWidth::Word, false),
    ("readshortsigned", AccessWidth::Word, true),
    ("readdword", AccessWidth::Dword, false),
    ("readdwordunsigned", AccessWidth::Dword, false),
    ("readdwordsigned", AccessWidth::Dword, true),
    ("readlong", AccessWidth::Dword, false),
    ("readlongunsigned", AccessWidth::Dword, false),
    ("readlongsigned", AccessWidth::Dword, true),
];

const WRITES: &[(&str, AccessWidth)] = &[
    ("writebyte", AccessWidth::Byte),
    ("writeword", AccessWidth::Word),
    ("writeshort", AccessWidth::Word),
    ("writedword", AccessWidth::Dword),
    ("writelong", AccessWidth::Dword),
];

pub(super) fn create(lua: &Lua, ctx: &ApiContext) -> mlua::Result<Table> {
    let memory = lua.create_table()?;

    for &(name, width, signed) in READS {
        let c = ctx.clone();
        memory.set(
            name,
            lua.create_function(move |_, addr: i64| {
                Ok(read_sized(&*c.host.borrow(), addr as u32, width, signed))
            })?,
        )?;
    }

    let c = ctx.clone();
    memory.set(
        "readbyterange",
        lua.create_function(move |lua, (addr, len): (i64, i64)| {
            let bytes = read_range(&*c.host.borrow(), addr as u32, len);
            lua.create_sequence_from(bytes)
        })?,
    )?;

    for &(name, width) in WRITES {
        let c = ctx.clone();
        memory.set(
            name,
            lua.create_function(move |_, (addr, value): (i64, i64)| {
                write_sized(&mut *c.host.borrow_mut(), addr as u32, width, value);
                notify_writes(&c);
                Ok(())
            })?,
        )?;
    }

    let c = ctx.clone();
    let register = lua.create_function(move |_, (addr, callback): (i64, Value)| {
        let callback = super::function_or_nil(callback, REGISTER_ERROR)?;
        let addr = addr as u32;
        let current = c.host.borrow().read_byte(addr);
        let mut session = c.session.borrow_mut();
        session.watches.register(addr, callback, current);
        tracing::debug!(
            "Write watch at 0x{:08X} now {} entries",
            addr,
            session.watches.count()
        );
        Ok(())
    })?;
    memory.set("registerwrite", register.clone())?;
    memory.set("register", register)?;

    Ok(memory)
}
