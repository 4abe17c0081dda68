//! Global helpers: `print`, `tostring`, `addressof`, `copytable`

use super::{bad_argument, ApiContext};
use crate::stringify::Stringifier;
use mlua::{Function, Lua, Value, Variadic};

pub(super) fn register(lua: &Lua, ctx: &ApiContext) -> mlua::Result<()> {
    let globals = lua.globals();

    let c = ctx.clone();
    globals.set(
        "tostring",
        lua.create_function(move |lua, value: Value| {
            let limit = c.session.borrow().max_print_len;
            Stringifier::new(lua, limit).render_one(&value)
        })?,
    )?;

    let c = ctx.clone();
    globals.set(
        "print",
        lua.create_function(move |lua, args: Variadic<Value>| {
            let limit = c.session.borrow().max_print_len;
            let text = match lua.globals().get::<Value>("tostring")? {
                // goes through a script-replaced tostring too
                Value::Function(tostring) => {
                    let parts = args
                        .iter()
                        .map(|value| stringify_with(&tostring, value))
                        .collect::<mlua::Result<Vec<_>>>()?;
                    truncate(parts.join(" "), limit)
                }
                _ => Stringifier::new(lua, limit).render_all(args.iter())?,
            };
            c.host.borrow_mut().print(&text);
            Ok(())
        })?,
    )?;

    globals.set(
        "addressof",
        lua.create_function(|_, value: Value| Ok(value.to_pointer() as usize as i64))?,
    )?;

    globals.set(
        "copytable",
        lua.create_function(|lua, value: Value| match value {
            Value::Nil => Ok(Value::Nil),
            Value::Table(original) => {
                let copy = lua.create_table()?;
                for pair in original.clone().pairs::<Value, Value>() {
                    let (k, v) = pair?;
                    copy.raw_set(k, v)?;
                }
                copy.set_metatable(original.metatable());
                Ok(Value::Table(copy))
            }
            other => Err(bad_argument(1, "copytable", "table", &other)),
        })?,
    )?;

    Ok(())
}

fn stringify_with(tostring: &Function, value: &Value) -> mlua::Result<String> {
    match tostring.call::<Value>(value.clone())? {
        Value::String(s) => Ok(s.to_string_lossy().to_string()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Number(n) => Ok(crate::stringify::format_number(n)),
        _ => Err(mlua::Error::runtime("'tostring' must return a string to 'print'")),
    }
}

fn truncate(mut text: String, limit: usize) -> String {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit.saturating_sub(3);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push_str("...");
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc".to_string(), 10), "abc");
        assert_eq!(truncate("abcdefghijkl".to_string(), 8), "abcde...");
    }
}
