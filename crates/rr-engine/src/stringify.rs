//! Value stringification for `print` and `tostring`
//!
//! Tables are rendered with their contents, `{1, 2, x='y'}`, instead of an
//! address. `__tostring` hooks on tables are honored. Two identity stacks
//! stop infinite recursion: one for tables currently being rendered and one
//! for tables whose hook is currently running.

use mlua::{Function, Lua, Table, Value};
use std::ffi::c_void;

/// Registry key of the interpreter's builtin `tostring`
pub(crate) const BUILTIN_TOSTRING: &str = "rr.builtin_tostring";

const ELLIPSIS: &str = "...";

pub(crate) struct Stringifier<'lua> {
    lua: &'lua Lua,
    out: String,
    limit: usize,
    truncated: bool,
    tables: Vec<*const c_void>,
    hooks: Vec<*const c_void>,
}

impl<'lua> Stringifier<'lua> {
    pub fn new(lua: &'lua Lua, limit: usize) -> Self {
        Self {
            lua,
            out: String::new(),
            limit,
            truncated: false,
            tables: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Render several values separated by single spaces
    pub fn render_all<'v>(mut self, values: impl IntoIterator<Item = &'v Value>) -> mlua::Result<String> {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(" ");
            }
            self.render(value)?;
        }
        Ok(self.finish())
    }

    pub fn render_one(mut self, value: &Value) -> mlua::Result<String> {
        self.render(value)?;
        Ok(self.finish())
    }

    fn full(&self) -> bool {
        self.truncated
    }

    fn push(&mut self, s: &str) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.out.len());
        if s.len() <= room {
            self.out.push_str(s);
            return;
        }
        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.out.push_str(&s[..end]);
        self.truncated = true;
    }

    fn finish(mut self) -> String {
        if self.truncated {
            let mut end = self.limit.saturating_sub(ELLIPSIS.len()).min(self.out.len());
            while !self.out.is_char_boundary(end) {
                end -= 1;
            }
            self.out.truncate(end);
            self.out.push_str(ELLIPSIS);
        }
        self.out
    }

    fn render(&mut self, value: &Value) -> mlua::Result<()> {
        if self.full() {
            return Ok(());
        }
        match value {
            Value::Nil => self.push("nil"),
            Value::Boolean(b) => self.push(if *b { "true" } else { "false" }),
            Value::Integer(i) => self.push(&i.to_string()),
            Value::Number(n) => self.push(&format_number(*n)),
            Value::String(s) => self.push(&s.to_string_lossy()),
            Value::Table(t) => self.render_table(t)?,
            Value::UserData(_) => {
                let text = self.builtin_tostring(value)?;
                self.push(&text);
            }
            Value::Error(e) => self.push(&error_message(e)),
            other => self.push(&address_of(other)),
        }
        Ok(())
    }

    /// Builtin `tostring`, which honors `__tostring` and `__name` on userdata
    fn builtin_tostring(&self, value: &Value) -> mlua::Result<String> {
        match self.lua.named_registry_value::<Option<Function>>(BUILTIN_TOSTRING)? {
            Some(f) => f.call::<String>(value.clone()),
            None => Ok(address_of(value)),
        }
    }

    fn render_table(&mut self, table: &Table) -> mlua::Result<()> {
        let ptr = table.to_pointer();

        if let Some(hook) = tostring_hook(table) {
            if !self.hooks.contains(&ptr) {
                let shown = hook.call::<Value>(table.clone())?;
                self.hooks.push(ptr);
                let result = self.render(&shown);
                self.hooks.pop();
                return result;
            }
        }

        if let Some(pos) = self.tables.iter().position(|&p| p == ptr) {
            let depth = self.tables.len() - pos;
            if depth > 1 {
                self.push(&format!("table:parent^{}", depth));
            } else {
                self.push("table:parent");
            }
            return Ok(());
        }

        self.tables.push(ptr);
        let result = self.render_entries(table);
        self.tables.pop();
        result
    }

    fn render_entries(&mut self, table: &Table) -> mlua::Result<()> {
        self.push("{");
        let mut first = true;
        let mut in_array = true;
        let mut array_index = 0.0f64;

        for pair in table.clone().pairs::<Value, Value>() {
            let (key, value) = pair?;
            if !first {
                self.push(", ");
            }
            first = false;

            if in_array {
                array_index += 1.0;
                in_array = match key {
                    Value::Integer(i) => i as f64 == array_index,
                    Value::Number(n) => n == array_index,
                    _ => false,
                };
            }

            if !in_array {
                self.render_key(&key)?;
            }

            if matches!(value, Value::String(_)) {
                self.push("'");
                self.render(&value)?;
                self.push("'");
            } else {
                self.render(&value)?;
            }

            if self.full() {
                break;
            }
        }
        self.push("}");
        Ok(())
    }

    fn render_key(&mut self, key: &Value) -> mlua::Result<()> {
        match key {
            Value::String(s) if is_identifier(&s.as_bytes()) => {
                self.render(key)?;
                self.push("=");
            }
            Value::String(_) => {
                self.push("['");
                self.render(key)?;
                self.push("']=");
            }
            _ => {
                self.push("[");
                self.render(key)?;
                self.push("]=");
            }
        }
        Ok(())
    }
}

fn is_identifier(bytes: &[u8]) -> bool {
    let Some((first, rest)) = bytes.split_first() else {
        return false;
    };
    (first.is_ascii_alphabetic() || *first == b'_')
        && rest.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_')
}

fn tostring_hook(table: &Table) -> Option<Function> {
    match table.metatable()?.raw_get::<Value>("__tostring") {
        Ok(Value::Function(f)) => Some(f),
        _ => None,
    }
}

/// Message of a caught error, without the traceback of the Rust callback
/// that raised it
fn error_message(error: &mlua::Error) -> String {
    match error {
        mlua::Error::CallbackError { cause, .. } => error_message(cause),
        other => other.to_string(),
    }
}

fn address_of(value: &Value) -> String {
    format!("{}:{:p}", value.type_name(), value.to_pointer())
}

/// Format like C's `%.12g`
pub(crate) fn format_number(n: f64) -> String {
    const PRECISION: i32 = 12;

    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(lua: &Lua, src: &str) -> String {
        let value: Value = lua.load(src).eval().unwrap();
        Stringifier::new(lua, 1 << 16).render_one(&value).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(1.0 / 3.0), "0.333333333333");
        assert_eq!(format_number(1e20), "1e+20");
        assert_eq!(format_number(123456789012.0), "123456789012");
        assert_eq!(format_number(1234567890123.0), "1.23456789012e+12");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(-2.25), "-2.25");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn test_primitives() {
        let lua = Lua::new();
        assert_eq!(show(&lua, "nil"), "nil");
        assert_eq!(show(&lua, "true"), "true");
        assert_eq!(show(&lua, "42"), "42");
        assert_eq!(show(&lua, "0.5"), "0.5");
        assert_eq!(show(&lua, "'hi'"), "hi");
    }

    #[test]
    fn test_tables() {
        let lua = Lua::new();
        assert_eq!(show(&lua, "{}"), "{}");
        assert_eq!(show(&lua, "{1, 2, 'x'}"), "{1, 2, 'x'}");
        assert_eq!(show(&lua, "{name='bob'}"), "{name='bob'}");
        assert_eq!(show(&lua, "{['two words']=1}"), "{['two words']=1}");
        assert_eq!(show(&lua, "{_a1=1}"), "{_a1=1}");
        assert_eq!(show(&lua, "{['1a']=1}"), "{['1a']=1}");
        assert_eq!(show(&lua, "{['a-b']=1}"), "{['a-b']=1}");
        assert_eq!(show(&lua, "{[true]=1}"), "{[true]=1}");
        assert_eq!(show(&lua, "{[5]=1}"), "{[5]=1}");
    }

    #[test]
    fn test_self_reference() {
        let lua = Lua::new();
        assert_eq!(show(&lua, "local t = {} t.me = t return t"), "{me=table:parent}");
        assert_eq!(
            show(&lua, "local t = {} t.a = {b = t} return t"),
            "{a={b=table:parent^2}}"
        );
    }

    #[test]
    fn test_tostring_hook() {
        let lua = Lua::new();
        let src = "return setmetatable({}, {__tostring = function() return 'custom' end})";
        assert_eq!(show(&lua, src), "custom");

        // a hook returning its own table falls back to the contents
        let src = "local t = {1} return setmetatable(t, {__tostring = function(s) return s end})";
        assert_eq!(show(&lua, src), "{1}");
    }

    #[test]
    fn test_truncation() {
        let lua = Lua::new();
        let value: Value = lua.load("string.rep('a', 100)").eval().unwrap();
        let text = Stringifier::new(&lua, 10).render_one(&value).unwrap();
        assert_eq!(text, "aaaaaaa...");
    }

    #[test]
    fn test_errors_show_message() {
        let lua = Lua::new();
        let fail = lua
            .create_function(|_, ()| -> mlua::Result<()> { Err(mlua::Error::runtime("bad mode")) })
            .unwrap();
        lua.globals().set("fail", fail).unwrap();
        assert_eq!(show(&lua, "select(2, pcall(fail))"), "bad mode");
    }

    #[test]
    fn test_functions_show_address() {
        let lua = Lua::new();
        assert!(show(&lua, "print").starts_with("function:"));
    }
}
