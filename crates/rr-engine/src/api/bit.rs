//! `bit`: 32-bit integer operations
//!
//! Arguments are normalised to 32 bits the LuaBitOp way (round to nearest,
//! keep the low 32 bits) and results come back as signed 32-bit integers.

use super::bad_argument;
use mlua::{Lua, Table, Value, Variadic};

fn parse_number_string(s: &str) -> Option<f64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()? as f64,
        None => digits.parse::<f64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Normalise a number to 32 bits
pub(crate) fn to_bits(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.round_ties_even() as i64 as u32
}

fn arg(args: &[Value], index: usize, function: &str) -> mlua::Result<u32> {
    let value = args.get(index).unwrap_or(&Value::Nil);
    match value {
        Value::Integer(i) => Ok(*i as u32),
        Value::Number(n) => Ok(to_bits(*n)),
        Value::String(s) => parse_number_string(&s.to_string_lossy())
            .map(to_bits)
            .ok_or_else(|| bad_argument(index + 1, function, "number", value)),
        other => Err(bad_argument(index + 1, function, "number", other)),
    }
}

#[inline]
fn ret(b: u32) -> i64 {
    b as i32 as i64
}

fn unary(lua: &Lua, name: &'static str, op: fn(u32) -> u32) -> mlua::Result<mlua::Function> {
    lua.create_function(move |_, args: Variadic<Value>| Ok(ret(op(arg(&args, 0, name)?))))
}

fn fold(lua: &Lua, name: &'static str, op: fn(u32, u32) -> u32) -> mlua::Result<mlua::Function> {
    lua.create_function(move |_, args: Variadic<Value>| {
        let mut acc = arg(&args, 0, name)?;
        for i in 1..args.len() {
            acc = op(acc, arg(&args, i, name)?);
        }
        Ok(ret(acc))
    })
}

fn shift(lua: &Lua, name: &'static str, op: fn(u32, u32) -> u32) -> mlua::Result<mlua::Function> {
    lua.create_function(move |_, args: Variadic<Value>| {
        let b = arg(&args, 0, name)?;
        let n = arg(&args, 1, name)? & 31;
        Ok(ret(op(b, n)))
    })
}

/// `bit.tohex(x [, n])`: `n` hex digits, upper case when `n` is negative
pub(crate) fn to_hex(b: u32, n: i32) -> String {
    const LOWER: &[u8; 16] = b"0123456789abcdef";
    const UPPER: &[u8; 16] = b"0123456789ABCDEF";

    let digits = if n < 0 { UPPER } else { LOWER };
    let count = n.unsigned_abs().min(8) as usize;
    let mut buf = vec![0u8; count];
    let mut b = b;
    for slot in buf.iter_mut().rev() {
        *slot = digits[(b & 15) as usize];
        b >>= 4;
    }
    buf.into_iter().map(char::from).collect()
}

pub(super) fn create(lua: &Lua) -> mlua::Result<Table> {
    let bit = lua.create_table()?;

    bit.set("tobit", unary(lua, "tobit", |b| b)?)?;
    bit.set("bnot", unary(lua, "bnot", |b| !b)?)?;
    bit.set("bswap", unary(lua, "bswap", u32::swap_bytes)?)?;
    bit.set("band", fold(lua, "band", |a, b| a & b)?)?;
    bit.set("bor", fold(lua, "bor", |a, b| a | b)?)?;
    bit.set("bxor", fold(lua, "bxor", |a, b| a ^ b)?)?;
    bit.set("lshift", shift(lua, "lshift", |b, n| b << n)?)?;
    bit.set("rshift", shift(lua, "rshift", |b, n| b >> n)?)?;
    bit.set("arshift", shift(lua, "arshift", |b, n| ((b as i32) >> n) as u32)?)?;
    bit.set("rol", shift(lua, "rol", u32::rotate_left)?)?;
    bit.set("ror", shift(lua, "ror", u32::rotate_right)?)?;

    bit.set(
        "tohex",
        lua.create_function(|_, args: Variadic<Value>| {
            let b = arg(&args, 0, "tohex")?;
            let n = match args.get(1) {
                None => 8,
                Some(_) => arg(&args, 1, "tohex")? as i32,
            };
            Ok(to_hex(b, n))
        })?,
    )?;

    Ok(bit)
}

/// Global `AND`, `OR`, `XOR`, `SHIFT` and `BIT` helpers kept for old scripts
pub(super) fn register_legacy(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set("AND", fold(lua, "AND", |a, b| a & b)?)?;
    globals.set("OR", fold(lua, "OR", |a, b| a | b)?)?;
    globals.set("XOR", fold(lua, "XOR", |a, b| a ^ b)?)?;

    globals.set(
        "SHIFT",
        lua.create_function(|_, (value, amount): (Value, i64)| {
            let b = arg(std::slice::from_ref(&value), 0, "SHIFT")?;
            let shifted = if amount < 0 {
                b << (amount.unsigned_abs() & 31)
            } else {
                b >> (amount & 31)
            };
            Ok(ret(shifted))
        })?,
    )?;

    globals.set(
        "BIT",
        lua.create_function(|_, positions: Variadic<i64>| {
            let bits = positions
                .iter()
                .filter(|&&p| (0..32).contains(&p))
                .fold(0u32, |acc, &p| acc | (1 << p));
            Ok(ret(bits))
        })?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(lua: &Lua, src: &str) -> Value {
        lua.load(src).eval().unwrap()
    }

    fn setup() -> Lua {
        let lua = Lua::new();
        lua.globals().set("bit", create(&lua).unwrap()).unwrap();
        register_legacy(&lua).unwrap();
        lua
    }

    #[test]
    fn test_to_bits() {
        assert_eq!(to_bits(1437217655.0), 1437217655);
        assert_eq!(to_bits(-1.0), 0xFFFF_FFFF);
        assert_eq!(to_bits(2.5), 2);
        assert_eq!(to_bits(3.5), 4);
        assert_eq!(to_bits(4294967296.0), 0);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(0x12345678, 8), "12345678");
        assert_eq!(to_hex(0xABCDEF, -8), "00ABCDEF");
        assert_eq!(to_hex(0x12345678, 4), "5678");
        assert_eq!(to_hex(1, 20), "00000001");
        assert_eq!(to_hex(1, 0), "");
    }

    #[test]
    fn test_bit_library() {
        let lua = setup();
        assert_eq!(eval(&lua, "bit.band(0xFF, 0x0F, 0x3)"), Value::Integer(3));
        assert_eq!(eval(&lua, "bit.bor(1, 2, 4)"), Value::Integer(7));
        assert_eq!(eval(&lua, "bit.bnot(0)"), Value::Integer(-1));
        assert_eq!(eval(&lua, "bit.tobit(0xFFFFFFFF)"), Value::Integer(-1));
        assert_eq!(eval(&lua, "bit.lshift(1, 33)"), Value::Integer(2));
        assert_eq!(eval(&lua, "bit.rshift(-1, 28)"), Value::Integer(15));
        assert_eq!(eval(&lua, "bit.arshift(-256, 4)"), Value::Integer(-16));
        assert_eq!(eval(&lua, "bit.rol(0x80000001, 1)"), Value::Integer(3));
        assert_eq!(eval(&lua, "bit.bswap(0x12345678)"), Value::Integer(0x78563412));
        assert_eq!(
            eval(&lua, "bit.tohex(255, -4)"),
            Value::String(lua.create_string("00FF").unwrap())
        );
        assert!(lua.load("bit.band({})").exec().is_err());
    }

    #[test]
    fn test_legacy_globals() {
        let lua = setup();
        assert_eq!(eval(&lua, "AND(6, 3)"), Value::Integer(2));
        assert_eq!(eval(&lua, "XOR(6, 3)"), Value::Integer(5));
        assert_eq!(eval(&lua, "SHIFT(1, -4)"), Value::Integer(16));
        assert_eq!(eval(&lua, "SHIFT(16, 4)"), Value::Integer(1));
        assert_eq!(eval(&lua, "BIT(0, 3, 40)"), Value::Integer(9));
    }
}
