//! `gui`: overlay drawing, screen read-back and popups

use super::{bad_argument, show_popup, slot_register, ApiContext};
use crate::session::CallbackSlot;
use mlua::{Lua, Table, Value, Variadic};
use rr_core::{OverlayError, PopupButtons, PopupIcon};
use rr_overlay::{Blit, Channel, Color, ColorBuilder, FrameBuffer, GdImage, PixelFormat};

const CALLBACK_ERROR: &str = "function or nil expected";

/// Default box fill, translucent white
const BOX_FILL: Color = Color::from_rgba(0xFFFFFF3F);

fn overlay_error(e: OverlayError) -> mlua::Error {
    mlua::Error::runtime(e.to_string())
}

/// Integer part of a number
fn number_to_int(n: f64) -> i64 {
    if n.is_finite() {
        n as i64
    } else {
        0
    }
}

fn value_to_int(value: &Value) -> i64 {
    match value {
        Value::Integer(i) => *i,
        Value::Number(n) => number_to_int(*n),
        _ => 0,
    }
}

fn color_from_table(table: &Table) -> mlua::Result<Color> {
    let mut builder = ColorBuilder::new();
    for pair in table.clone().pairs::<Value, Value>() {
        let (key, value) = pair?;
        let channel = match &key {
            Value::String(s) => Channel::from_key(&s.to_string_lossy()),
            Value::Integer(_) | Value::Number(_) => Channel::from_index(value_to_int(&key)),
            _ => None,
        };
        if let Some(channel) = channel {
            builder.set(channel, value_to_int(&value));
        }
    }
    Ok(builder.build())
}

/// Resolve a script color argument before the opacity modifier.
///
/// With a default, missing arguments, unknown names and unsupported types
/// fall back to it; without one they are errors.
fn resolve_color(value: Option<&Value>, default: Option<Color>) -> mlua::Result<Color> {
    let fallback = |err: OverlayError| default.ok_or_else(|| overlay_error(err));

    match value {
        Some(Value::String(s)) => {
            let name = s.to_string_lossy();
            match name.parse::<Color>() {
                Ok(color) => Ok(color),
                Err(e) => fallback(e),
            }
        }
        Some(Value::Integer(i)) => Ok(Color::from_rgba(*i as u32)),
        Some(Value::Number(n)) => Ok(Color::from_rgba(number_to_int(*n) as u32)),
        Some(Value::Table(t)) => color_from_table(t),
        Some(Value::Function(_)) => Err(overlay_error(OverlayError::InvalidColor)),
        _ => fallback(OverlayError::InvalidColor),
    }
}

/// Resolve a color and apply the session's opacity modifier
fn color_arg(ctx: &ApiContext, value: Option<&Value>, default: Option<Color>) -> mlua::Result<Color> {
    let color = resolve_color(value, default)?;
    Ok(ctx.session.borrow().canvas.apply_opacity(color))
}

/// Arguments of `gui.gdoverlay([dx, dy,] data [, sx, sy, sw, sh] [, alphamul])`
fn parse_overlay_args(args: &[Value]) -> mlua::Result<(Blit, mlua::String)> {
    let is_number = |v: Option<&Value>| matches!(v, Some(Value::Integer(_) | Value::Number(_)));
    let mut blit = Blit::default();
    let mut index = 0;

    if is_number(args.get(index)) {
        blit.dst_x = value_to_int(&args[index]) as i32;
        index += 1;
        if is_number(args.get(index)) {
            blit.dst_y = value_to_int(&args[index]) as i32;
            index += 1;
        }
    }

    let data = match args.get(index) {
        Some(Value::String(s)) => s.clone(),
        other => {
            return Err(bad_argument(
                index + 1,
                "gdoverlay",
                "string",
                other.unwrap_or(&Value::Nil),
            ))
        }
    };
    index += 1;

    if args.len().saturating_sub(index) >= 4 {
        let mut rect = [0i32; 4];
        for (slot, value) in rect.iter_mut().zip(&args[index..index + 4]) {
            if !is_number(Some(value)) {
                return Err(bad_argument(index + 1, "gdoverlay", "number", value));
            }
            *slot = value_to_int(value) as i32;
            index += 1;
        }
        blit.src = Some((rect[0], rect[1], rect[2], rect[3]));
    }

    match args.get(index) {
        Some(Value::Integer(i)) => blit.alpha = *i as f64,
        Some(Value::Number(n)) => blit.alpha = *n,
        _ => {}
    }

    Ok((blit, data))
}

pub(super) fn create(lua: &Lua, ctx: &ApiContext) -> mlua::Result<Table> {
    let gui = lua.create_table()?;

    gui.set("register", slot_register(lua, ctx, CallbackSlot::Gui, CALLBACK_ERROR)?)?;

    let c = ctx.clone();
    let pixel = lua.create_function(move |_, (x, y, color): (f64, f64, Value)| {
        let color = color_arg(&c, Some(&color), None)?;
        c.session
            .borrow_mut()
            .canvas
            .draw_pixel(number_to_int(x) as i32, number_to_int(y) as i32, color);
        Ok(())
    })?;
    for name in ["pixel", "drawpixel", "setpixel", "writepixel"] {
        gui.set(name, pixel.clone())?;
    }

    let c = ctx.clone();
    let line = lua.create_function(
        move |_, (x1, y1, x2, y2, color, skip_first): (f64, f64, f64, f64, Option<Value>, Option<Value>)| {
            let color = color_arg(&c, color.as_ref(), Some(Color::WHITE))?;
            let skip_first = skip_first.as_ref().is_some_and(super::truthy);
            c.session.borrow_mut().canvas.draw_line(
                number_to_int(x1) as i32,
                number_to_int(y1) as i32,
                number_to_int(x2) as i32,
                number_to_int(y2) as i32,
                color,
                skip_first,
            );
            Ok(())
        },
    )?;
    gui.set("line", line.clone())?;
    gui.set("drawline", line)?;

    let c = ctx.clone();
    let rect = lua.create_function(
        move |_, (x1, y1, x2, y2, fill, outline): (f64, f64, f64, f64, Option<Value>, Option<Value>)| {
            let fill = color_arg(&c, fill.as_ref(), Some(BOX_FILL))?;
            let outline = color_arg(&c, outline.as_ref(), Some(fill.opaque()))?;
            c.session.borrow_mut().canvas.draw_box(
                number_to_int(x1) as i32,
                number_to_int(y1) as i32,
                number_to_int(x2) as i32,
                number_to_int(y2) as i32,
                fill,
                outline,
            );
            Ok(())
        },
    )?;
    for name in ["box", "drawbox", "rect", "drawrect"] {
        gui.set(name, rect.clone())?;
    }

    let c = ctx.clone();
    let text = lua.create_function(
        move |_, (x, y, msg, color, outline): (f64, f64, mlua::String, Option<Value>, Option<Value>)| {
            let color = color_arg(&c, color.as_ref(), Some(Color::WHITE))?;
            let outline = color_arg(&c, outline.as_ref(), Some(Color::BLACK))?;
            c.session.borrow_mut().canvas.draw_text(
                number_to_int(x) as i32,
                number_to_int(y) as i32,
                &msg.as_bytes(),
                color,
                outline,
            );
            Ok(())
        },
    )?;
    gui.set("text", text.clone())?;
    gui.set("drawtext", text)?;

    let c = ctx.clone();
    let getpixel = lua.create_function(move |_, (x, y): (f64, f64)| {
        let session = c.session.borrow();
        Ok(session.screen.as_ref().map_or((0, 0, 0), |frame| {
            frame.get_pixel(number_to_int(x) as i32, number_to_int(y) as i32)
        }))
    })?;
    gui.set("getpixel", getpixel.clone())?;
    gui.set("readpixel", getpixel)?;

    let c = ctx.clone();
    gui.set(
        "parsecolor",
        lua.create_function(move |_, color: Value| {
            let color = color_arg(&c, Some(&color), None)?;
            Ok((color.r, color.g, color.b, color.a))
        })?,
    )?;

    let c = ctx.clone();
    gui.set(
        "gdscreenshot",
        lua.create_function(move |lua, ()| {
            let session = c.session.borrow();
            let canvas = &session.canvas;
            let bytes = match &session.screen {
                Some(frame) => frame.gd_screenshot(Some(canvas)),
                None => FrameBuffer::new(PixelFormat::Rgb32, canvas.width(), canvas.height())
                    .gd_screenshot(Some(canvas)),
            };
            lua.create_string(bytes)
        })?,
    )?;

    let c = ctx.clone();
    let overlay = lua.create_function(move |_, args: Variadic<Value>| {
        let (blit, data) = parse_overlay_args(&args)?;
        let bytes = data.as_bytes();
        let image = GdImage::parse(&bytes).map_err(overlay_error)?;
        c.session.borrow_mut().canvas.draw_image(&image, &blit);
        Ok(())
    })?;
    for name in ["gdoverlay", "image", "drawimage"] {
        gui.set(name, overlay.clone())?;
    }

    let c = ctx.clone();
    gui.set(
        "opacity",
        lua.create_function(move |_, opacity: f64| {
            c.session.borrow_mut().canvas.set_opacity(opacity);
            Ok(())
        })?,
    )?;

    let c = ctx.clone();
    gui.set(
        "transparency",
        lua.create_function(move |_, transparency: f64| {
            c.session.borrow_mut().canvas.set_transparency(transparency);
            Ok(())
        })?,
    )?;

    let c = ctx.clone();
    gui.set(
        "clearuncommitted",
        lua.create_function(move |_, ()| {
            c.session.borrow_mut().canvas.clear();
            Ok(())
        })?,
    )?;

    let c = ctx.clone();
    gui.set(
        "popup",
        lua.create_function(
            move |_, (message, buttons, icon): (String, Option<String>, Option<String>)| {
                show_popup(&c, &message, buttons, icon, PopupButtons::Ok, PopupIcon::Notice)
            },
        )?,
    )?;

    Ok(gui)
}
