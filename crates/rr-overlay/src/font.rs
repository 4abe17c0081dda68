//! Built-in 4x7 bitmap font and text drawing

use crate::canvas::OverlayCanvas;
use crate::color::Color;

/// Width of a character cell
pub const GLYPH_ADVANCE: i32 = 4;
/// Height of a text line
pub const LINE_HEIGHT: i32 = 8;
const GLYPH_ROWS: usize = 7;
const TAB_STOP: i32 = 8;

/// Glyphs for bytes 32..=127, one 4-bit mask per row, leftmost column in
/// the high bit
#[rustfmt::skip]
static GLYPHS: [[u8; GLYPH_ROWS]; 96] = [
    [0b0000, 0b0000, 0b0000, 0b0000, 0b0000, 0b0000, 0b0000], // space
    [0b0000, 0b0100, 0b0100, 0b0100, 0b0000, 0b0100, 0b0000], // !
    [0b0000, 0b1010, 0b1010, 0b0000, 0b0000, 0b0000, 0b0000], // "
    [0b0000, 0b1010, 0b1110, 0b1010, 0b1110, 0b1010, 0b0000], // #
    [0b0000, 0b0110, 0b1100, 0b0100, 0b0110, 0b1100, 0b0000], // $
    [0b0000, 0b1000, 0b0010, 0b0100, 0b1000, 0b0010, 0b0000], // %
    [0b0000, 0b0100, 0b1010, 0b0100, 0b1010, 0b0110, 0b0000], // &
    [0b0000, 0b0100, 0b0100, 0b0000, 0b0000, 0b0000, 0b0000], // '
    [0b0000, 0b0100, 0b1000, 0b1000, 0b1000, 0b0100, 0b0000], // (
    [0b0000, 0b0100, 0b0010, 0b0010, 0b0010, 0b0100, 0b0000], // )
    [0b0000, 0b0000, 0b0100, 0b1110, 0b0100, 0b1010, 0b0000], // *
    [0b0000, 0b0000, 0b0100, 0b1110, 0b0100, 0b0000, 0b0000], // +
    [0b0000, 0b0000, 0b0000, 0b0000, 0b0100, 0b0100, 0b1000], // ,
    [0b0000, 0b0000, 0b0000, 0b1110, 0b0000, 0b0000, 0b0000], // -
    [0b0000, 0b0000, 0b0000, 0b0000, 0b0000, 0b0100, 0b0000], // .
    [0b0010, 0b0010, 0b0100, 0b0100, 0b1000, 0b1000, 0b0000], // /
    [0b0000, 0b0100, 0b1010, 0b1010, 0b1010, 0b0100, 0b0000], // 0
    [0b0000, 0b0100, 0b1100, 0b0100, 0b0100, 0b0100, 0b0000], // 1
    [0b0000, 0b1100, 0b0010, 0b0100, 0b1000, 0b1110, 0b0000], // 2
    [0b0000, 0b1100, 0b0010, 0b1100, 0b0010, 0b1100, 0b0000], // 3
    [0b0000, 0b0100, 0b1000, 0b1010, 0b1110, 0b0010, 0b0000], // 4
    [0b0000, 0b1110, 0b1000, 0b1100, 0b0010, 0b1100, 0b0000], // 5
    [0b0000, 0b0100, 0b1000, 0b1100, 0b1010, 0b0100, 0b0000], // 6
    [0b0000, 0b1110, 0b0010, 0b0100, 0b0100, 0b0100, 0b0000], // 7
    [0b0000, 0b0100, 0b1010, 0b0100, 0b1010, 0b0100, 0b0000], // 8
    [0b0000, 0b0100, 0b1010, 0b0110, 0b0010, 0b0100, 0b0000], // 9
    [0b0000, 0b0000, 0b0100, 0b0000, 0b0000, 0b0100, 0b0000], // :
    [0b0000, 0b0000, 0b0000, 0b0100, 0b0000, 0b0100, 0b1000], // ;
    [0b0000, 0b0010, 0b0100, 0b1000, 0b0100, 0b0010, 0b0000], // <
    [0b0000, 0b0000, 0b1110, 0b0000, 0b1110, 0b0000, 0b0000], // =
    [0b0000, 0b1000, 0b0100, 0b0010, 0b0100, 0b1000, 0b0000], // >
    [0b0000, 0b1100, 0b0010, 0b0100, 0b0000, 0b0100, 0b0000], // ?
    [0b0000, 0b0100, 0b0110, 0b1010, 0b0110, 0b0000, 0b0000], // @
    [0b0000, 0b0100, 0b1010, 0b1110, 0b1010, 0b1010, 0b0000], // A
    [0b0000, 0b1100, 0b1010, 0b1100, 0b1010, 0b1100, 0b0000], // B
    [0b0000, 0b0110, 0b1000, 0b1000, 0b1000, 0b0110, 0b0000], // C
    [0b0000, 0b1100, 0b1010, 0b1010, 0b1010, 0b1100, 0b0000], // D
    [0b0000, 0b1110, 0b1000, 0b1100, 0b1000, 0b1110, 0b0000], // E
    [0b0000, 0b1110, 0b1000, 0b1100, 0b1000, 0b1000, 0b0000], // F
    [0b0000, 0b0110, 0b1000, 0b1010, 0b1010, 0b0110, 0b0000], // G
    [0b0000, 0b1010, 0b1010, 0b1110, 0b1010, 0b1010, 0b0000], // H
    [0b0000, 0b0100, 0b0100, 0b0100, 0b0100, 0b0100, 0b0000], // I
    [0b0000, 0b0010, 0b0010, 0b0010, 0b1010, 0b0100, 0b0000], // J
    [0b0000, 0b1010, 0b1010, 0b1100, 0b1010, 0b1010, 0b0000], // K
    [0b0000, 0b1000, 0b1000, 0b1000, 0b1000, 0b1110, 0b0000], // L
    [0b0000, 0b1010, 0b1110, 0b1010, 0b1010, 0b1010, 0b0000], // M
    [0b0000, 0b1100, 0b1010, 0b1010, 0b1010, 0b1010, 0b0000], // N
    [0b0000, 0b1110, 0b1010, 0b1010, 0b1010, 0b1110, 0b0000], // O
    [0b0000, 0b1100, 0b1010, 0b1100, 0b1000, 0b1000, 0b0000], // P
    [0b0000, 0b1110, 0b1010, 0b1010, 0b1010, 0b1110, 0b0010], // Q
    [0b0000, 0b1100, 0b1010, 0b1100, 0b1010, 0b1010, 0b0000], // R
    [0b0000, 0b0110, 0b1000, 0b0100, 0b0010, 0b1100, 0b0000], // S
    [0b0000, 0b1110, 0b0100, 0b0100, 0b0100, 0b0100, 0b0000], // T
    [0b0000, 0b1010, 0b1010, 0b1010, 0b1010, 0b1110, 0b0000], // U
    [0b0000, 0b1010, 0b1010, 0b1010, 0b0100, 0b0100, 0b0000], // V
    [0b0000, 0b1010, 0b1010, 0b1010, 0b1110, 0b1010, 0b0000], // W
    [0b0000, 0b1010, 0b1010, 0b0100, 0b1010, 0b1010, 0b0000], // X
    [0b0000, 0b1010, 0b1010, 0b0100, 0b0100, 0b0100, 0b0000], // Y
    [0b0000, 0b1110, 0b0010, 0b0100, 0b1000, 0b1110, 0b0000], // Z
    [0b0000, 0b0110, 0b0100, 0b0100, 0b0100, 0b0110, 0b0000], // [
    [0b0000, 0b1000, 0b0100, 0b0100, 0b0010, 0b0010, 0b0000], // backslash
    [0b0000, 0b1100, 0b0100, 0b0100, 0b0100, 0b1100, 0b0000], // ]
    [0b0000, 0b0100, 0b1010, 0b0000, 0b0000, 0b0000, 0b0000], // ^
    [0b0000, 0b0000, 0b0000, 0b0000, 0b0000, 0b1110, 0b0000], // _
    [0b0000, 0b1000, 0b0100, 0b0000, 0b0000, 0b0000, 0b0000], // `
    [0b0000, 0b0000, 0b0110, 0b1010, 0b1010, 0b0110, 0b0000], // a
    [0b0000, 0b1000, 0b1000, 0b1100, 0b1010, 0b1100, 0b0000], // b
    [0b0000, 0b0000, 0b0110, 0b1000, 0b1000, 0b0110, 0b0000], // c
    [0b0000, 0b0010, 0b0010, 0b0110, 0b1010, 0b0110, 0b0000], // d
    [0b0000, 0b0000, 0b0110, 0b1110, 0b1000, 0b0110, 0b0000], // e
    [0b0000, 0b0110, 0b1000, 0b1100, 0b1000, 0b1000, 0b0000], // f
    [0b0000, 0b0000, 0b0110, 0b1010, 0b0110, 0b0010, 0b1100], // g
    [0b0000, 0b1000, 0b1000, 0b1100, 0b1010, 0b1010, 0b0000], // h
    [0b0000, 0b0100, 0b0000, 0b0100, 0b0100, 0b0100, 0b0000], // i
    [0b0000, 0b0100, 0b0000, 0b0100, 0b0100, 0b0100, 0b1000], // j
    [0b0000, 0b1000, 0b1000, 0b1010, 0b1100, 0b1010, 0b0000], // k
    [0b0000, 0b0100, 0b0100, 0b0100, 0b0100, 0b0010, 0b0000], // l
    [0b0000, 0b0000, 0b1010, 0b1110, 0b1010, 0b1010, 0b0000], // m
    [0b0000, 0b0000, 0b1100, 0b1010, 0b1010, 0b1010, 0b0000], // n
    [0b0000, 0b0000, 0b0100, 0b1010, 0b1010, 0b0100, 0b0000], // o
    [0b0000, 0b0000, 0b0100, 0b1010, 0b1100, 0b1000, 0b1000], // p
    [0b0000, 0b0000, 0b0100, 0b1010, 0b0110, 0b0010, 0b0010], // q
    [0b0000, 0b0000, 0b1010, 0b1100, 0b1000, 0b1000, 0b0000], // r
    [0b0000, 0b0000, 0b0110, 0b1000, 0b0110, 0b1100, 0b0000], // s
    [0b0000, 0b0100, 0b1110, 0b0100, 0b0100, 0b0010, 0b0000], // t
    [0b0000, 0b0000, 0b1010, 0b1010, 0b1010, 0b0110, 0b0000], // u
    [0b0000, 0b0000, 0b1010, 0b1010, 0b1010, 0b0100, 0b0000], // v
    [0b0000, 0b0000, 0b1010, 0b1010, 0b1110, 0b1010, 0b0000], // w
    [0b0000, 0b0000, 0b1010, 0b0100, 0b1010, 0b1010, 0b0000], // x
    [0b0000, 0b0000, 0b1010, 0b1010, 0b0100, 0b0100, 0b1000], // y
    [0b0000, 0b0000, 0b1110, 0b0100, 0b1000, 0b1110, 0b0000], // z
    [0b0000, 0b0110, 0b0100, 0b1100, 0b0100, 0b0110, 0b0000], // {
    [0b0000, 0b0100, 0b0100, 0b0000, 0b0100, 0b0100, 0b0000], // |
    [0b0000, 0b1100, 0b0100, 0b0110, 0b0100, 0b1100, 0b0000], // }
    [0b0000, 0b1100, 0b0010, 0b0000, 0b0000, 0b0000, 0b0000], // ~
    [0b0000, 0b0000, 0b0100, 0b1010, 0b1110, 0b0000, 0b0000], // del
];

/// Glyph rows for a printable byte
pub fn glyph(c: u8) -> Option<&'static [u8; GLYPH_ROWS]> {
    GLYPHS.get(c.checked_sub(32)? as usize)
}

/// Whether the glyph covers cell `(col, row)`; cells outside the 4x7 box
/// are never covered
#[inline]
fn covered(glyph: &[u8; GLYPH_ROWS], col: i32, row: i32) -> bool {
    if !(0..4).contains(&col) || !(0..GLYPH_ROWS as i32).contains(&row) {
        return false;
    }
    glyph[row as usize] & (0x8 >> col) != 0
}

/// Whether any cell of the 3x3 block around `(col, row)` is covered
fn near_glyph(glyph: &[u8; GLYPH_ROWS], col: i32, row: i32) -> bool {
    (row - 1..=row + 1).any(|r| (col - 1..=col + 1).any(|c| covered(glyph, c, r)))
}

impl OverlayCanvas {
    /// Draw `text` with its top-left corner at `(x, y)`.
    ///
    /// The outline color is painted on every cell next to the glyph that
    /// the glyph itself does not cover. `\n` starts a new line at the
    /// original x, `\t` moves to the next tab stop and other bytes without
    /// a glyph are skipped.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &[u8], color: Color, outline: Color) {
        if color.a == 0 && outline.a == 0 {
            return;
        }
        self.prepare();

        let (width, height) = (self.width() as i32, self.height() as i32);
        let orig_x = x;
        let (mut x, mut y) = (x, y);
        let mut bytes = text.iter().copied();

        while y < height {
            let Some(mut c) = bytes.next() else { break };

            // the rest of an overlong line is off-screen
            while x > width && c != b'\n' {
                match bytes.next() {
                    Some(next) => c = next,
                    None => return,
                }
            }

            match c {
                b'\n' => {
                    x = orig_x;
                    y = y.saturating_add(LINE_HEIGHT);
                    continue;
                }
                b'\t' => {
                    let column = (x - orig_x) / GLYPH_ADVANCE;
                    x = x.saturating_add((TAB_STOP - column % TAB_STOP) * GLYPH_ADVANCE);
                    continue;
                }
                _ => {}
            }

            let Some(glyph) = glyph(c) else { continue };

            for row in 0..LINE_HEIGHT {
                for col in -1..GLYPH_ADVANCE {
                    if covered(glyph, col, row) {
                        self.plot(x.saturating_add(col), y.saturating_add(row), color);
                    } else if outline.a != 0 && near_glyph(glyph, col, row) {
                        self.plot(x.saturating_add(col), y.saturating_add(row), outline);
                    }
                }
            }

            x = x.saturating_add(GLYPH_ADVANCE);
        }
    }
}
