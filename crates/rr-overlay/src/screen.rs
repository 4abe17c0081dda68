//! Host frame buffers
//!
//! Decoding of the rendered screen for `gui.getpixel`, compositing of the
//! overlay canvas onto a frame, and gd truecolor screenshots.

use crate::canvas::OverlayCanvas;

/// Pixel layout of a host frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 16-bit indices into [`FrameBuffer::palette`]
    Indexed16,
    /// 16-bit 5:6:5
    Rgb565,
    /// 24-bit, bytes in B, G, R order
    Rgb888,
    /// 32-bit `0x00RRGGBB`, bytes in B, G, R, X order
    Rgb32,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Indexed16 | PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb888 => 3,
            PixelFormat::Rgb32 => 4,
        }
    }
}

/// One rendered frame
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub pitch: usize,
    pub data: Vec<u8>,
    /// Palette for [`PixelFormat::Indexed16`]; ignored otherwise
    pub palette: Vec<[u8; 3]>,
}

/// Blend an overlay channel onto a screen channel
#[inline]
fn mix(gui: u8, screen: u8, alpha: u8) -> u8 {
    let (gui, screen, alpha) = (gui as i32, screen as i32, alpha as i32);
    (((gui - screen) * alpha / 255 + screen) & 255) as u8
}

impl FrameBuffer {
    /// A black frame with tightly packed rows
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let pitch = width as usize * format.bytes_per_pixel();
        Self {
            format,
            width,
            height,
            pitch,
            data: vec![0; pitch * height as usize],
            palette: Vec::new(),
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.pitch + x as usize * self.format.bytes_per_pixel()
    }

    #[inline]
    fn read_u16(&self, off: usize) -> u16 {
        u16::from_ne_bytes([self.data[off], self.data[off + 1]])
    }

    fn decode(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let off = self.offset(x, y);
        if off + self.format.bytes_per_pixel() > self.data.len() {
            return None;
        }
        let d = &self.data;
        Some(match self.format {
            PixelFormat::Indexed16 => {
                let index = self.read_u16(off) as usize;
                self.palette.get(index).copied().unwrap_or([0, 0, 0])
            }
            PixelFormat::Rgb565 => {
                let p = self.read_u16(off);
                [
                    ((p >> 8) & 0xF8) as u8,
                    ((p >> 3) & 0xFC) as u8,
                    ((p << 3) & 0xF8) as u8,
                ]
            }
            PixelFormat::Rgb888 | PixelFormat::Rgb32 => [d[off + 2], d[off + 1], d[off]],
        })
    }

    /// `(r, g, b)` at `(x, y)`; black outside the frame
    pub fn get_pixel(&self, x: i32, y: i32) -> (u8, u8, u8) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return (0, 0, 0);
        }
        let [r, g, b] = self.decode(x as u32, y as u32).unwrap_or([0, 0, 0]);
        (r, g, b)
    }

    /// Write an RGB pixel. Indexed frames cannot take arbitrary colors and
    /// are left unchanged; see [`FrameBuffer::promote_to_rgb32`].
    pub fn set_pixel(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let off = self.offset(x, y);
        if off + self.format.bytes_per_pixel() > self.data.len() {
            return;
        }
        match self.format {
            PixelFormat::Indexed16 => {}
            PixelFormat::Rgb565 => {
                let p = ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3);
                self.data[off..off + 2].copy_from_slice(&p.to_ne_bytes());
            }
            PixelFormat::Rgb888 => {
                self.data[off..off + 3].copy_from_slice(&[b, g, r]);
            }
            PixelFormat::Rgb32 => {
                self.data[off..off + 4].copy_from_slice(&[b, g, r, 0]);
            }
        }
    }

    /// Convert an indexed frame to 32-bit RGB through its palette
    pub fn promote_to_rgb32(&mut self) {
        if self.format != PixelFormat::Indexed16 {
            return;
        }
        let mut promoted = FrameBuffer::new(PixelFormat::Rgb32, self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let [r, g, b] = self.decode(x, y).unwrap_or([0, 0, 0]);
                promoted.set_pixel(x, y, r, g, b);
            }
        }
        tracing::debug!("Promoted {}x{} indexed frame to RGB32", self.width, self.height);
        *self = promoted;
    }

    /// Composite the canvas onto this frame. Transparent overlay pixels
    /// are skipped and opaque ones copied.
    pub fn composite(&mut self, canvas: &OverlayCanvas) {
        self.promote_to_rgb32();

        let width = self.width.min(canvas.width());
        let height = self.height.min(canvas.height());
        let stride = canvas.width() as usize;
        let pixels = canvas.pixels();

        for y in 0..height {
            for x in 0..width {
                let Some(&gui) = pixels.get(y as usize * stride + x as usize) else {
                    return;
                };
                match gui.a {
                    0 => {}
                    255 => self.set_pixel(x, y, gui.r, gui.g, gui.b),
                    a => {
                        let (r, g, b) = self.get_pixel(x as i32, y as i32);
                        self.set_pixel(x, y, mix(gui.r, r, a), mix(gui.g, g, a), mix(gui.b, b, a));
                    }
                }
            }
        }
    }

    /// Serialise the frame as a gd truecolor image. Pending overlay
    /// drawing from `canvas` is blended in when given.
    pub fn gd_screenshot(&self, canvas: Option<&OverlayCanvas>) -> Vec<u8> {
        let (w, h) = (self.width.min(u16::MAX as u32), self.height.min(u16::MAX as u32));
        let mut out = Vec::with_capacity(11 + w as usize * h as usize * 4);
        out.extend_from_slice(&[0xFF, 0xFE]);
        out.extend_from_slice(&(w as u16).to_be_bytes());
        out.extend_from_slice(&(h as u16).to_be_bytes());
        out.push(1);
        out.extend_from_slice(&[0xFF; 4]);

        let overlay = canvas.filter(|c| c.has_content());
        for y in 0..h {
            for x in 0..w {
                let (mut r, mut g, mut b) = self.get_pixel(x as i32, y as i32);
                if let Some(gui) = overlay.and_then(|c| c.get(x as i32, y as i32)) {
                    match gui.a {
                        0 => {}
                        255 => (r, g, b) = (gui.r, gui.g, gui.b),
                        a => (r, g, b) = (mix(gui.r, r, a), mix(gui.g, g, a), mix(gui.b, b, a)),
                    }
                }
                out.extend_from_slice(&[0, r, g, b]);
            }
        }
        out
    }
}

/// Composite `canvas` onto `frame` if there is anything to show, then
/// advance the canvas state. Returns whether the frame was touched.
pub fn composite_overlay(frame: &mut FrameBuffer, canvas: &mut OverlayCanvas) -> bool {
    if !canvas.has_content() {
        return false;
    }
    frame.composite(canvas);
    canvas.mark_displayed();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_decode_formats() {
        let mut frame = FrameBuffer::new(PixelFormat::Rgb32, 2, 2);
        frame.set_pixel(1, 0, 10, 20, 30);
        assert_eq!(&frame.data[4..8], &[30, 20, 10, 0]);
        assert_eq!(frame.get_pixel(1, 0), (10, 20, 30));

        let mut frame = FrameBuffer::new(PixelFormat::Rgb888, 2, 2);
        frame.set_pixel(1, 1, 1, 2, 3);
        assert_eq!(frame.get_pixel(1, 1), (1, 2, 3));

        let mut frame = FrameBuffer::new(PixelFormat::Rgb565, 2, 2);
        frame.set_pixel(0, 0, 0xFF, 0xFF, 0xFF);
        assert_eq!(frame.get_pixel(0, 0), (0xF8, 0xFC, 0xF8));
    }

    #[test]
    fn test_out_of_bounds_is_black() {
        let mut frame = FrameBuffer::new(PixelFormat::Rgb32, 2, 2);
        frame.data.iter_mut().for_each(|b| *b = 0xFF);
        assert_eq!(frame.get_pixel(-1, 0), (0, 0, 0));
        assert_eq!(frame.get_pixel(2, 0), (0, 0, 0));
        assert_eq!(frame.get_pixel(1, 1), (0xFF, 0xFF, 0xFF));
    }

    #[test]
    fn test_indexed_palette_and_promotion() {
        let mut frame = FrameBuffer::new(PixelFormat::Indexed16, 2, 1);
        frame.palette = vec![[0, 0, 0], [200, 100, 50]];
        frame.data[2..4].copy_from_slice(&1u16.to_ne_bytes());
        assert_eq!(frame.get_pixel(1, 0), (200, 100, 50));

        frame.promote_to_rgb32();
        assert_eq!(frame.format, PixelFormat::Rgb32);
        assert_eq!(frame.get_pixel(1, 0), (200, 100, 50));
    }

    #[test]
    fn test_composite() {
        let mut frame = FrameBuffer::new(PixelFormat::Rgb32, 3, 1);
        frame.set_pixel(2, 0, 100, 100, 100);

        let mut canvas = OverlayCanvas::new(3, 1);
        canvas.draw_pixel(0, 0, Color::new(255, 0, 0, 255));
        canvas.draw_pixel(2, 0, Color::new(200, 0, 100, 128));

        assert!(composite_overlay(&mut frame, &mut canvas));
        assert_eq!(frame.get_pixel(0, 0), (255, 0, 0));
        assert_eq!(frame.get_pixel(1, 0), (0, 0, 0));
        // (200 - 100) * 128 / 255 + 100 = 150
        assert_eq!(frame.get_pixel(2, 0), (150, 50, 100));
    }

    #[test]
    fn test_composite_skips_clear_or_disabled() {
        let mut frame = FrameBuffer::new(PixelFormat::Rgb32, 1, 1);
        let mut canvas = OverlayCanvas::new(1, 1);
        assert!(!composite_overlay(&mut frame, &mut canvas));

        canvas.draw_pixel(0, 0, Color::WHITE);
        canvas.set_enabled(false);
        assert!(!composite_overlay(&mut frame, &mut canvas));
        assert_eq!(frame.get_pixel(0, 0), (0, 0, 0));
    }

    #[test]
    fn test_gd_screenshot() {
        let mut frame = FrameBuffer::new(PixelFormat::Rgb32, 2, 1);
        frame.set_pixel(0, 0, 1, 2, 3);
        let mut canvas = OverlayCanvas::new(2, 1);
        canvas.draw_pixel(1, 0, Color::new(9, 9, 9, 255));

        let shot = frame.gd_screenshot(Some(&canvas));
        assert_eq!(&shot[..11], &[0xFF, 0xFE, 0, 2, 0, 1, 1, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&shot[11..], &[0, 1, 2, 3, 0, 9, 9, 9]);

        let plain = frame.gd_screenshot(None);
        assert_eq!(&plain[15..], &[0, 0, 0, 0]);
    }
}
