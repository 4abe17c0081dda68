//! Overlay canvas
//!
//! An off-screen RGBA buffer the size of the visible screen. Drawing calls
//! accumulate here and the host composites the result onto each rendered
//! frame.

use crate::color::Color;

/// Canvas usage state
///
/// `Clear` means nothing to composite. Draw calls move the canvas to
/// `UsedSinceLastDisplay`, wiping the alpha channel first unless it was
/// already in that state. Compositing moves it to `UsedSinceLastFrame`, so
/// the next draw starts from an empty canvas again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasState {
    #[default]
    Clear,
    UsedSinceLastDisplay,
    UsedSinceLastFrame,
}

/// Alpha-blend `src` over `dst`
#[inline]
pub fn blend(dst: &mut Color, src: Color) {
    let a = src.a as u32;
    if a == 255 || dst.a == 0 {
        *dst = src;
    } else if a == 0 {
        // nothing to draw
    } else {
        let a_dst = ((255 - a) * dst.a as u32 + 128) / 255;
        let a_new = a + a_dst;
        let mix = |d: u8, s: u8| ((d as u32 * a_dst + s as u32 * a + a_new / 2) / a_new) as u8;

        dst.r = mix(dst.r, src.r);
        dst.g = mix(dst.g, src.g);
        dst.b = mix(dst.b, src.b);
        dst.a = a_new as u8;
    }
}

/// Off-screen drawing buffer
#[derive(Debug)]
pub struct OverlayCanvas {
    width: u32,
    height: u32,
    /// Allocated on the first draw
    pixels: Vec<Color>,
    state: CanvasState,
    /// Alpha multiplier applied to every resolved color, 255 = unchanged
    opacity: u32,
    /// Whether composited output stays live between frames
    persist: bool,
    enabled: bool,
}

impl OverlayCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Vec::new(),
            state: CanvasState::Clear,
            opacity: 255,
            persist: true,
            enabled: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_persist(&mut self, persist: bool) {
        self.persist = persist;
    }

    /// Match the canvas to the screen resolution. A change drops the
    /// buffer and anything drawn on it.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        tracing::debug!(
            "Overlay canvas resized {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );
        self.width = width;
        self.height = height;
        self.pixels = Vec::new();
        self.state = CanvasState::Clear;
    }

    /// Make the buffer ready for a draw call
    pub fn prepare(&mut self) {
        let len = self.width as usize * self.height as usize;
        if self.pixels.len() != len {
            self.pixels = vec![Color::CLEAR; len];
        }
        if self.state != CanvasState::UsedSinceLastDisplay {
            for px in self.pixels.iter_mut() {
                px.a = 0;
            }
        }
        self.state = CanvasState::UsedSinceLastDisplay;
    }

    /// Discard uncommitted drawing
    pub fn clear(&mut self) {
        self.state = CanvasState::Clear;
    }

    /// Whether the host has anything to composite
    pub fn has_content(&self) -> bool {
        self.enabled && self.state != CanvasState::Clear && !self.pixels.is_empty()
    }

    /// Record that the canvas was composited onto a frame
    pub fn mark_displayed(&mut self) {
        self.state = if self.persist {
            CanvasState::UsedSinceLastFrame
        } else {
            CanvasState::Clear
        };
    }

    // Opacity

    pub fn opacity(&self) -> u32 {
        self.opacity
    }

    /// Set the modifier from a 0.0..=1.0 opacity (values above 1.0 boost)
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = (opacity * 255.0).max(0.0) as u32;
    }

    /// Set the modifier from a 0 (opaque) ..= 4 (invisible) transparency
    pub fn set_transparency(&mut self, transparency: f64) {
        self.opacity = ((4.0 - transparency) / 4.0 * 255.0).max(0.0) as u32;
    }

    pub fn reset_opacity(&mut self) {
        self.opacity = 255;
    }

    /// Apply the opacity modifier to a resolved color
    pub fn apply_opacity(&self, color: Color) -> Color {
        color.scaled_alpha(self.opacity)
    }

    // Pixel access

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Pixel at `(x, y)`, `None` outside the canvas or before the first draw
    pub fn get(&self, x: i32, y: i32) -> Option<Color> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Blend one pixel; coordinates outside the canvas are ignored
    #[inline]
    pub(crate) fn plot(&mut self, x: i32, y: i32, color: Color) {
        if self.in_bounds(x, y) {
            let idx = y as usize * self.width as usize + x as usize;
            if let Some(px) = self.pixels.get_mut(idx) {
                blend(px, color);
            }
        }
    }

    fn plot_wide(&mut self, x: i64, y: i64, color: Color) {
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            self.plot(x, y, color);
        }
    }

    /// Raw pixels, row-major
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Raw pixels as RGBA bytes, for uploading to a texture
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    // Drawing

    pub fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.prepare();
        self.plot(x, y, color);
    }

    /// Line from `(x1, y1)` to `(x2, y2)`. With `skip_first` the starting
    /// point is left untouched so chained segments do not blend their
    /// shared vertex twice.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color, skip_first: bool) {
        self.prepare();
        let (w, h) = (self.width as i32, self.height as i32);
        if x1.max(x2) < 0 || y1.max(y2) < 0 || x1.min(x2) >= w || y1.min(y2) >= h {
            return;
        }
        self.line(x2, y2, x1, y1, !skip_first, color);
    }

    /// Box with a one pixel outline. The interior is filled only when it is
    /// at least one pixel wide and tall.
    pub fn draw_box(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, fill: Color, outline: Color) {
        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));

        self.prepare();
        self.outline(x1, y1, x2, y2, outline);
        if i64::from(x2) - i64::from(x1) >= 2 && i64::from(y2) - i64::from(y1) >= 2 {
            self.fill(x1 + 1, y1 + 1, x2 - 1, y2 - 1, fill);
        }
    }

    /// Integer line walk ending at `(x1, y1)`, starting next to
    /// `(x2, y2)`; `last_pixel` also plots `(x2, y2)` itself.
    pub(crate) fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, last_pixel: bool, color: Color) {
        let (x1, y1) = (i64::from(x1), i64::from(y1));
        let (mut x2, mut y2) = (i64::from(x2), i64::from(y2));
        let mut dx = x1 - x2;
        let mut dy = y1 - y2;
        if dx == 0 && dy == 0 {
            self.plot_wide(x1, y1, color);
            return;
        }

        let swapped_x = dx < 0;
        let swapped_y = dy < 0;
        dx = dx.abs();
        dy = dy.abs();
        let delta_x = dx << 1;
        let delta_y = dy << 1;
        let ix = if x1 > x2 { 1 } else { -1 };
        let iy = if y1 > y2 { 1 } else { -1 };

        if last_pixel {
            self.plot_wide(x2, y2, color);
        }

        if delta_x >= delta_y {
            let mut error = delta_y - (delta_x >> 1);
            while x2 != x1 {
                if error == 0 && !swapped_x {
                    self.plot_wide(x2 + ix, y2, color);
                }
                if error >= 0 && (error != 0 || ix > 0) {
                    y2 += iy;
                    error -= delta_x;
                }
                x2 += ix;
                self.plot_wide(x2, y2, color);
                if error == 0 && swapped_x {
                    self.plot_wide(x2, y2 + iy, color);
                }
                error += delta_y;
            }
        } else {
            let mut error = delta_x - (delta_y >> 1);
            while y2 != y1 {
                if error == 0 && !swapped_y {
                    self.plot_wide(x2, y2 + iy, color);
                }
                if error >= 0 && (error != 0 || iy > 0) {
                    x2 += ix;
                    error -= delta_y;
                }
                y2 += iy;
                self.plot_wide(x2, y2, color);
                if error == 0 && swapped_y {
                    self.plot_wide(x2 + ix, y2, color);
                }
                error += delta_x;
            }
        }
    }

    /// Rectangle outline, edges pulled in to one pixel outside the canvas
    fn outline(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) {
        let (w, h) = (self.width as i32, self.height as i32);
        let x1 = x1.clamp(-1, w);
        let y1 = y1.clamp(-1, h);
        let x2 = x2.clamp(-1, w);
        let y2 = y2.clamp(-1, h);

        self.line(x1, y1, x2, y1, true, color);
        self.line(x1, y2, x2, y2, true, color);
        self.line(x1, y1, x1, y2, true, color);
        self.line(x2, y1, x2, y2, true, color);
    }

    /// Filled rectangle, inclusive, clamped to the canvas
    fn fill(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(self.width as i32 - 1);
        let y2 = y2.min(self.height as i32 - 1);

        let stride = self.width as usize;
        for y in y1..=y2 {
            let row = y as usize * stride;
            for x in x1..=x2 {
                blend(&mut self.pixels[row + x as usize], color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_drawn(canvas: &OverlayCanvas) -> usize {
        canvas.pixels().iter().filter(|p| p.a != 0).count()
    }

    #[test]
    fn test_blend_extremes() {
        let mut dst = Color::new(10, 20, 30, 200);
        blend(&mut dst, Color::new(1, 2, 3, 0));
        assert_eq!(dst, Color::new(10, 20, 30, 200));

        blend(&mut dst, Color::new(1, 2, 3, 255));
        assert_eq!(dst, Color::new(1, 2, 3, 255));

        let mut empty = Color::new(9, 9, 9, 0);
        blend(&mut empty, Color::new(100, 0, 0, 50));
        assert_eq!(empty, Color::new(100, 0, 0, 50));
    }

    #[test]
    fn test_blend_half() {
        let mut dst = Color::new(0, 0, 0, 255);
        blend(&mut dst, Color::new(255, 255, 255, 128));
        // a_dst = (127 * 255 + 128) / 255 = 127
        assert_eq!(dst.a, 255);
        assert_eq!(dst.r, 128);
    }

    #[test]
    fn test_state_machine() {
        let mut canvas = OverlayCanvas::new(4, 4);
        assert_eq!(canvas.state(), CanvasState::Clear);
        assert!(!canvas.has_content());

        canvas.draw_pixel(1, 1, Color::WHITE);
        assert_eq!(canvas.state(), CanvasState::UsedSinceLastDisplay);
        assert!(canvas.has_content());

        canvas.mark_displayed();
        assert_eq!(canvas.state(), CanvasState::UsedSinceLastFrame);
        assert_eq!(count_drawn(&canvas), 1);

        // the next draw starts a fresh canvas
        canvas.draw_pixel(2, 2, Color::WHITE);
        assert_eq!(count_drawn(&canvas), 1);
        assert_eq!(canvas.get(1, 1).map(|c| c.a), Some(0));

        canvas.clear();
        assert!(!canvas.has_content());
    }

    #[test]
    fn test_no_persist() {
        let mut canvas = OverlayCanvas::new(4, 4);
        canvas.set_persist(false);
        canvas.draw_pixel(0, 0, Color::WHITE);
        canvas.mark_displayed();
        assert_eq!(canvas.state(), CanvasState::Clear);
    }

    #[test]
    fn test_out_of_bounds_pixel_ignored() {
        let mut canvas = OverlayCanvas::new(4, 4);
        canvas.draw_pixel(-1, 0, Color::WHITE);
        canvas.draw_pixel(4, 0, Color::WHITE);
        canvas.draw_pixel(0, 100, Color::WHITE);
        assert_eq!(count_drawn(&canvas), 0);
        assert_eq!(canvas.get(-1, 0), None);
    }

    #[test]
    fn test_line_endpoints() {
        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_line(0, 0, 5, 0, Color::WHITE, false);
        assert_eq!(count_drawn(&canvas), 6);

        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_line(0, 0, 5, 0, Color::WHITE, true);
        assert_eq!(count_drawn(&canvas), 5);
        assert_eq!(canvas.get(0, 0).map(|c| c.a), Some(0));
        assert_eq!(canvas.get(5, 0).map(|c| c.a), Some(255));
    }

    #[test]
    fn test_diagonal_line() {
        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_line(0, 0, 3, 3, Color::WHITE, false);
        for i in 0..4 {
            assert_eq!(canvas.get(i, i).map(|c| c.a), Some(255));
        }
        assert_eq!(count_drawn(&canvas), 4);
    }

    #[test]
    fn test_small_box_has_no_fill() {
        let fill = Color::new(0, 0, 255, 255);
        let outline = Color::new(255, 0, 0, 255);

        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_box(1, 1, 2, 5, fill, outline);
        assert!(canvas.pixels().iter().all(|p| *p != fill));
        assert_eq!(canvas.get(1, 3), Some(outline));

        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_box(5, 5, 1, 1, fill, outline);
        assert_eq!(canvas.get(3, 3), Some(fill));
        assert_eq!(canvas.get(1, 1), Some(outline));
        assert_eq!(canvas.get(5, 3), Some(outline));
        assert_eq!(canvas.get(6, 6).map(|c| c.a), Some(0));
    }

    #[test]
    fn test_box_clamped_to_canvas() {
        let mut canvas = OverlayCanvas::new(4, 4);
        canvas.draw_box(-10, -10, 10, 10, Color::WHITE, Color::BLACK);
        // outline runs just outside the canvas, the fill covers all of it
        assert!(canvas.pixels().iter().all(|p| *p == Color::WHITE));
    }

    #[test]
    fn test_extreme_coordinates_are_clipped() {
        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_box(i32::MIN, 0, i32::MAX, 10, Color::WHITE, Color::BLACK);
        assert_eq!(canvas.get(3, 0), Some(Color::BLACK));
        assert_eq!(canvas.get(3, 5), Some(Color::WHITE));

        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_box(i32::MAX - 1, i32::MAX - 1, i32::MAX, i32::MAX, Color::WHITE, Color::BLACK);
        canvas.draw_line(i32::MIN, 3, i32::MIN + 5, 3, Color::WHITE, false);
        canvas.draw_text(i32::MAX - 1, 0, b"ab", Color::WHITE, Color::BLACK);
        canvas.draw_text(i32::MIN, 0, b"ab", Color::WHITE, Color::BLACK);
        assert!(canvas.pixels().iter().all(|p| p.a == 0));
    }

    #[test]
    fn test_opacity_modifier() {
        let mut canvas = OverlayCanvas::new(1, 1);
        canvas.set_opacity(0.5);
        assert_eq!(canvas.opacity(), 127);
        canvas.set_transparency(4.0);
        assert_eq!(canvas.apply_opacity(Color::WHITE).a, 0);
        canvas.set_transparency(0.0);
        assert_eq!(canvas.opacity(), 255);
        canvas.set_opacity(-1.0);
        assert_eq!(canvas.opacity(), 0);
        canvas.reset_opacity();
        assert_eq!(canvas.apply_opacity(Color::WHITE), Color::WHITE);
    }

    #[test]
    fn test_resize_drops_content() {
        let mut canvas = OverlayCanvas::new(4, 4);
        canvas.draw_pixel(0, 0, Color::WHITE);
        canvas.resize(4, 4);
        assert!(canvas.has_content());
        canvas.resize(8, 2);
        assert!(!canvas.has_content());
        canvas.draw_pixel(7, 1, Color::WHITE);
        assert_eq!(canvas.pixels().len(), 16);
    }
}
