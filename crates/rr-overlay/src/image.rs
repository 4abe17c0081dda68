//! Raw gd image blitting
//!
//! Images arrive as gd's uncompressed serialisation (what `gd` bindings
//! return from `gdStr()`): a big-endian header followed by either 32-bit
//! truecolor pixels or a 256-entry palette and 8-bit indices. gd alpha runs
//! from 0 (opaque) to 127 (transparent).

use crate::canvas::OverlayCanvas;
use crate::color::Color;
use rr_core::OverlayError;

const MAGIC: u8 = 0xFF;
const TRUECOLOR_TAG: u8 = 0xFE;
const PALETTE_TAG: u8 = 0xFF;
const PALETTE_SIZE: usize = 256;

#[derive(Debug, Clone)]
enum GdPixels<'a> {
    /// `[alpha, r, g, b]` per pixel
    TrueColor(&'a [u8]),
    /// `[r, g, b, alpha]` per entry, then one index per pixel
    Palette { entries: &'a [u8], indices: &'a [u8] },
}

/// A parsed gd image borrowing the script's byte string
#[derive(Debug, Clone)]
pub struct GdImage<'a> {
    width: u16,
    height: u16,
    pixels: GdPixels<'a>,
}

/// Cursor over the header fields
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], OverlayError> {
        let end = self.pos + n;
        let slice = self.data.get(self.pos..end).ok_or(OverlayError::TruncatedImage {
            needed: end,
            actual: self.data.len(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, OverlayError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, OverlayError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}

impl<'a> GdImage<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, OverlayError> {
        let mut r = Reader { data, pos: 0 };

        if r.u8()? != MAGIC {
            return Err(OverlayError::BadImageData);
        }
        let truecolor = match r.u8()? {
            TRUECOLOR_TAG => true,
            PALETTE_TAG => false,
            _ => return Err(OverlayError::BadImageData),
        };
        let width = r.u16()?;
        let height = r.u16()?;
        let flag = r.u8()?;
        if truecolor != (flag != 0) {
            return Err(OverlayError::BadImageData);
        }
        if !truecolor {
            let _colors_total = r.u16()?;
        }
        let _transparent = r.take(4)?;

        let count = width as usize * height as usize;
        let pixels = if truecolor {
            GdPixels::TrueColor(r.take(count * 4)?)
        } else {
            let entries = r.take(PALETTE_SIZE * 4)?;
            GdPixels::Palette {
                entries,
                indices: r.take(count)?,
            }
        };

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_truecolor(&self) -> bool {
        matches!(self.pixels, GdPixels::TrueColor(_))
    }

    /// Pixel at `(x, y)` with gd alpha mapped through `opacity`
    fn pixel(&self, x: usize, y: usize, opacity: &[u8; 256]) -> Color {
        let idx = y * self.width as usize + x;
        match self.pixels {
            GdPixels::TrueColor(data) => {
                let p = &data[idx * 4..idx * 4 + 4];
                Color::new(p[1], p[2], p[3], opacity[p[0] as usize])
            }
            GdPixels::Palette { entries, indices } => {
                let e = indices[idx] as usize * 4;
                Color::new(
                    entries[e],
                    entries[e + 1],
                    entries[e + 2],
                    opacity[entries[e + 3] as usize],
                )
            }
        }
    }
}

/// Where and how to blit an image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blit {
    pub dst_x: i32,
    pub dst_y: i32,
    /// Source rectangle `(x, y, width, height)`; the whole image when unset
    pub src: Option<(i32, i32, i32, i32)>,
    /// Extra alpha multiplier on top of the canvas opacity
    pub alpha: f64,
}

impl Default for Blit {
    fn default() -> Self {
        Self {
            dst_x: 0,
            dst_y: 0,
            src: None,
            alpha: 1.0,
        }
    }
}

/// Map gd alpha (0 opaque ..= 127 transparent) to 8-bit alpha scaled by
/// `alpha_mul / 255`. Values above 127 are treated as transparent.
fn opacity_map(alpha_mul: i32) -> [u8; 256] {
    let mut map = [0u8; 256];
    for (i, slot) in map.iter_mut().enumerate().take(128) {
        let opac = 255 - ((i << 1) | (i & 1)) as i32;
        *slot = (opac * alpha_mul / 255).clamp(0, 255) as u8;
    }
    map
}

impl OverlayCanvas {
    /// Blit `image`, clipping the source rectangle to the image and the
    /// destination to the canvas. Nothing is drawn when the clipped region
    /// is empty or the effective alpha is zero.
    pub fn draw_image(&mut self, image: &GdImage<'_>, blit: &Blit) {
        let alpha_mul = (self.opacity() as f64 * blit.alpha) as i32;
        if alpha_mul <= 0 {
            return;
        }

        // script coordinates may be anywhere in i32, clip in i64
        let (img_w, img_h) = (i64::from(image.width()), i64::from(image.height()));
        let (mut sx, mut sy, mut w, mut h) = match blit.src {
            Some((x, y, w, h)) => (i64::from(x), i64::from(y), i64::from(w), i64::from(h)),
            None => (0, 0, img_w, img_h),
        };
        let (mut dx, mut dy) = (i64::from(blit.dst_x), i64::from(blit.dst_y));

        if sx < 0 {
            w += sx;
            dx -= sx;
            sx = 0;
        }
        if sy < 0 {
            h += sy;
            dy -= sy;
            sy = 0;
        }
        w = w.min(img_w - sx);
        h = h.min(img_h - sy);
        if dx < 0 {
            w += dx;
            sx -= dx;
            dx = 0;
        }
        if dy < 0 {
            h += dy;
            sy -= dy;
            dy = 0;
        }
        w = w.min(i64::from(self.width()) - dx);
        h = h.min(i64::from(self.height()) - dy);
        if w <= 0 || h <= 0 {
            return;
        }

        let opacity = opacity_map(alpha_mul);
        self.prepare();

        for row in 0..h {
            for col in 0..w {
                let src = image.pixel((sx + col) as usize, (sy + row) as usize, &opacity);
                self.plot((dx + col) as i32, (dy + row) as i32, src);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truecolor(width: u16, height: u16, pixel: [u8; 4]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xFE];
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.push(1);
        data.extend_from_slice(&[0xFF; 4]);
        for _ in 0..width as usize * height as usize {
            data.extend_from_slice(&pixel);
        }
        data
    }

    fn palette(width: u16, height: u16, entry: [u8; 4]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xFF];
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.push(0);
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&[0xFF; 4]);
        for i in 0..PALETTE_SIZE {
            if i == 3 {
                data.extend_from_slice(&entry);
            } else {
                data.extend_from_slice(&[0, 0, 0, 127]);
            }
        }
        data.extend(std::iter::repeat(3u8).take(width as usize * height as usize));
        data
    }

    #[test]
    fn test_parse_header() {
        let data = truecolor(3, 2, [0, 1, 2, 3]);
        let img = GdImage::parse(&data).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        assert!(img.is_truecolor());

        let data = palette(2, 2, [9, 8, 7, 0]);
        assert!(!GdImage::parse(&data).unwrap().is_truecolor());
    }

    #[test]
    fn test_parse_rejects_bad_data() {
        assert_eq!(GdImage::parse(b"PNG..").unwrap_err(), OverlayError::BadImageData);

        let mut data = truecolor(1, 1, [0; 4]);
        data[6] = 0;
        assert_eq!(GdImage::parse(&data).unwrap_err(), OverlayError::BadImageData);

        let data = truecolor(4, 4, [0; 4]);
        assert!(matches!(
            GdImage::parse(&data[..20]),
            Err(OverlayError::TruncatedImage { .. })
        ));
    }

    #[test]
    fn test_opacity_map() {
        let map = opacity_map(255);
        assert_eq!(map[0], 255);
        assert_eq!(map[127], 0);
        assert_eq!(map[200], 0);
        assert_eq!(opacity_map(127)[0], 127);
    }

    #[test]
    fn test_blit_truecolor() {
        let data = truecolor(2, 2, [0, 10, 20, 30]);
        let img = GdImage::parse(&data).unwrap();
        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_image(&img, &Blit { dst_x: 3, dst_y: 4, ..Blit::default() });

        assert_eq!(canvas.get(3, 4), Some(Color::new(10, 20, 30, 255)));
        assert_eq!(canvas.get(4, 5), Some(Color::new(10, 20, 30, 255)));
        assert_eq!(canvas.get(5, 5).map(|c| c.a), Some(0));
    }

    #[test]
    fn test_blit_palette() {
        let data = palette(1, 1, [9, 8, 7, 0]);
        let img = GdImage::parse(&data).unwrap();
        let mut canvas = OverlayCanvas::new(2, 2);
        canvas.draw_image(&img, &Blit::default());
        assert_eq!(canvas.get(0, 0), Some(Color::new(9, 8, 7, 255)));
    }

    #[test]
    fn test_blit_clips_to_canvas() {
        let data = truecolor(4, 4, [0, 1, 1, 1]);
        let img = GdImage::parse(&data).unwrap();
        let mut canvas = OverlayCanvas::new(3, 3);
        canvas.draw_image(&img, &Blit { dst_x: -2, dst_y: 1, ..Blit::default() });

        let drawn = canvas.pixels().iter().filter(|p| p.a != 0).count();
        assert_eq!(drawn, 2 * 2);
        assert_eq!(canvas.get(2, 1).map(|c| c.a), Some(0));
    }

    #[test]
    fn test_blit_source_rect_and_empty_region() {
        let data = truecolor(4, 4, [0, 1, 1, 1]);
        let img = GdImage::parse(&data).unwrap();

        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_image(&img, &Blit { src: Some((1, 1, 10, 2)), ..Blit::default() });
        assert_eq!(canvas.pixels().iter().filter(|p| p.a != 0).count(), 3 * 2);

        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_image(&img, &Blit { dst_x: 20, ..Blit::default() });
        canvas.draw_image(&img, &Blit { alpha: 0.0, ..Blit::default() });
        assert!(canvas.pixels().is_empty());
    }

    #[test]
    fn test_blit_extreme_coordinates() {
        let data = truecolor(4, 4, [0, 1, 1, 1]);
        let img = GdImage::parse(&data).unwrap();
        let mut canvas = OverlayCanvas::new(8, 8);
        canvas.draw_image(&img, &Blit { dst_x: i32::MIN, dst_y: i32::MAX, ..Blit::default() });
        canvas.draw_image(
            &img,
            &Blit {
                dst_x: i32::MIN,
                src: Some((i32::MAX, i32::MIN, i32::MIN, i32::MAX)),
                ..Blit::default()
            },
        );
        assert_eq!(canvas.pixels().iter().filter(|p| p.a != 0).count(), 0);
    }
}
