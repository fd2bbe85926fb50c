//! Image primitives for the recognition pipeline.
//!
//! Captures are held as a lightweight owned RGB type (`OwnedImage`) that is
//! optimized for repeated cropping: most pipeline steps borrow a view
//! (`Image<'a>`) instead of copying pixels, and only materialize an owned
//! image at the grayscale conversion boundary.

use anyhow::{Context, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an `OwnedImage` from tightly packed RGBA bytes (alpha is
    /// discarded; captures are opaque).
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width / 4;
        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    /// Convert from a decoded RGBA bitmap, flattening alpha onto white.
    ///
    /// Sprite cells can carry transparency; identification treats those
    /// pixels as paper-white, matching how complete cards render.
    pub fn from_rgba_image(image: &image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                let a = u16::from(a);
                let flat = |c: u8| (((u16::from(c) * a) + 255 * (255 - a)) / 255) as u8;
                Color::new(flat(r), flat(g), flat(b))
            })
            .collect();

        Self {
            width,
            height,
            data,
        }
    }

    /// Decode an image file into an `OwnedImage`.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let img = image::open(path.as_ref())
            .with_context(|| format!("decode {:?}", path.as_ref()))?
            .to_rgba8();
        Ok(Self::from_rgba_image(&img))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Downscale to the given height if taller (preserving aspect ratio).
    ///
    /// Uses `fast_image_resize` (SIMD-optimized); large desktop captures are
    /// the common case and this runs before every recognition pass.
    pub fn clamp_height(&mut self, max_height: u32) {
        if self.height <= max_height {
            return;
        }

        let height = max_height.max(1);
        let width = (self.width as u64 * height as u64 / self.height.max(1) as u64).max(1) as u32;

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is
        // layout-compatible with `fast_image_resize::pixels::U8x3`
        // (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src =
            fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
                .expect("fast_image_resize: ImageRef::from_pixels failed");

        let mut dst = fast_image_resize::images::Image::new(
            width,
            height,
            fast_image_resize::PixelType::U8x3,
        );

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &Some(options))
            .expect("fast_image_resize: resize failed");

        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        self.width = width;
        self.height = height;
        self.data = data;
    }

    /// Create a borrowed view of this entire image.
    pub fn as_image(&self) -> Image<'_> {
        Image {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        use image::{GrayImage, Luma};
        let mut out = GrayImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.data[(x + y * self.width) as usize];
                out.put_pixel(x, y, Luma([c.luma()]));
            }
        }
        out
    }
}

// ----------

/// Borrowed rectangular view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    fn pixel(&self, x: u32, y: u32) -> &Color {
        &self.data[(x + y * self.true_width) as usize]
    }

    /// Create an arbitrary subview (coordinates relative to this view,
    /// clamped to its bounds).
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);

        Self {
            x1: self.x1 + x,
            y1: self.y1 + y,
            x2: self.x1 + x + width,
            y2: self.y1 + y + height,
            true_width: self.true_width,
            data: self.data,
        }
    }

    /// The top-left `frac` x `frac` sub-rectangle.
    ///
    /// Identification compares card corners, where the rank/suit glyph sits;
    /// the rest of the card is decorative.
    pub fn corner(&self, frac: f32) -> Self {
        let w = ((self.width() as f32 * frac) as u32).max(1);
        let h = ((self.height() as f32 * frac) as u32).max(1);
        self.sub_image(0, 0, w, h)
    }

    /// Grayscale copy of this view.
    pub fn to_gray_image(&self) -> image::GrayImage {
        use image::{GrayImage, Luma};
        let mut out = GrayImage::new(self.width(), self.height());
        for y in 0..self.height() {
            for x in 0..self.width() {
                let c = self.pixel(self.x1 + x, self.y1 + y);
                out.put_pixel(x, y, Luma([c.luma()]));
            }
        }
        out
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
        let mut i = 0;
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                bytes[i] = clr.r;
                bytes[i + 1] = clr.g;
                bytes[i + 2] = clr.b;
                i += 3;
            }
        }
        bytes
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}
