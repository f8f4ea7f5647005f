use std::path::Path;

use glam::{Vec2, Vec4};

use crate::error::PassError;
use crate::target::ViewportSize;

/// Texture lookups with clamp-to-edge addressing. `uv` `(0,0)` is the
/// top-left corner of the image.
pub trait Sampler2d {
    /// Bilinear lookup.
    fn sample(&self, uv: Vec2) -> Vec4;

    /// Nearest-texel lookup.
    fn sample_nearest(&self, uv: Vec2) -> Vec4;
}

/// An RGBA8 image, the software executor's render target.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Image {
    pub fn new(size: ViewportSize, clear: [f32; 4]) -> Self {
        let texel = encode(Vec4::from(clear));
        Self {
            width: size.width,
            height: size.height,
            pixels: vec![texel; size.width as usize * size.height as usize],
        }
    }

    pub fn size(&self) -> ViewportSize {
        ViewportSize::new(self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fill(&mut self, color: [f32; 4]) {
        let texel = encode(Vec4::from(color));
        self.pixels.fill(texel);
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[self.index(x, y)]
    }

    /// The pixel at `(x, y)` as normalized floats.
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        decode(self.pixel(x, y))
    }

    pub fn put(&mut self, x: u32, y: u32, color: Vec4) {
        let index = self.index(x, y);
        self.pixels[index] = encode(color);
    }

    /// Texture coordinate of the center of pixel `(x, y)`.
    pub fn uv(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.as_bytes().to_vec())
    }

    /// Writes the image as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), PassError> {
        let path = path.as_ref();
        let Some(image) = self.to_rgba_image() else {
            return Err(PassError::Io(std::io::Error::other(format!(
                "image buffer does not match {}x{}",
                self.width, self.height
            ))));
        };
        image.save(path)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn clamped(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.texel(x, y)
    }
}

impl Sampler2d for Image {
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ZERO;
        }
        let px = uv.x * self.width as f32 - 0.5;
        let py = uv.y * self.height as f32 - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let tx = px - x0;
        let ty = py - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top = self.clamped(x0, y0).lerp(self.clamped(x0 + 1, y0), tx);
        let bottom = self
            .clamped(x0, y0 + 1)
            .lerp(self.clamped(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }

    fn sample_nearest(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ZERO;
        }
        let x = (uv.x * self.width as f32).floor() as i64;
        let y = (uv.y * self.height as f32).floor() as i64;
        self.clamped(x, y)
    }
}

fn encode(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

fn decode(texel: [u8; 4]) -> Vec4 {
    Vec4::new(
        texel[0] as f32,
        texel[1] as f32,
        texel[2] as f32,
        texel[3] as f32,
    ) / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn values_are_clamped_on_store() {
        let mut image = Image::new(ViewportSize::new(1, 1), [0.0; 4]);
        image.put(0, 0, Vec4::new(2.0, -1.0, 0.5, 1.0));
        assert_eq!(image.pixel(0, 0), [255, 0, 128, 255]);
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let mut image = Image::new(ViewportSize::new(2, 1), [0.0, 0.0, 0.0, 1.0]);
        image.put(1, 0, Vec4::ONE);
        let mid = image.sample(Vec2::new(0.5, 0.5));
        assert_relative_eq!(mid.x, 0.5);
        // Beyond the edge clamps to the last texel.
        assert_relative_eq!(image.sample(Vec2::new(1.5, 0.5)).x, 1.0);
    }

    #[test]
    fn nearest_picks_containing_texel() {
        let mut image = Image::new(ViewportSize::new(2, 2), [0.0; 4]);
        image.put(1, 1, Vec4::ONE);
        assert_eq!(image.sample_nearest(Vec2::new(0.75, 0.75)), Vec4::ONE);
        assert_eq!(image.sample_nearest(Vec2::new(0.25, 0.75)), Vec4::ZERO);
    }

    #[test]
    fn converts_to_rgba_image() {
        let image = Image::new(ViewportSize::new(3, 2), [1.0, 0.0, 0.0, 1.0]);
        let rgba = image.to_rgba_image().unwrap();
        assert_eq!(rgba.dimensions(), (3, 2));
        assert_eq!(rgba.get_pixel(2, 1).0, [255, 0, 0, 255]);
    }
}
