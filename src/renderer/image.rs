use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use image::{Rgba32FImage, RgbaImage};

use crate::foundation::core::Resolution;
use crate::foundation::error::{SceneportError, SceneportResult};

/// Render pass kinds that can be fetched from a renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassType {
    /// Beauty pass.
    Combined,
    /// Depth.
    Z,
    /// Shading normals.
    Normal,
    /// Diffuse lighting.
    Diffuse,
    /// Specular lighting.
    Specular,
}

/// Linear RGBA float image fetched from the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA samples (`width * height * 4`).
    pub pixels: Vec<f32>,
    /// Fraction of the image rendered so far, in `[0, 1]`.
    pub progress: f32,
}

impl RenderImage {
    /// Uniformly filled image.
    pub fn filled(size: Resolution, rgba: [f32; 4], progress: f32) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(size.pixel_count() * 4)
            .collect();
        Self {
            width: size.width,
            height: size.height,
            pixels,
            progress,
        }
    }

    /// Image size.
    pub fn size(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    fn to_buffer(&self) -> SceneportResult<Rgba32FImage> {
        Rgba32FImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or_else(|| {
            SceneportError::renderer(format!(
                "image buffer of {} samples does not match {}x{}",
                self.pixels.len(),
                self.width,
                self.height
            ))
        })
    }

    /// Resample to `size` (bilinear). Same-size requests return a copy.
    pub fn resized(&self, size: Resolution) -> SceneportResult<Self> {
        if size == self.size() {
            return Ok(self.clone());
        }
        let out = image::imageops::resize(
            &self.to_buffer()?,
            size.width,
            size.height,
            FilterType::Triangle,
        );
        Ok(Self {
            width: size.width,
            height: size.height,
            pixels: out.into_raw(),
            progress: self.progress,
        })
    }

    /// Clamp to 8-bit RGBA.
    pub fn to_rgba8(&self) -> SceneportResult<RgbaImage> {
        let buf = self.to_buffer()?;
        Ok(RgbaImage::from_fn(self.width, self.height, |x, y| {
            let p = buf.get_pixel(x, y).0;
            image::Rgba(p.map(|c| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8))
        }))
    }

    /// Save as PNG (parent directories are created).
    pub fn save_png(&self, path: &Path) -> SceneportResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        self.to_rgba8()?
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/renderer/image.rs"]
mod tests;
