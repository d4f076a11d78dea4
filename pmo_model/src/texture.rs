//! Conversions from RGBA images to palette indexed [GimImage].
//!
//! Each unique color becomes a palette entry in the order it first appears.
//! Images with more than 256 unique colors are not supported.
use indexmap::IndexSet;
use log::debug;
use ordered_float::OrderedFloat;
use pmo_lib::gim::GimImage;

use crate::error::CreateTextureError;

/// An uncompressed RGBA image with a top left origin.
#[derive(Debug, PartialEq, Clone)]
pub struct ImageTexture {
    /// The name referenced by [MaterialTexture::Image](crate::MaterialTexture::Image).
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// RGBA colors in the range `0.0` to `1.0` in row-major order.
    pub pixels: Vec<[f32; 4]>,
}

impl ImageTexture {
    pub fn from_rgba_image(name: impl Into<String>, image: &image::RgbaImage) -> Self {
        Self {
            name: name.into(),
            width: image.width(),
            height: image.height(),
            pixels: image
                .pixels()
                .map(|p| p.0.map(|c| c as f32 / 255.0))
                .collect(),
        }
    }

    /// Create an image from `pixels` with a bottom left origin
    /// like the pixel buffers of most modeling applications.
    pub fn from_bottom_up(
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: &[[f32; 4]],
    ) -> Self {
        let pixels = if width == 0 {
            Vec::new()
        } else {
            pixels
                .chunks(width as usize)
                .rev()
                .flatten()
                .copied()
                .collect()
        };

        Self {
            name: name.into(),
            width,
            height,
            pixels,
        }
    }

    /// Encode the image with a palette of its unique colors.
    ///
    /// If `prioritize_color_count` is `true`, palettes with more than 16 colors
    /// use 8 bits per channel instead of reducing the precision of alpha.
    pub fn to_gim(&self, prioritize_color_count: bool) -> Result<GimImage, CreateTextureError> {
        let (width, height) = match (u16::try_from(self.width), u16::try_from(self.height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(CreateTextureError::Dimensions {
                    name: self.name.clone(),
                    width: self.width,
                    height: self.height,
                })
            }
        };

        let expected = self.width as usize * self.height as usize;
        if self.pixels.len() != expected {
            return Err(CreateTextureError::PixelCount {
                name: self.name.clone(),
                expected,
                actual: self.pixels.len(),
            });
        }

        let mut palette = IndexSet::new();
        let indices: Vec<u32> = self
            .pixels
            .iter()
            .map(|p| palette.insert_full(p.map(OrderedFloat)).0 as u32)
            .collect();
        let colors: Vec<[f32; 4]> = palette.iter().map(|c| c.map(|v| v.0)).collect();

        debug!("{:?}: {} palette colors", self.name, colors.len());

        GimImage::from_indices(width, height, &indices, &colors, prioritize_color_count).map_err(
            |source| CreateTextureError::Gim {
                name: self.name.clone(),
                source,
            },
        )
    }
}
