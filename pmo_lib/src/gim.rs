//! Palette indexed images stored in [Tmh](crate::tmh::Tmh) texture containers.
//!
//! # Overview
//! A [GimImage] stores 4 or 8 bit palette indices followed by a [Palette] of packed colors.
//!
//! Indices are swizzled into tiles of 16 bytes by 8 rows.
//! This is 32x8 pixels for 4 bit indices and 16x8 pixels for 8 bit indices.
//! Tiles are ordered left to right and then top to bottom
//! with the pixels in each tile stored in row-major order.
//! ```text
//! tile 0 row 0
//! tile 0 row 1
//! ...
//! tile 0 row 7
//! tile 1 row 0
//! ...
//! ```
//! Images are padded with index 0 to a whole number of tiles.
//! This also pads rows of 4 bit images narrower than one tile to the full 16 byte tile width.
use binrw::BinWrite;
use indexmap::IndexSet;
use ordered_float::OrderedFloat;
use thiserror::Error;

const TILE_WIDTH_BYTES: usize = 16;
const TILE_HEIGHT: usize = 8;
const HEADER_SIZE: usize = 0x10;
const PALETTE_FLAGS: u32 = 2;

/// Image data is swizzled into tiles.
const DATA_FLAG_SWIZZLED: u32 = 1;

/// The maximum number of colors for a [Palette].
pub const MAX_COLOR_COUNT: usize = 256;

#[derive(Debug, Error)]
pub enum CreateGimError {
    #[error("image uses {count} palette colors but at most 256 are supported")]
    PaletteOverflow { count: usize },

    #[error("expected {expected} indices for image dimensions but found {actual}")]
    IndexCountMismatch { expected: usize, actual: usize },
}

/// The bit depth of the palette indices.
#[derive(Debug, BinWrite, PartialEq, Eq, Clone, Copy)]
#[bw(repr(u32))]
pub enum IndexDepth {
    Index4 = 4,
    Index8 = 5,
}

impl IndexDepth {
    /// The number of palette entries addressable by this depth.
    pub fn entry_count(&self) -> usize {
        match self {
            IndexDepth::Index4 => 16,
            IndexDepth::Index8 => 256,
        }
    }

    fn pixels_per_byte(&self) -> usize {
        match self {
            IndexDepth::Index4 => 2,
            IndexDepth::Index8 => 1,
        }
    }
}

/// The packed color format for a [Palette].
/// Red is stored in the lowest bits for all formats.
#[derive(Debug, BinWrite, PartialEq, Eq, Clone, Copy)]
#[bw(repr(u32))]
pub enum PaletteFormat {
    Rgb565 = 0,
    Rgba5551 = 1,
    Rgba4444 = 2,
    Rgba8888 = 3,
}

impl PaletteFormat {
    /// Select the smallest format that preserves the alpha values in `colors`.
    ///
    /// Binary alpha uses [PaletteFormat::Rgba5551] unless `prioritize_color_count` is set.
    /// Formats with more bits per channel are only used if there are more than 16 distinct colors.
    pub fn select(colors: &[[f32; 4]], prioritize_color_count: bool) -> Self {
        if colors.iter().all(|c| c[3] == 1.0) {
            PaletteFormat::Rgb565
        } else if colors.iter().all(|c| c[3] == 0.0 || c[3] == 1.0) && !prioritize_color_count
        {
            PaletteFormat::Rgba5551
        } else if distinct_color_count(colors) > 16 {
            PaletteFormat::Rgba8888
        } else {
            PaletteFormat::Rgba4444
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        match self {
            PaletteFormat::Rgba8888 => 4,
            _ => 2,
        }
    }

    /// Bits for the red, green, blue, and alpha channels.
    fn channel_bits(&self) -> [u32; 4] {
        match self {
            PaletteFormat::Rgb565 => [5, 6, 5, 0],
            PaletteFormat::Rgba5551 => [5, 5, 5, 1],
            PaletteFormat::Rgba4444 => [4, 4, 4, 4],
            PaletteFormat::Rgba8888 => [8, 8, 8, 8],
        }
    }

    /// Pack an RGBA color in the range `0.0` to `1.0`.
    pub fn pack(&self, color: [f32; 4]) -> u32 {
        let mut value = 0;
        let mut shift = 0;
        for (c, bits) in color.into_iter().zip(self.channel_bits()) {
            if bits > 0 {
                let max = ((1u32 << bits) - 1) as f32;
                let channel = (c.clamp(0.0, 1.0) * max).round_ties_even() as u32;
                value |= channel << shift;
                shift += bits;
            }
        }
        value
    }
}

fn distinct_color_count(colors: &[[f32; 4]]) -> usize {
    colors
        .iter()
        .map(|c| c.map(OrderedFloat))
        .collect::<IndexSet<_>>()
        .len()
}

/// A color table padded to the entry count of the image [IndexDepth].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Palette {
    pub format: PaletteFormat,
    /// Packed colors with unused entries set to opaque black.
    pub colors: Vec<u32>,
}

impl Palette {
    /// Pack `colors` and pad the table to `entry_count` entries.
    /// The format is selected from `colors` without the padding entries.
    pub fn new(colors: &[[f32; 4]], prioritize_color_count: bool, entry_count: usize) -> Self {
        let format = PaletteFormat::select(colors, prioritize_color_count);

        let padding = [0.0, 0.0, 0.0, 1.0];
        let colors = colors
            .iter()
            .copied()
            .chain(std::iter::repeat(padding))
            .take(entry_count.max(colors.len()))
            .map(|c| format.pack(c))
            .collect();

        Self { format, colors }
    }

    /// The size in bytes of the palette including its header.
    pub fn size(&self) -> usize {
        self.colors.len() * self.format.size_in_bytes() + HEADER_SIZE
    }
}

impl BinWrite for Palette {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        (self.size() as u32).write_options(writer, endian, ())?;
        PALETTE_FLAGS.write_options(writer, endian, ())?;
        self.format.write_options(writer, endian, ())?;
        (self.colors.len() as u32).write_options(writer, endian, ())?;

        for color in &self.colors {
            match self.format {
                PaletteFormat::Rgba8888 => color.write_options(writer, endian, ())?,
                _ => (*color as u16).write_options(writer, endian, ())?,
            }
        }
        Ok(())
    }
}

/// A palette indexed image.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GimImage {
    pub width: u16,
    pub height: u16,
    pub depth: IndexDepth,
    /// Packed indices swizzled into tiles.
    pub image_data: Vec<u8>,
    pub palette: Palette,
}

impl GimImage {
    /// Swizzle the row-major `indices` into `colors` and select the smallest index depth.
    ///
    /// The depth only depends on the largest index, so unused colors never force 8 bit indices.
    /// The palette is padded to 16 entries if it covers every index and color and 256 otherwise.
    ///
    /// Returns an error if any index or the color count exceeds [MAX_COLOR_COUNT].
    pub fn from_indices(
        width: u16,
        height: u16,
        indices: &[u32],
        colors: &[[f32; 4]],
        prioritize_color_count: bool,
    ) -> Result<Self, CreateGimError> {
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(CreateGimError::IndexCountMismatch {
                expected,
                actual: indices.len(),
            });
        }

        let max_index = indices.iter().copied().max().unwrap_or_default() as usize;
        let count = colors.len().max(max_index + 1);
        if count > MAX_COLOR_COUNT {
            return Err(CreateGimError::PaletteOverflow { count });
        }

        let depth = if max_index < IndexDepth::Index4.entry_count() {
            IndexDepth::Index4
        } else {
            IndexDepth::Index8
        };
        let entry_count = if count <= IndexDepth::Index4.entry_count() {
            IndexDepth::Index4.entry_count()
        } else {
            IndexDepth::Index8.entry_count()
        };

        let indices: Vec<u8> = indices.iter().map(|i| *i as u8).collect();
        let image_data = swizzle_indices(width as usize, height as usize, &indices, depth);

        Ok(Self {
            width,
            height,
            depth,
            image_data,
            palette: Palette::new(colors, prioritize_color_count, entry_count),
        })
    }

    /// The size in bytes of the image data including its header.
    pub fn data_size(&self) -> usize {
        self.image_data.len() + HEADER_SIZE
    }

    /// The size in bytes of the entire image record.
    pub fn size(&self) -> usize {
        self.data_size() + self.palette.size() + HEADER_SIZE
    }
}

impl BinWrite for GimImage {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        [self.size() as u32, 0, 1, 1].write_options(writer, endian, ())?;

        (self.data_size() as u32).write_options(writer, endian, ())?;
        DATA_FLAG_SWIZZLED.write_options(writer, endian, ())?;
        self.depth.write_options(writer, endian, ())?;
        self.width.write_options(writer, endian, ())?;
        self.height.write_options(writer, endian, ())?;

        self.image_data.write_options(writer, endian, ())?;
        self.palette.write_options(writer, endian, ())?;
        Ok(())
    }
}

/// Swizzle row-major `indices` into tiles and pack them using `depth`.
/// The dimensions are padded to a whole number of tiles.
pub fn swizzle_indices(width: usize, height: usize, indices: &[u8], depth: IndexDepth) -> Vec<u8> {
    let tile_width = TILE_WIDTH_BYTES * depth.pixels_per_byte();
    let padded_width = width.next_multiple_of(tile_width);
    let padded_height = height.max(1).next_multiple_of(TILE_HEIGHT);

    let mut tiled = Vec::with_capacity(padded_width * padded_height);
    for tile_y in 0..padded_height / TILE_HEIGHT {
        for tile_x in 0..padded_width / tile_width {
            for y in 0..TILE_HEIGHT {
                for x in 0..tile_width {
                    let pixel_x = tile_x * tile_width + x;
                    let pixel_y = tile_y * TILE_HEIGHT + y;
                    let index = if pixel_x < width && pixel_y < height {
                        indices[pixel_y * width + pixel_x]
                    } else {
                        0
                    };
                    tiled.push(index);
                }
            }
        }
    }

    match depth {
        // The first pixel is in the low nibble.
        IndexDepth::Index4 => tiled.chunks(2).map(|p| p[0] | (p[1] << 4)).collect(),
        IndexDepth::Index8 => tiled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hexlit::hex;
    use pretty_assertions::assert_eq;

    const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    const CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

    fn gray(value: f32, alpha: f32) -> [f32; 4] {
        [value, value, value, alpha]
    }

    #[test]
    fn select_opaque() {
        assert_eq!(
            PaletteFormat::Rgb565,
            PaletteFormat::select(&[WHITE, gray(0.5, 1.0)], false)
        );
    }

    #[test]
    fn select_opaque_many_colors() {
        // Opacity is checked before the color count.
        let colors: Vec<_> = (0..17).map(|i| gray(i as f32 / 16.0, 1.0)).collect();
        assert_eq!(PaletteFormat::Rgb565, PaletteFormat::select(&colors, false));
    }

    #[test]
    fn select_binary_alpha() {
        assert_eq!(
            PaletteFormat::Rgba5551,
            PaletteFormat::select(&[WHITE, CLEAR], false)
        );
    }

    #[test]
    fn select_binary_alpha_color_priority() {
        assert_eq!(
            PaletteFormat::Rgba4444,
            PaletteFormat::select(&[WHITE, CLEAR], true)
        );
    }

    #[test]
    fn select_many_colors() {
        let colors: Vec<_> = (0..17).map(|i| gray(i as f32 / 16.0, 0.5)).collect();
        assert_eq!(PaletteFormat::Rgba8888, PaletteFormat::select(&colors, false));
    }

    #[test]
    fn select_duplicate_colors() {
        let colors = vec![gray(0.25, 0.5); 20];
        assert_eq!(PaletteFormat::Rgba4444, PaletteFormat::select(&colors, false));
    }

    #[test]
    fn pack_colors() {
        assert_eq!(0xFFFF, PaletteFormat::Rgb565.pack(WHITE));
        assert_eq!(0xF800, PaletteFormat::Rgb565.pack([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(0x801F, PaletteFormat::Rgba5551.pack([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(0x8888, PaletteFormat::Rgba4444.pack(gray(0.5, 0.5)));
        assert_eq!(0xFF0000FF, PaletteFormat::Rgba8888.pack([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn palette_padding() {
        let palette = Palette::new(&[WHITE, CLEAR], false, 16);
        assert_eq!(PaletteFormat::Rgba5551, palette.format);
        assert_eq!(16, palette.colors.len());
        assert_eq!(0xFFFF, palette.colors[0]);
        assert_eq!(0x0000, palette.colors[1]);
        assert_eq!(0x8000, palette.colors[2]);
        assert_eq!(0x30, palette.size());
    }

    #[test]
    fn swizzle_single_tile_4bit() {
        let indices: Vec<u8> = (0..32 * 8).map(|i| (i % 16) as u8).collect();
        let data = swizzle_indices(32, 8, &indices, IndexDepth::Index4);
        assert_eq!(128, data.len());
        assert_eq!(hex!(10325476 98badcfe 10325476 98badcfe), data[..16]);
    }

    #[test]
    fn swizzle_tiles_8bit() {
        // Each pixel stores its tile index.
        let indices: Vec<u8> = (0..32 * 16)
            .map(|i| {
                let (x, y) = (i % 32, i / 32);
                (y / 8 * 2 + x / 16) as u8
            })
            .collect();
        let data = swizzle_indices(32, 16, &indices, IndexDepth::Index8);

        let expected: Vec<u8> = (0..4).flat_map(|t| [t; 128]).collect();
        assert_eq!(expected, data);
    }

    #[test]
    fn swizzle_narrow_4bit_pads_rows() {
        let indices = vec![1u8; 16 * 8];
        let data = swizzle_indices(16, 8, &indices, IndexDepth::Index4);
        assert_eq!(128, data.len());
        for row in data.chunks(16) {
            assert_eq!(hex!(11111111 11111111 00000000 00000000), row);
        }
    }

    #[test]
    fn write_small_image() {
        let colors = [WHITE, gray(0.0, 1.0), [1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
        let image = GimImage::from_indices(4, 2, &[0, 1, 2, 3, 3, 2, 1, 0], &colors, false).unwrap();
        assert_eq!(IndexDepth::Index4, image.depth);
        assert_eq!(0xD0, image.size());

        let mut writer = std::io::Cursor::new(Vec::new());
        image.write_le(&mut writer).unwrap();
        let bytes = writer.into_inner();

        assert_eq!(0xD0, bytes.len());
        assert_eq!(
            hex!(
                d0000000 00000000 01000000 01000000
                90000000 01000000 04000000 04000200
                10320000 00000000 00000000 00000000
                23010000 00000000 00000000 00000000
            ),
            bytes[..0x40]
        );
        assert_eq!(
            hex!(30000000 02000000 00000000 10000000 ffff0000 1f00e007),
            bytes[0xA0..0xB8]
        );
    }

    #[test]
    fn eight_bit_depth() {
        let colors: Vec<_> = (0..17).map(|i| gray(i as f32 / 16.0, 1.0)).collect();
        let indices: Vec<u32> = (0..17).collect();
        let image = GimImage::from_indices(17, 1, &indices, &colors, false).unwrap();
        assert_eq!(IndexDepth::Index8, image.depth);
        assert_eq!(256, image.palette.colors.len());
        // 32x8 pixels after padding to whole tiles.
        assert_eq!(256, image.image_data.len());
    }

    #[test]
    fn depth_from_max_index() {
        // Unused colors pad the palette but do not change the index depth.
        let colors: Vec<_> = (0..17).map(|i| gray(i as f32 / 16.0, 1.0)).collect();
        let indices: Vec<u32> = (0..8).collect();
        let image = GimImage::from_indices(4, 2, &indices, &colors, false).unwrap();
        assert_eq!(IndexDepth::Index4, image.depth);
        assert_eq!(256, image.palette.colors.len());
        assert_eq!(128, image.image_data.len());
    }

    #[test]
    fn palette_overflow() {
        let indices: Vec<u32> = (0..257).collect();
        let result = GimImage::from_indices(257, 1, &indices, &[WHITE], false);
        assert!(matches!(
            result,
            Err(CreateGimError::PaletteOverflow { count: 257 })
        ));
    }

    #[test]
    fn index_count_mismatch() {
        let result = GimImage::from_indices(2, 2, &[0, 0, 0], &[WHITE], false);
        assert!(matches!(
            result,
            Err(CreateGimError::IndexCountMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }
}
