//! Vertex formats and fixed point quantization for submesh vertex data.
//!
//! # Overview
//! Each submesh stores its vertices in a single interleaved buffer described by a [VertexType].
//! The same [VertexType] is written as a GE command in the submesh command list.
//!
//! Attributes are stored in a fixed order with each component aligned to its own size.
//! ```text
//! weights
//! texture coordinates
//! color
//! normal
//! position
//! ```
//! The vertex size is padded to the alignment of the largest component.
//!
//! Integer formats store fixed point values using a constant factor for each attribute.
//! Positions are also divided by the [QuantizationScale] shared by all submeshes in a model.
use bilge::prelude::*;
use binrw::BinWrite;
use log::warn;

use crate::{gim::PaletteFormat, pmo_write_binwrite_impl};

/// The storage format for the components of a vertex attribute.
#[bitsize(2)]
#[derive(Debug, FromBits, PartialEq, Eq, Clone, Copy, Default)]
pub enum NumericFormat {
    /// The attribute is not present.
    #[default]
    None = 0,
    Byte = 1,
    Short = 2,
    Float = 3,
}

impl NumericFormat {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            NumericFormat::None => 0,
            NumericFormat::Byte => 1,
            NumericFormat::Short => 2,
            NumericFormat::Float => 4,
        }
    }
}

#[bitsize(3)]
#[derive(Debug, FromBits, PartialEq, Eq, Clone, Copy, Default)]
pub enum ColorFormat {
    #[default]
    None = 0,
    Reserved1 = 1,
    Reserved2 = 2,
    Reserved3 = 3,
    Rgb565 = 4,
    Rgba5551 = 5,
    Rgba4444 = 6,
    Rgba8888 = 7,
}

impl ColorFormat {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ColorFormat::Rgb565 | ColorFormat::Rgba5551 | ColorFormat::Rgba4444 => 2,
            ColorFormat::Rgba8888 => 4,
            _ => 0,
        }
    }

    fn palette_format(&self) -> Option<PaletteFormat> {
        match self {
            ColorFormat::Rgb565 => Some(PaletteFormat::Rgb565),
            ColorFormat::Rgba5551 => Some(PaletteFormat::Rgba5551),
            ColorFormat::Rgba4444 => Some(PaletteFormat::Rgba4444),
            ColorFormat::Rgba8888 => Some(PaletteFormat::Rgba8888),
            _ => None,
        }
    }
}

/// The element size of the index buffer.
#[bitsize(2)]
#[derive(Debug, FromBits, PartialEq, Eq, Clone, Copy, Default)]
pub enum IndexFormat {
    /// The submesh is not indexed.
    #[default]
    None = 0,
    UInt8 = 1,
    UInt16 = 2,
    UInt32 = 3,
}

impl IndexFormat {
    /// The smallest format that can represent `max_index`.
    pub fn from_max_index(max_index: u32) -> Self {
        if max_index <= u8::MAX as u32 {
            IndexFormat::UInt8
        } else if max_index <= u16::MAX as u32 {
            IndexFormat::UInt16
        } else {
            IndexFormat::UInt32
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        match self {
            IndexFormat::None => 0,
            IndexFormat::UInt8 => 1,
            IndexFormat::UInt16 => 2,
            IndexFormat::UInt32 => 4,
        }
    }

    /// Append `indices` to `buffer` using this format.
    /// Values are truncated if they do not fit.
    pub fn write_indices(&self, buffer: &mut Vec<u8>, indices: &[u32]) {
        for index in indices {
            match self {
                IndexFormat::None => (),
                IndexFormat::UInt8 => buffer.push(*index as u8),
                IndexFormat::UInt16 => buffer.extend_from_slice(&(*index as u16).to_le_bytes()),
                IndexFormat::UInt32 => buffer.extend_from_slice(&index.to_le_bytes()),
            }
        }
    }
}

/// The GE vertex type command describing the vertex and index data for a submesh.
#[bitsize(32)]
#[derive(DebugBits, FromBits, BinWrite, PartialEq, Clone, Copy)]
#[bw(map = |&x| u32::from(x))]
pub struct VertexType {
    pub uv: NumericFormat,
    pub color: ColorFormat,
    pub normal: NumericFormat,
    pub position: NumericFormat,
    pub weight: NumericFormat,
    pub index: IndexFormat,
    pub unk1: u1,
    /// The number of weights minus one.
    pub weight_count: u3,
    pub unk2: u1,
    pub morph_count: u3,
    pub unk3: u2,
    /// Positions are already in screen space.
    pub bypass_transform: bool,
    /// Always [Command::VertexType](crate::ge::Command::VertexType).
    pub command: u8,
}

pmo_write_binwrite_impl!(VertexType);

/// The maximum number of weights per vertex supported by [VertexType].
pub const MAX_WEIGHT_COUNT: usize = 8;

/// The attribute formats for a submesh.
/// Attributes are present if their format is not `None`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VertexFormat {
    pub weight: NumericFormat,
    pub uv: NumericFormat,
    pub color: ColorFormat,
    pub normal: NumericFormat,
    pub position: NumericFormat,
    /// The number of weights for each vertex.
    /// This should match the bone count of the submesh.
    pub weight_count: usize,
    pub bypass_transform: bool,
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self {
            weight: NumericFormat::Byte,
            uv: NumericFormat::Short,
            color: ColorFormat::None,
            normal: NumericFormat::Byte,
            position: NumericFormat::Short,
            weight_count: 0,
            bypass_transform: false,
        }
    }
}

/// Byte offsets for each attribute in a single vertex.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VertexLayout {
    pub weights: Option<usize>,
    pub uv: Option<usize>,
    pub color: Option<usize>,
    pub normal: Option<usize>,
    pub position: Option<usize>,
    /// The size of each vertex in bytes.
    pub size: usize,
}

impl VertexFormat {
    /// The default format for submeshes with `weight_count` bone influences.
    pub fn with_weight_count(weight_count: usize) -> Self {
        Self {
            weight_count,
            ..Default::default()
        }
    }

    fn has_weights(&self) -> bool {
        self.weight != NumericFormat::None && self.weight_count > 0
    }

    pub fn layout(&self) -> VertexLayout {
        let mut offset = 0usize;
        let mut max_alignment = 1usize;

        let mut place = |size: usize, count: usize| {
            if size == 0 || count == 0 {
                None
            } else {
                max_alignment = max_alignment.max(size);
                let start = offset.next_multiple_of(size);
                offset = start + size * count;
                Some(start)
            }
        };

        let weight_count = if self.has_weights() {
            self.weight_count
        } else {
            0
        };
        let weights = place(self.weight.size_in_bytes(), weight_count);
        let uv = place(self.uv.size_in_bytes(), 2);
        let color = place(self.color.size_in_bytes(), 1);
        let normal = place(self.normal.size_in_bytes(), 3);
        let position = place(self.position.size_in_bytes(), 3);

        VertexLayout {
            weights,
            uv,
            color,
            normal,
            position,
            size: offset.next_multiple_of(max_alignment),
        }
    }

    /// The vertex type command for this format and `index` format.
    pub fn vertex_type(&self, index: IndexFormat) -> VertexType {
        let (weight, weight_count) = if self.has_weights() {
            let count = (self.weight_count - 1).min(MAX_WEIGHT_COUNT - 1) as u8;
            (self.weight, u3::new(count))
        } else {
            (NumericFormat::None, u3::new(0))
        };

        VertexType::new(
            self.uv,
            self.color,
            self.normal,
            self.position,
            weight,
            index,
            u1::new(0),
            weight_count,
            u1::new(0),
            u3::new(0),
            u2::new(0),
            self.bypass_transform,
            crate::ge::Command::VertexType as u8,
        )
    }

    /// Quantize `vertex` and append the result to `buffer`.
    ///
    /// Attributes not present in the format are ignored.
    pub fn write_vertex(&self, buffer: &mut Vec<u8>, vertex: &Vertex, scale: &QuantizationScale) {
        let layout = self.layout();
        let start = buffer.len();
        buffer.resize(start + layout.size, 0u8);
        let bytes = &mut buffer[start..];

        if let Some(offset) = layout.weights {
            // Missing weights are zero.
            let weights: Vec<_> = (0..self.weight_count)
                .map(|i| vertex.weights.get(i).copied().unwrap_or_default())
                .collect();
            if write_unsigned(bytes, offset, self.weight, &weights, WEIGHT_FACTOR) {
                warn!("Weights {weights:?} are out of range and will be clamped.");
            }
        }

        if let (Some(offset), Some([u, v])) = (layout.uv, vertex.uv) {
            // Texture coordinates use a top left origin.
            if write_unsigned(bytes, offset, self.uv, &[u, 1.0 - v], UV_FACTOR) {
                warn!("Texture coordinates {:?} are out of range and will be clamped.", [u, v]);
            }
        }

        if let (Some(offset), Some(color)) = (layout.color, vertex.color) {
            if let Some(format) = self.color.palette_format() {
                let value = format.pack(color);
                let size = self.color.size_in_bytes();
                bytes[offset..offset + size].copy_from_slice(&value.to_le_bytes()[..size]);
            }
        }

        if let (Some(offset), Some(normal)) = (layout.normal, vertex.normal) {
            write_signed(bytes, offset, self.normal, &normal, NORMAL_FACTOR);
        }

        if let Some(offset) = layout.position {
            // Floats are written unscaled.
            let position = if self.position == NumericFormat::Float {
                vertex.position
            } else {
                scale.normalize(vertex.position)
            };
            write_signed(bytes, offset, self.position, &position, POSITION_FACTOR);
        }
    }
}

const WEIGHT_FACTOR: f32 = 128.0;
const UV_FACTOR: f32 = 32768.0;
const NORMAL_FACTOR: f32 = 127.0;
const POSITION_FACTOR: f32 = 32767.0;

/// Vertex attributes before quantization.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Vertex {
    /// One weight for each bone in the submesh in the same order.
    pub weights: Vec<f32>,
    /// Texture coordinates with a bottom left origin.
    pub uv: Option<[f32; 2]>,
    /// RGBA color in the range `0.0` to `1.0`.
    pub color: Option<[f32; 4]>,
    pub normal: Option<[f32; 3]>,
    pub position: [f32; 3],
}

/// The scale for each position axis used for integer position formats.
///
/// This is computed once for the entire model before encoding any vertices.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct QuantizationScale {
    pub axes: [f32; 3],
}

impl QuantizationScale {
    pub fn uniform(scale: f32) -> Self {
        Self { axes: [scale; 3] }
    }

    /// Divide each component by the axis scale.
    /// Axes with a scale of zero produce zero.
    pub fn normalize(&self, position: [f32; 3]) -> [f32; 3] {
        let mut result = [0.0; 3];
        for ((r, p), s) in result.iter_mut().zip(position).zip(self.axes) {
            if s != 0.0 {
                *r = p / s;
            }
        }
        result
    }
}

// Rounding matches the fixed point conversion used by existing model files.
fn fixed_point(value: f32, factor: f32) -> f32 {
    (value * factor).round_ties_even()
}

/// Returns `true` if any value did not fit the format and was clamped.
/// Float to int casts saturate, so negative values clamp to 0.
fn write_unsigned(
    bytes: &mut [u8],
    offset: usize,
    format: NumericFormat,
    values: &[f32],
    factor: f32,
) -> bool {
    let size = format.size_in_bytes();
    let mut clamped = false;
    for (i, value) in values.iter().enumerate() {
        let start = offset + i * size;
        let output = &mut bytes[start..start + size];
        let fixed = fixed_point(*value, factor);
        match format {
            NumericFormat::None => (),
            NumericFormat::Byte => {
                clamped |= !(0.0..=u8::MAX as f32).contains(&fixed);
                output[0] = fixed.max(0.0) as u8;
            }
            NumericFormat::Short => {
                clamped |= !(0.0..=u16::MAX as f32).contains(&fixed);
                output.copy_from_slice(&(fixed.max(0.0) as u16).to_le_bytes());
            }
            NumericFormat::Float => output.copy_from_slice(&value.to_le_bytes()),
        }
    }
    clamped
}

fn write_signed(
    bytes: &mut [u8],
    offset: usize,
    format: NumericFormat,
    values: &[f32],
    factor: f32,
) {
    let size = format.size_in_bytes();
    for (i, value) in values.iter().enumerate() {
        let start = offset + i * size;
        let output = &mut bytes[start..start + size];
        match format {
            NumericFormat::None => (),
            NumericFormat::Byte => output[0] = (fixed_point(*value, factor) as i8) as u8,
            NumericFormat::Short => {
                output.copy_from_slice(&(fixed_point(*value, factor) as i16).to_le_bytes())
            }
            NumericFormat::Float => output.copy_from_slice(&value.to_le_bytes()),
        }
    }
}
