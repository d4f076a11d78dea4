//! Graphics engine (GE) display list commands embedded in model data.
//!
//! Each command is a little endian `u32` with the command in the high byte
//! and a 24 bit argument in the remaining bits.

/// GE command bytes used by model data.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Command {
    /// Vertex data address relative to the submesh start.
    VertexAddress = 0x01,
    /// Index data address relative to the submesh start.
    IndexAddress = 0x02,
    /// Draw the primitive type and vertex count in the argument.
    Prim = 0x04,
    Ret = 0x0B,
    Base = 0x10,
    VertexType = 0x12,
    OffsetAddress = 0x13,
    Origin = 0x14,
    BackfaceCullingEnable = 0x1D,
    AlphaBlendEnable = 0x21,
    FrontFace = 0x9B,
    AlphaTest = 0xDB,
    /// Blend equation and factors.
    BlendMode = 0xDF,
}

/// Alpha test function `GEQUAL` with reference value 5 and mask 0xFF.
pub const ALPHA_TEST_PARAMS: u32 = 0xFF0507;

/// The default blend mode argument stored in Portable 3rd mesh headers.
pub const DEFAULT_BLEND_MODE: u32 = 0x000032;

/// Encode a command word with the lower 24 bits of `argument`.
pub const fn command(command: Command, argument: u32) -> u32 {
    ((command as u32) << 24) | (argument & 0x00FF_FFFF)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[repr(u8)]
pub enum PrimitiveType {
    Points = 0,
    Lines = 1,
    LineStrip = 2,
    Triangles = 3,
    #[default]
    TriangleStrip = 4,
    TriangleFan = 5,
    Sprites = 6,
}

/// The winding order for front facing triangles.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[repr(u8)]
pub enum FrontFace {
    #[default]
    CounterClockwise = 0,
    Clockwise = 1,
}

/// The draw command for `count` vertices of `primitive_type`.
pub const fn prim(primitive_type: PrimitiveType, count: u16) -> u32 {
    command(
        Command::Prim,
        ((primitive_type as u32) << 16) | count as u32,
    )
}
