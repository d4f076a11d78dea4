//! # pmo_model
//! pmo_model converts high level model, skeleton, and texture data
//! to the binary formats in [pmo_lib].
//!
//! Inputs use floating point values and bone ids like the data extracted from modeling applications.
//! Conversions handle quantization, splitting strips into submeshes,
//! and creating color palettes.
//!
//! # Getting Started
//! ```rust no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! use pmo_model::{ModelRoot, PmoOptions};
//!
//! let root = ModelRoot::default();
//! let pmo = root.to_pmo(&PmoOptions::default())?;
//! pmo.write_to_file("model.pmo")?;
//! # Ok(())
//! # }
//! ```
use glam::Vec3;
use pmo_lib::Version;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use export::{export_pac, TextureOptions};
pub use model::ModelScale;
pub use vertex::{Influence, Vertex};

pub mod error;
pub mod export;
mod model;
pub mod skeleton;
pub mod texture;
pub mod vertex;

/// The root of a model with one [ModelGroup] for each object.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ModelRoot {
    pub groups: Vec<ModelGroup>,
    /// An existing scale to preserve in the header
    /// or zero to use the maximum absolute vertex coordinate.
    #[cfg_attr(feature = "serde", serde(default))]
    pub scale: Vec3,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ModelGroup {
    pub name: String,
    pub vertices: Vec<Vertex>,
    /// Triangle strips indexing into [vertices](#structfield.vertices).
    pub strips: Vec<TriangleStrip>,
    pub materials: Vec<Material>,
    /// Overrides the default GE blend mode for Portable 3rd models.
    #[cfg_attr(feature = "serde", serde(default))]
    pub blend_mode: Option<u32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct TriangleStrip {
    /// The index into the [materials](struct.ModelGroup.html#structfield.materials) of the group.
    pub material_index: usize,
    pub indices: Vec<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub backface_culling: bool,
    /// Enables alpha blending and alpha testing.
    #[cfg_attr(feature = "serde", serde(default))]
    pub alpha_blend: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone)]
pub struct Material {
    /// RGBA diffuse color in the range `0.0` to `1.0`.
    pub diffuse: [f32; 4],
    /// RGBA ambient color in the range `0.0` to `1.0`.
    pub ambient: [f32; 4],
    #[cfg_attr(feature = "serde", serde(default))]
    pub texture: Option<MaterialTexture>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: [1.0; 4],
            ambient: [1.0; 4],
            texture: None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum MaterialTexture {
    /// A fixed index into the images of an existing `.tmh` file.
    Index(i32),
    /// The [name](texture::ImageTexture::name) of an image to include when exporting.
    Image(String),
}

/// Settings for converting a [ModelRoot] to a [Pmo](pmo_lib::pmo::Pmo).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct PmoOptions {
    pub version: Version,
    /// Join the strips of each submesh into a single strip using degenerate triangles.
    pub join_strips: bool,
}
