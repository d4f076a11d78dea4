//! Vertex attributes before quantization.
use glam::{Vec2, Vec3, Vec4};
use pmo_lib::vertex::{ColorFormat, NumericFormat, VertexFormat};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single vertex shared by all strips in a [ModelGroup](crate::ModelGroup).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Vertex {
    pub position: Vec3,
    /// Texture coordinates with a bottom left origin.
    #[cfg_attr(feature = "serde", serde(default))]
    pub uv: Option<Vec2>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub normal: Option<Vec3>,
    /// RGBA color in the range `0.0` to `1.0`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Option<Vec4>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub influences: Vec<Influence>,
}

/// The weight of a skeleton bone for a [Vertex].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Influence {
    /// The [id](crate::skeleton::Bone::id) of the bone.
    pub bone_id: u8,
    pub weight: f32,
}

impl Vertex {
    fn attributes(&self) -> (bool, bool, bool) {
        (self.uv.is_some(), self.normal.is_some(), self.color.is_some())
    }

    /// Returns `true` if `other` has the same optional attributes.
    pub fn has_same_attributes(&self, other: &Vertex) -> bool {
        self.attributes() == other.attributes()
    }

    /// The weight for each of `bone_ids` in order with `0.0` for bones without an influence.
    pub fn weights(&self, bone_ids: &[u8]) -> Vec<f32> {
        bone_ids
            .iter()
            .map(|id| {
                self.influences
                    .iter()
                    .find(|i| i.bone_id == *id)
                    .map(|i| i.weight)
                    .unwrap_or_default()
            })
            .collect()
    }

    pub(crate) fn to_pmo_vertex(&self, bone_ids: &[u8]) -> pmo_lib::vertex::Vertex {
        pmo_lib::vertex::Vertex {
            weights: self.weights(bone_ids),
            uv: self.uv.map(|v| v.to_array()),
            color: self.color.map(|v| v.to_array()),
            normal: self.normal.map(|v| v.to_array()),
            position: self.position.to_array(),
        }
    }
}

/// The default vertex format with attributes only enabled if present on `vertex`.
pub fn vertex_format(vertex: &Vertex, weight_count: usize) -> VertexFormat {
    let format = VertexFormat::with_weight_count(weight_count);
    VertexFormat {
        uv: if vertex.uv.is_some() {
            format.uv
        } else {
            NumericFormat::None
        },
        normal: if vertex.normal.is_some() {
            format.normal
        } else {
            NumericFormat::None
        },
        color: if vertex.color.is_some() {
            ColorFormat::Rgba8888
        } else {
            ColorFormat::None
        },
        ..format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::vec3;

    #[test]
    fn weights_in_bone_order() {
        let vertex = Vertex {
            influences: vec![
                Influence {
                    bone_id: 5,
                    weight: 0.25,
                },
                Influence {
                    bone_id: 2,
                    weight: 0.75,
                },
            ],
            ..Default::default()
        };
        assert_eq!(vec![0.75, 0.0, 0.25], vertex.weights(&[2, 3, 5]));
    }

    #[test]
    fn format_missing_attributes() {
        let vertex = Vertex {
            position: vec3(1.0, 2.0, 3.0),
            uv: None,
            normal: Some(Vec3::Z),
            color: None,
            influences: Vec::new(),
        };
        let format = vertex_format(&vertex, 2);
        assert_eq!(NumericFormat::None, format.uv);
        assert_eq!(NumericFormat::Byte, format.normal);
        assert_eq!(ColorFormat::None, format.color);
        assert_eq!(2, format.weight_count);
    }

    #[test]
    fn format_with_color() {
        let vertex = Vertex {
            uv: Some(Vec2::ZERO),
            color: Some(Vec4::ONE),
            ..Default::default()
        };
        let format = vertex_format(&vertex, 0);
        assert_eq!(NumericFormat::Short, format.uv);
        assert_eq!(ColorFormat::Rgba8888, format.color);
    }
}
