use std::collections::BTreeSet;

use glam::Vec3;
use indexmap::{IndexMap, IndexSet};
use log::warn;
use pmo_lib::{
    ge::{self, FrontFace, PrimitiveType},
    pmo::{self, MeshData, MeshGroup, Pmo, Primitive, Submesh},
    vertex::{IndexFormat, QuantizationScale, MAX_WEIGHT_COUNT},
};
use rayon::prelude::*;

use crate::{
    error::CreatePmoError, vertex::vertex_format, Material, MaterialTexture, ModelGroup,
    ModelRoot, PmoOptions,
};

/// The scale values shared by all groups in a model.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ModelScale {
    /// The maximum absolute vertex coordinate.
    pub clipping_distance: f32,
    /// The scale stored in the model header.
    pub scale: Vec3,
    /// The scale used for quantizing the positions of every vertex.
    pub quantization: QuantizationScale,
}

impl ModelRoot {
    /// Compute the scale from the maximum absolute coordinate of all vertices used by strips.
    /// Vertices that no strip references are not written and do not affect the scale.
    ///
    /// A non zero [scale](#structfield.scale) is preserved and also included in the maximum.
    /// This means applying the result and computing the scale again has no effect.
    pub fn model_scale(&self) -> ModelScale {
        let abs_max = self
            .groups
            .iter()
            .flat_map(|g| {
                g.strips
                    .iter()
                    .flat_map(|s| &s.indices)
                    .filter_map(|i| g.vertices.get(*i as usize))
            })
            .map(|v| v.position.abs().max_element())
            .chain(self.scale.to_array())
            .fold(0.0f32, f32::max);

        let scale = if self.scale == Vec3::ZERO {
            Vec3::splat(abs_max)
        } else {
            self.scale
        };

        ModelScale {
            clipping_distance: abs_max,
            scale,
            quantization: QuantizationScale::uniform(abs_max),
        }
    }

    /// The unique image names of all materials in the order they first appear.
    /// Material texture indices refer to this list.
    pub fn image_names(&self) -> IndexSet<String> {
        self.groups
            .iter()
            .flat_map(|g| &g.materials)
            .filter_map(|m| match &m.texture {
                Some(MaterialTexture::Image(name)) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    #[tracing::instrument(skip_all)]
    pub fn to_pmo(&self, options: &PmoOptions) -> Result<Pmo, CreatePmoError> {
        let scale = self.model_scale();
        let image_names = self.image_names();

        let groups = self
            .groups
            .iter()
            .map(|g| g.to_mesh_group(options, &scale, &image_names))
            .collect::<Result<Vec<_>, _>>()?;

        Pmo::new(
            options.version,
            scale.clipping_distance,
            scale.scale.to_array(),
            groups,
        )
        .map_err(Into::into)
    }
}

/// Strips drawn with the same material, face attributes, and bones.
#[derive(Debug, PartialEq, Clone)]
struct SubmeshStrips {
    key: FaceKey,
    /// Sorted bone ids influencing any vertex in the strips.
    bone_ids: Vec<u8>,
    strips: Vec<Vec<u32>>,
}

#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
struct FaceKey {
    material_index: usize,
    backface_culling: bool,
    alpha_blend: bool,
}

impl ModelGroup {
    fn to_mesh_group(
        &self,
        options: &PmoOptions,
        scale: &ModelScale,
        image_names: &IndexSet<String>,
    ) -> Result<MeshGroup, CreatePmoError> {
        self.warn_unweighted_vertices();

        let submesh_strips = self.submesh_strips(options.join_strips)?;

        // Positions use the final model scale, so submeshes are independent.
        let submeshes = submesh_strips
            .par_iter()
            .map(|s| self.encode_submesh(s, &scale.quantization))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MeshGroup {
            name: self.name.clone(),
            scale: [scale.clipping_distance; 3],
            blend_mode: self.blend_mode.unwrap_or(ge::DEFAULT_BLEND_MODE),
            materials: self
                .materials
                .iter()
                .map(|m| m.to_pmo_material(image_names))
                .collect(),
            submeshes,
        })
    }

    fn warn_unweighted_vertices(&self) {
        if self.vertices.iter().any(|v| !v.influences.is_empty()) {
            let count = self
                .vertices
                .iter()
                .filter(|v| v.influences.is_empty())
                .count();
            if count > 0 {
                warn!(
                    "{count} vertices in skinned group {:?} are not assigned to any bones.",
                    self.name
                );
            }
        }
    }

    fn submesh_strips(&self, join: bool) -> Result<Vec<SubmeshStrips>, CreatePmoError> {
        let mut faces: IndexMap<FaceKey, IndexMap<Vec<u8>, Vec<Vec<u32>>>> = IndexMap::new();

        for strip in self.strips.iter().filter(|s| !s.indices.is_empty()) {
            let mut bone_ids = BTreeSet::new();
            for index in &strip.indices {
                let vertex = self.vertices.get(*index as usize).ok_or_else(|| {
                    CreatePmoError::VertexIndexOutOfRange {
                        group: self.name.clone(),
                        index: *index,
                        count: self.vertices.len(),
                    }
                })?;
                bone_ids.extend(vertex.influences.iter().map(|i| i.bone_id));
            }

            let key = FaceKey {
                material_index: strip.material_index,
                backface_culling: strip.backface_culling,
                alpha_blend: strip.alpha_blend,
            };
            faces
                .entry(key)
                .or_default()
                .entry(bone_ids.into_iter().collect())
                .or_default()
                .push(strip.indices.clone());
        }

        // Face attributes are sorted, but bone sets keep their order.
        faces.sort_keys();

        Ok(faces
            .into_iter()
            .flat_map(|(key, bone_strips)| {
                bone_strips
                    .into_iter()
                    .map(move |(bone_ids, strips)| SubmeshStrips {
                        key,
                        bone_ids,
                        strips: if join {
                            vec![join_strips(strips)]
                        } else {
                            strips
                        },
                    })
            })
            .collect())
    }

    fn encode_submesh(
        &self,
        submesh: &SubmeshStrips,
        scale: &QuantizationScale,
    ) -> Result<Submesh, CreatePmoError> {
        if submesh.bone_ids.len() > MAX_WEIGHT_COUNT {
            return Err(CreatePmoError::TooManyInfluences {
                group: self.name.clone(),
                count: submesh.bone_ids.len(),
            });
        }

        // Submeshes only store the vertices they use.
        let source_indices: Vec<u32> = submesh
            .strips
            .iter()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let vertices: Vec<_> = source_indices
            .iter()
            .map(|i| &self.vertices[*i as usize])
            .collect();

        let format = match vertices.first() {
            Some(first) => {
                if let Some(i) = source_indices
                    .iter()
                    .zip(&vertices)
                    .find(|(_, v)| !first.has_same_attributes(v))
                    .map(|(i, _)| *i)
                {
                    return Err(CreatePmoError::InconsistentAttributes {
                        group: self.name.clone(),
                        vertex: i,
                    });
                }
                vertex_format(first, submesh.bone_ids.len())
            }
            None => vertex_format(&Default::default(), submesh.bone_ids.len()),
        };

        let mut vertex_data = Vec::new();
        for vertex in &vertices {
            format.write_vertex(
                &mut vertex_data,
                &vertex.to_pmo_vertex(&submesh.bone_ids),
                scale,
            );
        }

        let max_index = source_indices.len().saturating_sub(1) as u32;
        let index_format = IndexFormat::from_max_index(max_index);

        let mut index_data = Vec::new();
        let mut primitives = Vec::new();
        for strip in &submesh.strips {
            let local_indices: Vec<u32> = strip
                .iter()
                .map(|i| source_indices.partition_point(|s| s < i) as u32)
                .collect();
            index_format.write_indices(&mut index_data, &local_indices);

            let vertex_count =
                u16::try_from(strip.len()).map_err(|_| CreatePmoError::StripTooLong {
                    group: self.name.clone(),
                    length: strip.len(),
                })?;
            primitives.push(Primitive {
                primitive_type: PrimitiveType::TriangleStrip,
                front_face: FrontFace::CounterClockwise,
                vertex_count,
            });
        }

        Ok(Submesh {
            material_index: submesh.key.material_index,
            bone_ids: submesh.bone_ids.clone(),
            data: MeshData {
                vertex_type: format.vertex_type(index_format),
                primitives,
                alpha_blend: submesh.key.alpha_blend,
                backface_culling: submesh.key.backface_culling,
                vertex_data,
                index_data,
            },
        })
    }
}

impl Material {
    fn to_pmo_material(&self, image_names: &IndexSet<String>) -> pmo::Material {
        let texture_index = match &self.texture {
            Some(MaterialTexture::Index(index)) => *index,
            Some(MaterialTexture::Image(name)) => image_names
                .get_index_of(name)
                .map(|i| i as i32)
                .unwrap_or(-1),
            None => -1,
        };

        pmo::Material {
            diffuse: self.diffuse.map(color_u8),
            ambient: self.ambient.map(color_u8),
            texture_index,
        }
    }
}

// Truncate instead of rounding to match existing materials.
fn color_u8(c: f32) -> u8 {
    (c * 255.0) as u8
}

/// Join `strips` into a single strip connected by degenerate triangles.
///
/// Strips are sorted first. Extra indices keep each strip at an even position
/// to preserve the winding order.
pub(crate) fn join_strips(mut strips: Vec<Vec<u32>>) -> Vec<u32> {
    if strips.len() <= 1 {
        return strips.pop().unwrap_or_default();
    }

    strips.sort();

    let count = strips.len();
    let mut joined: Vec<u32> = Vec::new();
    for (i, mut strip) in strips.into_iter().enumerate() {
        if let Some(last) = joined.last().copied() {
            if joined.len() % 2 == 0 {
                joined.push(last);
            }
        }
        if i + 1 < count {
            if let Some(last) = strip.last().copied() {
                strip.push(last);
            }
        }
        if i > 0 {
            if let Some(first) = strip.first().copied() {
                joined.push(first);
            }
        }
        joined.extend(strip);
    }
    joined
}
