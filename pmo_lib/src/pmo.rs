//! Models in `.pmo` files.
//!
//! # Overview
//! The file starts with a fixed size [Pmo] header followed by sections in a fixed order.
//! ```text
//! header (0x40 bytes)
//! mesh group headers
//! tristrip headers (aligned to 16)
//! material remap (Freedom Unite only)
//! bone table
//! materials
//! mesh data
//! ```
//! Each mesh group is a single object with materials and submeshes.
//! A submesh draws a single material with at most 8 bone influences.
//!
//! The [MeshData] for each submesh is a GE display list
//! followed by the vertex and index buffers it references.
//! The [TristripHeader] for the submesh stores offsets into this data.
//!
//! Only counts and section contents are computed by [Pmo::new].
//! Offsets are computed while writing using the two pass approach in [pmo_write].
use std::io::{Seek, Write};

use binrw::BinWrite;
use log::trace;
use pmo_write::{
    round_up, write_padding, FieldPosition, Offset, PmoResult, PmoWrite, PmoWriteOffsets,
};
use thiserror::Error;

use crate::{
    ge::{self, Command, FrontFace, PrimitiveType},
    pmo_write_binwrite_impl,
    vertex::{IndexFormat, VertexType, MAX_WEIGHT_COUNT},
    Version,
};

const MESH_DATA_ALIGNMENT: u64 = 8;
const TRISTRIP_HEADER_ALIGNMENT: u64 = 16;
const MATERIAL_REMAP_ALIGNMENT: u64 = 16;
const BONE_TABLE_ALIGNMENT: u64 = 8;
const MIN_TABLE_SIZE: u64 = 16;

/// The size of the command preamble and trailer before the primitive commands.
const COMMAND_LIST_SIZE: u64 = 0x1C;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("mesh group {group:?} is degenerate: {kind}")]
    DegenerateMesh { group: String, kind: Degenerate },

    #[error("submesh {submesh} in mesh group {group:?} uses {count} bones but at most 8 are supported")]
    TooManyBones {
        group: String,
        submesh: usize,
        count: usize,
    },

    #[error("material index {index} in mesh group {group:?} is out of range for {count} materials")]
    MaterialIndexOutOfRange {
        group: String,
        index: usize,
        count: usize,
    },

    #[error("mesh group {group:?} has {count} materials but at most 256 are supported")]
    TooManyMaterials { group: String, count: usize },

    #[error("{count} {name} exceed the maximum count of {max}")]
    CountOverflow {
        name: &'static str,
        count: usize,
        max: usize,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Degenerate {
    NoMaterials,
    NoSubmeshes,
    EmptySubmesh(usize),
}

impl std::fmt::Display for Degenerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degenerate::NoMaterials => write!(f, "no materials"),
            Degenerate::NoSubmeshes => write!(f, "no submeshes"),
            Degenerate::EmptySubmesh(i) => write!(f, "submesh {i} has no vertices"),
        }
    }
}

/// The root of a `.pmo` file.
#[derive(Debug, PartialEq, Clone)]
pub struct Pmo {
    pub version: Version,
    /// The maximum absolute vertex coordinate.
    pub clipping_distance: f32,
    pub scale: [f32; 3],
    pub mesh_headers: Vec<MeshHeader>,
    /// The headers for all submeshes in mesh group order.
    pub tristrip_headers: Vec<TristripHeader>,
    /// Identity mapping for all materials. Only present for [Version::Fu].
    pub material_remap: Option<MaterialRemap>,
    pub bone_table: BoneTable,
    pub materials: Vec<Material>,
    /// The data for each header in [tristrip_headers](#structfield.tristrip_headers).
    pub meshes: Vec<MeshData>,
}

/// Input for a single mesh group for [Pmo::new].
#[derive(Debug, PartialEq, Clone)]
pub struct MeshGroup {
    /// Identifies the group in errors. Not written to the file.
    pub name: String,
    /// The position scale for the group.
    /// Only written for [Version::P3rd].
    pub scale: [f32; 3],
    /// The argument for the [Command::BlendMode] command.
    /// Only written for [Version::P3rd].
    pub blend_mode: u32,
    pub materials: Vec<Material>,
    pub submeshes: Vec<Submesh>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Submesh {
    /// Index into the materials of the group.
    pub material_index: usize,
    /// Global bone ids for each weight slot of the vertices.
    pub bone_ids: Vec<u8>,
    pub data: MeshData,
}

#[derive(Debug, BinWrite, PartialEq, Clone)]
pub enum MeshHeader {
    P3rd(P3rdMeshHeader),
    Fu(FuMeshHeader),
}

#[derive(Debug, BinWrite, PartialEq, Clone)]
pub struct P3rdMeshHeader {
    pub scale: [f32; 3],
    pub unk1: [f32; 5],
    pub unk2: u32,
    /// [Command::BlendMode] command word.
    pub blend_mode: u32,
    pub counts: MeshHeaderCounts,
}

#[derive(Debug, BinWrite, PartialEq, Clone)]
pub struct FuMeshHeader {
    pub uv_scale: [f32; 2],
    pub unk1: u32,
    pub unk2: u32,
    pub counts: MeshHeaderCounts,
}

/// Counts and prefix sums used to find the materials and submeshes for a group.
#[derive(Debug, BinWrite, PartialEq, Eq, Clone, Copy, Default)]
pub struct MeshHeaderCounts {
    pub material_count: u16,
    pub cumulative_material_count: u16,
    pub submesh_count: u16,
    pub cumulative_submesh_count: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TristripHeader {
    /// Index into the materials of the mesh group.
    pub material_index: u8,
    pub weight_count: u8,
    /// The sum of the weight counts of all previous submeshes.
    /// Bones for this submesh start at this index in the [BoneTable].
    pub cumulative_weight_count: u16,
}

#[derive(Debug)]
pub struct TristripHeaderOffsets {
    /// Offset of the [MeshData] relative to the start of the mesh data section.
    pub mesh_offset: FieldPosition<u32>,
    /// Offset of the vertex data relative to the start of the mesh data section.
    pub vertex_offset: FieldPosition<u32>,
    /// Offset of the index data relative to the start of the mesh data section.
    pub index_offset: FieldPosition<u32>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MaterialRemap {
    pub material_indices: Vec<u8>,
}

/// Pairs of weight slot and global bone id for every submesh.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct BoneTable {
    pub entries: Vec<BoneTableEntry>,
}

#[derive(Debug, BinWrite, PartialEq, Eq, Clone, Copy)]
pub struct BoneTableEntry {
    /// The weight index in the submesh vertices.
    pub slot: u8,
    pub bone_id: u8,
}

#[derive(Debug, BinWrite, PartialEq, Eq, Clone)]
pub struct Material {
    /// RGBA diffuse color.
    pub diffuse: [u8; 4],
    /// RGBA ambient or shadow color.
    pub ambient: [u8; 4],
    /// Index into the images in the `.tmh` file or `-1` for no texture.
    #[bw(pad_after = 4)]
    pub texture_index: i32,
}

/// A single draw command for [MeshData].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Primitive {
    pub primitive_type: PrimitiveType,
    pub front_face: FrontFace,
    pub vertex_count: u16,
}

/// The display list, vertices, and indices for a submesh.
#[derive(Debug, PartialEq, Clone)]
pub struct MeshData {
    pub vertex_type: VertexType,
    pub primitives: Vec<Primitive>,
    pub alpha_blend: bool,
    pub backface_culling: bool,
    /// Packed vertices using the format of [vertex_type](#structfield.vertex_type).
    pub vertex_data: Vec<u8>,
    /// Packed indices for all primitives in order.
    pub index_data: Vec<u8>,
}

impl Version {
    /// The 4 byte version tag in the model header.
    pub fn model_tag(&self) -> [u8; 4] {
        match self {
            Version::Fu => *b"1.0\0",
            Version::P3rd => *b"102\0",
        }
    }
}

impl Pmo {
    /// Compute the header counts and tables for `groups`.
    ///
    /// Returns an error if any group has no materials or submeshes
    /// or any submesh has no vertices.
    pub fn new(
        version: Version,
        clipping_distance: f32,
        scale: [f32; 3],
        groups: Vec<MeshGroup>,
    ) -> Result<Self, LayoutError> {
        validate_groups(&groups)?;

        let mut mesh_headers = Vec::new();
        let mut tristrip_headers = Vec::new();
        let mut bone_table = BoneTable::default();
        let mut materials = Vec::new();
        let mut meshes = Vec::new();

        let mut cumulative_weight_count = 0usize;
        for group in groups {
            let counts = MeshHeaderCounts {
                material_count: count_u16("materials", group.materials.len())?,
                cumulative_material_count: count_u16("materials", materials.len())?,
                submesh_count: count_u16("submeshes", group.submeshes.len())?,
                cumulative_submesh_count: count_u16("submeshes", tristrip_headers.len())?,
            };
            mesh_headers.push(match version {
                Version::P3rd => MeshHeader::P3rd(P3rdMeshHeader {
                    scale: group.scale,
                    unk1: [0.0, 1.0, 1.0, 0.0, 0.0],
                    unk2: 0x80000003,
                    blend_mode: ge::command(Command::BlendMode, group.blend_mode),
                    counts,
                }),
                Version::Fu => MeshHeader::Fu(FuMeshHeader {
                    uv_scale: [1.0, 1.0],
                    unk1: 0x80000003,
                    unk2: 0,
                    counts,
                }),
            });

            materials.extend(group.materials);

            for submesh in group.submeshes {
                tristrip_headers.push(TristripHeader {
                    material_index: count_u8("materials", submesh.material_index)?,
                    weight_count: submesh.bone_ids.len() as u8,
                    cumulative_weight_count: count_u16("bone weights", cumulative_weight_count)?,
                });
                cumulative_weight_count += submesh.bone_ids.len();

                bone_table
                    .entries
                    .extend(submesh.bone_ids.iter().enumerate().map(|(slot, bone_id)| {
                        BoneTableEntry {
                            slot: slot as u8,
                            bone_id: *bone_id,
                        }
                    }));

                meshes.push(submesh.data);
            }
        }

        count_u16("mesh groups", mesh_headers.len())?;
        trace!(
            "{} mesh groups, {} submeshes, {} bone table entries",
            mesh_headers.len(),
            tristrip_headers.len(),
            bone_table.entries.len()
        );

        let material_remap = match version {
            Version::Fu => Some(MaterialRemap {
                material_indices: (0..materials.len())
                    .map(|i| count_u8("materials", i))
                    .collect::<Result<_, _>>()?,
            }),
            Version::P3rd => None,
        };

        Ok(Self {
            version,
            clipping_distance,
            scale,
            mesh_headers,
            tristrip_headers,
            material_remap,
            bone_table,
            materials,
            meshes,
        })
    }
}

fn validate_groups(groups: &[MeshGroup]) -> Result<(), LayoutError> {
    for group in groups {
        let degenerate = |kind| LayoutError::DegenerateMesh {
            group: group.name.clone(),
            kind,
        };

        if group.materials.is_empty() {
            return Err(degenerate(Degenerate::NoMaterials));
        }
        if group.submeshes.is_empty() {
            return Err(degenerate(Degenerate::NoSubmeshes));
        }
        // Tristrip headers store the material index in a single byte.
        if group.materials.len() > u8::MAX as usize + 1 {
            return Err(LayoutError::TooManyMaterials {
                group: group.name.clone(),
                count: group.materials.len(),
            });
        }

        for (j, submesh) in group.submeshes.iter().enumerate() {
            if submesh.data.vertex_data.is_empty() {
                return Err(degenerate(Degenerate::EmptySubmesh(j)));
            }
            if submesh.bone_ids.len() > MAX_WEIGHT_COUNT {
                return Err(LayoutError::TooManyBones {
                    group: group.name.clone(),
                    submesh: j,
                    count: submesh.bone_ids.len(),
                });
            }
            if submesh.material_index >= group.materials.len() {
                return Err(LayoutError::MaterialIndexOutOfRange {
                    group: group.name.clone(),
                    index: submesh.material_index,
                    count: group.materials.len(),
                });
            }
        }
    }
    Ok(())
}

fn count_u16(name: &'static str, count: usize) -> Result<u16, LayoutError> {
    u16::try_from(count).map_err(|_| LayoutError::CountOverflow {
        name,
        count,
        max: u16::MAX as usize,
    })
}

fn count_u8(name: &'static str, count: usize) -> Result<u8, LayoutError> {
    u8::try_from(count).map_err(|_| LayoutError::CountOverflow {
        name,
        count,
        max: u8::MAX as usize,
    })
}

impl MeshData {
    fn is_indexed(&self) -> bool {
        self.vertex_type.index() != IndexFormat::None
    }

    /// The commands between the vertex type and the trailer.
    pub fn primitive_commands(&self) -> Vec<u32> {
        let mut commands = Vec::new();
        if self.alpha_blend {
            commands.push(ge::command(Command::AlphaBlendEnable, 1));
            commands.push(ge::command(Command::AlphaTest, ge::ALPHA_TEST_PARAMS));
        }

        let mut front_face = None;
        for primitive in &self.primitives {
            if front_face != Some(primitive.front_face) {
                front_face = Some(primitive.front_face);
                commands.push(ge::command(Command::FrontFace, primitive.front_face as u32));
            }
            commands.push(ge::prim(primitive.primitive_type, primitive.vertex_count));
        }

        if self.alpha_blend {
            commands.push(ge::command(Command::AlphaBlendEnable, 0));
        }
        if self.backface_culling {
            commands.push(ge::command(Command::BackfaceCullingEnable, 0));
        }
        commands
    }

    /// The offset of the vertex data relative to the start of this data.
    pub fn vertex_address(&self) -> u64 {
        let commands_size = COMMAND_LIST_SIZE + self.primitive_commands().len() as u64 * 4;
        round_up(commands_size, 8)
    }

    /// The offset of the index data relative to the start of this data
    /// or `0` if the submesh is not indexed.
    pub fn index_address(&self) -> u64 {
        if self.is_indexed() {
            round_up(self.vertex_address() + self.vertex_data.len() as u64, 8)
        } else {
            0
        }
    }
}

impl PmoWrite for MeshData {
    type Offsets<'a> = ();

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        let start = writer.stream_position()?;
        let vertex_address = self.vertex_address();
        let index_address = self.index_address();

        let mut commands = vec![
            ge::command(Command::Origin, 0),
            ge::command(Command::Base, 0),
        ];
        if self.is_indexed() {
            commands.push(ge::command(Command::IndexAddress, index_address as u32));
        }
        commands.push(ge::command(Command::VertexAddress, vertex_address as u32));
        commands.push(u32::from(self.vertex_type));
        commands.extend(self.primitive_commands());
        commands.push(ge::command(Command::OffsetAddress, 0));
        commands.push(ge::command(Command::Ret, 0));
        commands.pmo_write(writer, data_ptr)?;

        let relative = |writer: &mut W| -> std::io::Result<u64> {
            Ok(writer.stream_position()? - start)
        };

        let padding = vertex_address - relative(writer)?;
        vec![0u8; padding as usize].pmo_write(writer, data_ptr)?;
        self.vertex_data.pmo_write(writer, data_ptr)?;

        if self.is_indexed() {
            let padding = index_address - relative(writer)?;
            vec![0u8; padding as usize].pmo_write(writer, data_ptr)?;
            self.index_data.pmo_write(writer, data_ptr)?;
        }

        let end = relative(writer)?;
        vec![0u8; (round_up(end, 4) - end) as usize].pmo_write(writer, data_ptr)?;
        Ok(())
    }

    const ALIGNMENT: u64 = MESH_DATA_ALIGNMENT;
}

impl PmoWrite for TristripHeader {
    type Offsets<'a> = TristripHeaderOffsets;

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        self.material_index.pmo_write(writer, data_ptr)?;
        self.weight_count.pmo_write(writer, data_ptr)?;
        self.cumulative_weight_count.pmo_write(writer, data_ptr)?;
        Ok(TristripHeaderOffsets {
            mesh_offset: FieldPosition::write_placeholder(writer, data_ptr)?,
            vertex_offset: FieldPosition::write_placeholder(writer, data_ptr)?,
            index_offset: FieldPosition::write_placeholder(writer, data_ptr)?,
        })
    }
}

impl PmoWrite for MaterialRemap {
    type Offsets<'a> = ();

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        let start = writer.stream_position()?;
        self.material_indices.pmo_write(writer, data_ptr)?;
        write_table_padding(writer, data_ptr, start, MATERIAL_REMAP_ALIGNMENT)
    }

    const ALIGNMENT: u64 = MATERIAL_REMAP_ALIGNMENT;
}

impl PmoWrite for BoneTable {
    type Offsets<'a> = ();

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        let start = writer.stream_position()?;
        self.entries.pmo_write(writer, data_ptr)?;
        write_table_padding(writer, data_ptr, start, BONE_TABLE_ALIGNMENT)
    }

    const ALIGNMENT: u64 = 1;
}

// Tables are at least 16 bytes and padded to a multiple of the alignment.
fn write_table_padding<W: Write + Seek>(
    writer: &mut W,
    data_ptr: &mut u64,
    start: u64,
    alignment: u64,
) -> PmoResult<()> {
    let size = writer.stream_position()? - start;
    let padded_size = round_up(size, alignment).max(MIN_TABLE_SIZE);
    vec![0u8; (padded_size - size) as usize].pmo_write(writer, data_ptr)?;
    Ok(())
}

pmo_write_binwrite_impl!(MeshHeader, BoneTableEntry, Material);

pub struct PmoOffsets<'a> {
    pub file_size: FieldPosition<u32>,
    pub mesh_headers: Offset<'a, u32, Vec<MeshHeader>>,
    pub tristrip_headers: Offset<'a, u32, Vec<TristripHeader>>,
    pub material_remap: Offset<'a, u32, Option<MaterialRemap>>,
    pub bone_table: Offset<'a, u32, BoneTable>,
    pub materials: Offset<'a, u32, Vec<Material>>,
    pub mesh_data: FieldPosition<u32>,
    pub meshes: &'a [MeshData],
}

impl PmoWrite for Pmo {
    type Offsets<'a> = PmoOffsets<'a>;

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        b"pmo\0".pmo_write(writer, data_ptr)?;
        self.version.model_tag().pmo_write(writer, data_ptr)?;
        let file_size = FieldPosition::write_placeholder(writer, data_ptr)?;
        self.clipping_distance.pmo_write(writer, data_ptr)?;
        self.scale.pmo_write(writer, data_ptr)?;
        count_u16("mesh groups", self.mesh_headers.len())?.pmo_write(writer, data_ptr)?;
        count_u16("materials", self.materials.len())?.pmo_write(writer, data_ptr)?;

        let mesh_headers = Offset::write_placeholder(writer, data_ptr, &self.mesh_headers, None)?;
        let tristrip_headers = Offset::write_placeholder(
            writer,
            data_ptr,
            &self.tristrip_headers,
            Some(TRISTRIP_HEADER_ALIGNMENT),
        )?;
        let material_remap =
            Offset::write_placeholder(writer, data_ptr, &self.material_remap, None)?;
        let bone_table = Offset::write_placeholder(writer, data_ptr, &self.bone_table, None)?;
        let materials = Offset::write_placeholder(writer, data_ptr, &self.materials, None)?;
        let mesh_data = FieldPosition::write_placeholder(writer, data_ptr)?;
        [0u32; 2].pmo_write(writer, data_ptr)?;

        Ok(PmoOffsets {
            file_size,
            mesh_headers,
            tristrip_headers,
            material_remap,
            bone_table,
            materials,
            mesh_data,
            meshes: &self.meshes,
        })
    }
}

impl PmoWriteOffsets for PmoOffsets<'_> {
    fn write_offsets<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<()> {
        // Sections are written in increasing order by offset.
        self.mesh_headers.write_offset(writer, base_offset, data_ptr)?;
        let tristrip_headers = self
            .tristrip_headers
            .write_offset(writer, base_offset, data_ptr)?;
        self.material_remap
            .write_offset(writer, base_offset, data_ptr)?;
        self.bone_table.write_offset(writer, base_offset, data_ptr)?;
        self.materials.write_offset(writer, base_offset, data_ptr)?;

        write_padding(writer, data_ptr, MESH_DATA_ALIGNMENT, 0)?;
        let data_start = *data_ptr;
        self.mesh_data.set_offset(writer, data_start - base_offset)?;

        for (mesh, header) in self.meshes.iter().zip(&tristrip_headers.0) {
            write_padding(writer, data_ptr, MESH_DATA_ALIGNMENT, 0)?;
            let mesh_offset = *data_ptr - data_start;
            mesh.pmo_write(writer, data_ptr)?;

            header.mesh_offset.set_offset(writer, mesh_offset)?;
            header
                .vertex_offset
                .set_offset(writer, mesh_offset + mesh.vertex_address())?;
            header
                .index_offset
                .set_offset(writer, mesh_offset + mesh.index_address())?;
        }

        self.file_size.set_offset(writer, *data_ptr - base_offset)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::vertex::VertexFormat;
    use hexlit::hex;
    use pmo_write::assert_hex_eq;

    fn triangle_mesh(bone_count: usize) -> MeshData {
        let format = VertexFormat::with_weight_count(bone_count);
        let vertex_size = format.layout().size;
        MeshData {
            vertex_type: format.vertex_type(IndexFormat::UInt8),
            primitives: vec![Primitive {
                primitive_type: PrimitiveType::TriangleStrip,
                front_face: FrontFace::CounterClockwise,
                vertex_count: 3,
            }],
            alpha_blend: false,
            backface_culling: false,
            vertex_data: vec![0xAA; vertex_size * 3],
            index_data: vec![0, 1, 2],
        }
    }

    fn material() -> Material {
        Material {
            diffuse: [255, 255, 255, 255],
            ambient: [128, 128, 128, 255],
            texture_index: 0,
        }
    }

    fn triangle_group(bone_ids: Vec<u8>) -> MeshGroup {
        MeshGroup {
            name: "triangle".to_string(),
            scale: [1.0; 3],
            blend_mode: ge::DEFAULT_BLEND_MODE,
            materials: vec![material()],
            submeshes: vec![Submesh {
                material_index: 0,
                data: triangle_mesh(bone_ids.len()),
                bone_ids,
            }],
        }
    }

    #[test]
    fn write_single_triangle_p3rd() {
        let pmo = Pmo::new(
            Version::P3rd,
            1.0,
            [1.0; 3],
            vec![triangle_group(Vec::new())],
        )
        .unwrap();
        let bytes = pmo.to_bytes().unwrap();

        // header + group + tristrip + bone table + material + mesh data
        assert_eq!(0x40 + 0x30 + 0x10 + 0x10 + 0x10 + 0x5C, bytes.len());
        assert_hex_eq!(
            hex!(
                706d6f00 31303200 fc000000 0000803f
                0000803f 0000803f 0000803f 01000100
                40000000 70000000 00000000 80000000
                90000000 a0000000 00000000 00000000
            ),
            &bytes[..0x40]
        );
        assert_hex_eq!(
            hex!(
                0000803f 0000803f 0000803f 00000000
                0000803f 0000803f 00000000 00000000
                03000080 320000df 01000000 01000000
            ),
            &bytes[0x40..0x70]
        );
        assert_hex_eq!(
            hex!(00000000 00000000 28000000 58000000),
            &bytes[0x70..0x80]
        );
        assert_hex_eq!(
            hex!(00000000 00000000 00000000 00000000),
            &bytes[0x80..0x90]
        );
        assert_hex_eq!(
            hex!(ffffffff 808080ff 00000000 00000000),
            &bytes[0x90..0xA0]
        );
        assert_hex_eq!(
            hex!(
                00000014 00000010 58000002 28000001
                22090012 0000009b 03000404 00000013
                0000000b 00000000
            ),
            &bytes[0xA0..0xC8]
        );
        assert_hex_eq!(hex!(000102 00), &bytes[0xF8..0xFC]);
    }

    #[test]
    fn write_fu_material_remap() {
        let pmo = Pmo::new(Version::Fu, 1.0, [1.0; 3], vec![triangle_group(vec![3])]).unwrap();
        let bytes = pmo.to_bytes().unwrap();

        assert_hex_eq!(
            hex!(
                706d6f00 312e3000 fc000000 0000803f
                0000803f 0000803f 0000803f 01000100
                40000000 60000000 70000000 80000000
                90000000 a0000000 00000000 00000000
            ),
            &bytes[..0x40]
        );
        assert_hex_eq!(
            hex!(
                0000803f 0000803f 03000080 00000000
                01000000 01000000
            ),
            &bytes[0x40..0x58]
        );
        // Material remap and bone table.
        assert_hex_eq!(
            hex!(
                00000000 00000000 00000000 00000000
                00030000 00000000 00000000 00000000
            ),
            &bytes[0x70..0x90]
        );
    }

    #[test]
    fn cumulative_counts() {
        let pmo = Pmo::new(
            Version::P3rd,
            1.0,
            [1.0; 3],
            vec![
                triangle_group(vec![0, 1]),
                MeshGroup {
                    materials: vec![material(), material()],
                    submeshes: vec![
                        Submesh {
                            material_index: 1,
                            bone_ids: vec![2],
                            data: triangle_mesh(1),
                        },
                        Submesh {
                            material_index: 0,
                            bone_ids: vec![4, 5, 6],
                            data: triangle_mesh(3),
                        },
                    ],
                    ..triangle_group(Vec::new())
                },
            ],
        )
        .unwrap();

        let counts: Vec<_> = pmo
            .mesh_headers
            .iter()
            .map(|h| match h {
                MeshHeader::P3rd(h) => h.counts,
                MeshHeader::Fu(h) => h.counts,
            })
            .collect();
        assert_eq!(
            vec![
                MeshHeaderCounts {
                    material_count: 1,
                    cumulative_material_count: 0,
                    submesh_count: 1,
                    cumulative_submesh_count: 0
                },
                MeshHeaderCounts {
                    material_count: 2,
                    cumulative_material_count: 1,
                    submesh_count: 2,
                    cumulative_submesh_count: 1
                }
            ],
            counts
        );

        assert_eq!(
            vec![0, 2, 3],
            pmo.tristrip_headers
                .iter()
                .map(|h| h.cumulative_weight_count)
                .collect::<Vec<_>>()
        );
        assert_eq!(6, pmo.bone_table.entries.len());
        assert_eq!(
            BoneTableEntry {
                slot: 2,
                bone_id: 6
            },
            pmo.bone_table.entries[5]
        );
    }

    #[test]
    fn mesh_data_offsets_are_aligned() {
        let pmo = Pmo::new(
            Version::P3rd,
            1.0,
            [1.0; 3],
            vec![triangle_group(vec![0]), triangle_group(vec![0, 1, 2])],
        )
        .unwrap();
        let bytes = pmo.to_bytes().unwrap();

        let mesh_data_offset = u32::from_le_bytes(bytes[0x34..0x38].try_into().unwrap()) as usize;
        let tristrip_offset = u32::from_le_bytes(bytes[0x24..0x28].try_into().unwrap()) as usize;
        assert_eq!(0, tristrip_offset % 16);
        assert_eq!(0, mesh_data_offset % 8);

        for i in 0..2 {
            let header = &bytes[tristrip_offset + i * 16..tristrip_offset + (i + 1) * 16];
            let mesh_offset = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
            let vertex_offset = u32::from_le_bytes(header[8..12].try_into().unwrap()) as usize;
            assert_eq!(0, (mesh_data_offset + mesh_offset) % 8);
            assert_eq!(0, vertex_offset % 8);

            // The data starts with the origin command.
            let start = mesh_data_offset + mesh_offset;
            assert_eq!(hex!(00000014), bytes[start..start + 4]);
        }

        let file_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), file_size);
    }

    #[test]
    fn primitive_commands_alpha_blend_culling() {
        let mesh = MeshData {
            alpha_blend: true,
            backface_culling: true,
            primitives: vec![
                Primitive {
                    primitive_type: PrimitiveType::TriangleStrip,
                    front_face: FrontFace::Clockwise,
                    vertex_count: 4,
                },
                Primitive {
                    primitive_type: PrimitiveType::TriangleStrip,
                    front_face: FrontFace::Clockwise,
                    vertex_count: 3,
                },
                Primitive {
                    primitive_type: PrimitiveType::Triangles,
                    front_face: FrontFace::CounterClockwise,
                    vertex_count: 6,
                },
            ],
            ..triangle_mesh(0)
        };
        assert_eq!(
            vec![
                0x21000001, 0xDBFF0507, 0x9B000001, 0x04040004, 0x04040003, 0x9B000000, 0x04030006,
                0x21000000, 0x1D000000
            ],
            mesh.primitive_commands()
        );
        // 0x1C + 9 * 4 rounded up to 8.
        assert_eq!(0x40, mesh.vertex_address());
        assert_eq!(0x40 + 48, mesh.index_address());
    }

    #[test]
    fn unindexed_mesh_data() {
        let format = VertexFormat::with_weight_count(0);
        let mesh = MeshData {
            vertex_type: format.vertex_type(IndexFormat::None),
            index_data: Vec::new(),
            ..triangle_mesh(0)
        };
        assert_eq!(0, mesh.index_address());

        let mut writer = std::io::Cursor::new(Vec::new());
        mesh.pmo_write(&mut writer, &mut 0).unwrap();
        let bytes = writer.into_inner();
        // No index address command.
        assert_hex_eq!(
            hex!(00000014 00000010 28000001 22010012),
            &bytes[..0x10]
        );
        assert_eq!(0x28 + 42 + 2, bytes.len());
    }

    #[test]
    fn degenerate_no_materials() {
        let group = MeshGroup {
            name: "body".to_string(),
            materials: Vec::new(),
            ..triangle_group(Vec::new())
        };
        let result = Pmo::new(Version::P3rd, 1.0, [1.0; 3], vec![group]);
        assert!(matches!(
            result,
            Err(LayoutError::DegenerateMesh {
                group,
                kind: Degenerate::NoMaterials
            }) if group == "body"
        ));
    }

    #[test]
    fn degenerate_empty_submesh() {
        let mut group = triangle_group(Vec::new());
        group.name = "arm".to_string();
        group.submeshes[0].data.vertex_data.clear();
        let result = Pmo::new(
            Version::P3rd,
            1.0,
            [1.0; 3],
            vec![triangle_group(Vec::new()), group],
        );
        assert!(matches!(
            result,
            Err(LayoutError::DegenerateMesh {
                group,
                kind: Degenerate::EmptySubmesh(0)
            }) if group == "arm"
        ));
    }

    #[test]
    fn too_many_bones() {
        let result = Pmo::new(
            Version::P3rd,
            1.0,
            [1.0; 3],
            vec![triangle_group((0..9).collect())],
        );
        assert!(matches!(
            result,
            Err(LayoutError::TooManyBones { count: 9, .. })
        ));
    }

    #[test]
    fn material_index_above_u8() {
        let mut group = triangle_group(Vec::new());
        group.materials = vec![material(); 300];
        group.submeshes[0].material_index = 256;
        let result = Pmo::new(Version::Fu, 1.0, [1.0; 3], vec![group]);
        assert!(matches!(
            result,
            Err(LayoutError::TooManyMaterials { group, count: 300 }) if group == "triangle"
        ));
    }

    #[test]
    fn max_materials_in_group() {
        let mut group = triangle_group(Vec::new());
        group.materials = vec![material(); 256];
        group.submeshes[0].material_index = 255;
        let pmo = Pmo::new(Version::Fu, 1.0, [1.0; 3], vec![group]).unwrap();
        assert_eq!(255, pmo.tristrip_headers[0].material_index);
        assert_eq!(
            Some(255),
            pmo.material_remap
                .as_ref()
                .and_then(|r| r.material_indices.last().copied())
        );
    }

    #[test]
    fn fu_remap_above_u8() {
        let mut second = triangle_group(Vec::new());
        second.materials = vec![material(); 256];
        let result = Pmo::new(
            Version::Fu,
            1.0,
            [1.0; 3],
            vec![triangle_group(Vec::new()), second],
        );
        assert!(matches!(
            result,
            Err(LayoutError::CountOverflow {
                name: "materials",
                count: 256,
                max: 255
            })
        ));
    }
}
