//! Skeletons in `.ahi` files.
//!
//! # Overview
//! ```text
//! tag
//! bone count + 1, file size
//! 0, root count, root table size, root bone ids
//! bone records
//! ```
//! Each bone record is stored at `id * record_size` from the start of the records.
//! The hierarchy is stored as parent, first child, and next sibling bone ids with `-1` for none.
use std::io::SeekFrom;

use binrw::BinWrite;
use log::warn;

use crate::Version;

const BONE_MAGIC: u32 = 0x40000001;
const NAME_LENGTH: usize = 7;
const FU_PADDING: usize = 184;

#[derive(Debug, PartialEq, Clone)]
pub struct Ahi {
    pub version: Version,
    /// Ids of bones without a parent in the order they appear in [bones](#structfield.bones).
    pub root_bone_ids: Vec<i32>,
    pub bones: Vec<Bone>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Bone {
    pub id: i32,
    /// The parent bone id or `-1` for root bones.
    pub parent: i32,
    pub first_child: i32,
    pub next_sibling: i32,
    pub scale: [f32; 3],
    /// The translation relative to the parent bone.
    pub translation: [f32; 3],
    /// Only written for [Version::Fu].
    pub chain_id: i32,
    /// Only written for [Version::P3rd].
    pub name: String,
}

impl Version {
    fn skeleton_tag(&self) -> u32 {
        match self {
            Version::Fu => 0xC0000000,
            Version::P3rd => 0x80000000,
        }
    }

    /// The size in bytes of each bone record.
    pub fn bone_record_size(&self) -> usize {
        match self {
            Version::Fu => 0x10C,
            Version::P3rd => 0x5C,
        }
    }
}

impl Ahi {
    /// Create a skeleton from `bones` in their original order.
    ///
    /// The [first_child](Bone::first_child), [next_sibling](Bone::next_sibling),
    /// and root bones are computed from the [parent](Bone::parent) of each bone.
    pub fn new(version: Version, mut bones: Vec<Bone>) -> Self {
        if version == Version::P3rd {
            for bone in bones.iter().filter(|b| b.name_bytes_len() > NAME_LENGTH) {
                warn!("Bone name {:?} will be truncated to 7 bytes.", bone.name);
            }
        }

        let root_bone_ids = bones
            .iter()
            .filter(|b| b.parent == -1)
            .map(|b| b.id)
            .collect();

        let first_children: Vec<_> = bones
            .iter()
            .map(|bone| {
                bones
                    .iter()
                    .filter(|b| b.parent == bone.id)
                    .map(|b| b.id)
                    .min()
                    .unwrap_or(-1)
            })
            .collect();

        // Chain bones with the same parent in list order.
        let next_siblings: Vec<_> = bones
            .iter()
            .enumerate()
            .map(|(i, bone)| {
                if bone.parent == -1 {
                    -1
                } else {
                    bones[i + 1..]
                        .iter()
                        .find(|b| b.parent == bone.parent)
                        .map(|b| b.id)
                        .unwrap_or(-1)
                }
            })
            .collect();

        for ((bone, first_child), next_sibling) in
            bones.iter_mut().zip(first_children).zip(next_siblings)
        {
            bone.first_child = first_child;
            bone.next_sibling = next_sibling;
        }

        Self {
            version,
            root_bone_ids,
            bones,
        }
    }

    fn root_table_size(&self) -> usize {
        12 + self.root_bone_ids.len() * 4
    }

    /// The size in bytes of the entire file.
    pub fn size(&self) -> usize {
        12 + self.root_table_size() + self.bones.len() * self.version.bone_record_size()
    }
}

impl BinWrite for Ahi {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        self.version.skeleton_tag().write_options(writer, endian, ())?;
        (self.bones.len() as u32 + 1).write_options(writer, endian, ())?;
        (self.size() as u32).write_options(writer, endian, ())?;

        0u32.write_options(writer, endian, ())?;
        (self.root_bone_ids.len() as u32).write_options(writer, endian, ())?;
        (self.root_table_size() as u32).write_options(writer, endian, ())?;
        self.root_bone_ids.write_options(writer, endian, ())?;

        let records_start = writer.stream_position()?;
        let record_size = self.version.bone_record_size() as u64;
        for bone in &self.bones {
            writer.seek(SeekFrom::Start(records_start + bone.id as u64 * record_size))?;
            bone.write_options(writer, endian, self.version)?;
        }
        Ok(())
    }
}

impl BinWrite for Bone {
    type Args<'a> = Version;

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        version: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        BONE_MAGIC.write_options(writer, endian, ())?;
        [
            1,
            version.bone_record_size() as i32,
            self.id,
            self.parent,
            self.first_child,
            self.next_sibling,
        ]
        .write_options(writer, endian, ())?;

        let [sx, sy, sz] = self.scale;
        let [tx, ty, tz] = self.translation;
        [sx, sy, sz, 1.0, 0.0, 0.0, 0.0, 1.0, tx, ty, tz, 1.0].write_options(writer, endian, ())?;
        (-1i32).write_options(writer, endian, ())?;

        match version {
            Version::Fu => {
                self.chain_id.write_options(writer, endian, ())?;
                [0u8; FU_PADDING].write_options(writer, endian, ())?;
            }
            Version::P3rd => {
                0i32.write_options(writer, endian, ())?;
                self.name_bytes().write_options(writer, endian, ())?;
            }
        }
        Ok(())
    }
}

impl Bone {
    fn base_name(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }

    fn name_bytes_len(&self) -> usize {
        self.base_name().len()
    }

    /// The name up to the first `.` truncated to 7 bytes and null padded.
    fn name_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        let name = self.base_name().as_bytes();
        let length = name.len().min(NAME_LENGTH);
        bytes[..length].copy_from_slice(&name[..length]);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hexlit::hex;
    use pmo_write::assert_hex_eq;

    fn bone(id: i32, parent: i32, name: &str) -> Bone {
        Bone {
            id,
            parent,
            first_child: 0,
            next_sibling: 0,
            scale: [1.0; 3],
            translation: [0.0; 3],
            chain_id: -1,
            name: name.to_string(),
        }
    }

    fn hierarchy(ahi: &Ahi) -> Vec<(i32, i32)> {
        ahi.bones
            .iter()
            .map(|b| (b.first_child, b.next_sibling))
            .collect()
    }

    #[test]
    fn sibling_chain() {
        let ahi = Ahi::new(
            Version::P3rd,
            vec![bone(0, -1, "A"), bone(1, 0, "B"), bone(2, 0, "C"), bone(3, 1, "D")],
        );
        assert_eq!(vec![0], ahi.root_bone_ids);
        assert_eq!(vec![(1, -1), (3, 2), (-1, -1), (-1, -1)], hierarchy(&ahi));
    }

    #[test]
    fn first_child_is_lowest_id() {
        let ahi = Ahi::new(
            Version::P3rd,
            vec![bone(0, -1, "A"), bone(2, 0, "B"), bone(1, 0, "C"), bone(3, -1, "D")],
        );
        assert_eq!(vec![0, 3], ahi.root_bone_ids);
        // Roots are not chained as siblings.
        assert_eq!(vec![(1, -1), (-1, 1), (-1, -1), (-1, -1)], hierarchy(&ahi));
    }

    #[test]
    fn write_p3rd() {
        let mut root = bone(0, -1, "root.000");
        root.translation = [1.0, 2.0, 3.0];
        let ahi = Ahi::new(Version::P3rd, vec![root, bone(1, 0, "longername")]);

        let bytes = ahi.to_bytes().unwrap();
        assert_eq!(ahi.size(), bytes.len());
        assert_hex_eq!(
            hex!(
                00000080 03000000 d4000000
                00000000 01000000 10000000 00000000
            ),
            &bytes[..0x1C]
        );
        assert_hex_eq!(
            hex!(
                01000040 01000000 5c000000 00000000
                ffffffff 01000000 ffffffff 0000803f
                0000803f 0000803f 0000803f 00000000
                00000000 00000000 0000803f 0000803f
                00000040 00004040 0000803f ffffffff
                00000000 726f6f74 00000000
            ),
            &bytes[0x1C..0x1C + 0x5C]
        );
        assert_hex_eq!(hex!(6c6f6e6765726e00), &bytes[bytes.len() - 8..]);
    }

    #[test]
    fn write_fu() {
        let mut child = bone(1, 0, "child");
        child.chain_id = 2;
        let ahi = Ahi::new(Version::Fu, vec![bone(0, -1, "root"), child]);

        let bytes = ahi.to_bytes().unwrap();
        assert_eq!(0x1C + 0x10C * 2, bytes.len());
        assert_hex_eq!(hex!(000000c0 03000000 34020000), &bytes[..12]);

        let record = &bytes[0x1C + 0x10C..];
        assert_hex_eq!(
            hex!(01000040 01000000 0c010000 01000000 00000000 ffffffff ffffffff),
            &record[..0x1C]
        );
        assert_hex_eq!(hex!(ffffffff 02000000), &record[0x4C..0x54]);
        assert!(record[0x54..].iter().all(|b| *b == 0));
    }
}
