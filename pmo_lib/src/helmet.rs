//! Helmet visibility data stored as the last entry of Portable 3rd helmet [Pac](crate::pac::Pac) files.
use bilge::prelude::*;
use binrw::BinWrite;

/// Parts of the face hidden by the helmet when unset.
#[bitsize(16)]
#[derive(DebugBits, FromBits, BinWrite, PartialEq, Clone, Copy)]
#[bw(map = |&x| u16::from(x))]
pub struct FaceFlags {
    pub forehead: bool,
    pub ears: bool,
    pub nape: bool,
    pub jaw: bool,
    pub nose: bool,
    pub eyes: bool,
    pub makeup1: bool,
    pub makeup2: bool,
    pub unk: u8,
}

impl Default for FaceFlags {
    fn default() -> Self {
        Self::new(true, true, true, true, true, true, true, true, 0)
    }
}

/// Parts of the hair hidden by the helmet when unset.
#[bitsize(16)]
#[derive(DebugBits, FromBits, BinWrite, PartialEq, Clone, Copy)]
#[bw(map = |&x| u16::from(x))]
pub struct HairFlags {
    pub scalp: bool,
    pub front: bool,
    pub front2: bool,
    pub back1: bool,
    pub back2: bool,
    pub back3: bool,
    pub unk: u10,
}

impl Default for HairFlags {
    fn default() -> Self {
        Self::from(0x00FFu16)
    }
}

#[derive(Debug, BinWrite, PartialEq, Clone, Copy, Default)]
pub struct HelmetData {
    pub face_flags: FaceFlags,
    pub hair_flags: HairFlags,
    pub physics_id: u32,
}
