//! Archives in `.pac` files.
//!
//! # Overview
//! A [Pac] is a table of offsets and sizes followed by the data for each entry.
//! ```text
//! entry count
//! (offset, size) for each entry
//! padding to 16
//! entry 0
//! padding to 16
//! entry 1
//! ...
//! ```
//! Equipment archives store the model, skeleton, and textures in that order.
//! Helmets for Portable 3rd have an additional [HelmetData](crate::helmet::HelmetData) entry.
use std::io::{Seek, Write};

use pmo_write::{Offset, PmoResult, PmoWrite, PmoWriteOffsets};

const ENTRY_ALIGNMENT: u64 = 16;

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Pac {
    /// The bytes for each file in order.
    pub entries: Vec<Vec<u8>>,
}

pub struct PacOffsets<'a> {
    pub entries: Vec<Offset<'a, u32, Vec<u8>>>,
}

impl PmoWrite for Pac {
    type Offsets<'a> = PacOffsets<'a>;

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        u32::try_from(self.entries.len())?.pmo_write(writer, data_ptr)?;

        let entries = self
            .entries
            .iter()
            .map(|entry| {
                let offset =
                    Offset::write_placeholder(writer, data_ptr, entry, Some(ENTRY_ALIGNMENT))?;
                u32::try_from(entry.len())?.pmo_write(writer, data_ptr)?;
                Ok(offset)
            })
            .collect::<PmoResult<Vec<_>>>()?;

        Ok(PacOffsets { entries })
    }
}

impl PmoWriteOffsets for PacOffsets<'_> {
    fn write_offsets<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<()> {
        for entry in &self.entries {
            entry.write_offset(writer, base_offset, data_ptr)?;
        }
        Ok(())
    }
}
