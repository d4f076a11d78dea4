//! A library for writing the model, texture, skeleton and archive formats
//! used by PSP Monster Hunter games.
//!
//! Monster Hunter Freedom Unite and Monster Hunter Portable 3rd are supported.
//!
//! # Getting Started
//! Each format has its own module based on the name of the type representing the root of the file.
//! Only these top level types support writing to files.
//!
//! ```rust no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! use pmo_lib::pac::Pac;
//!
//! let pac = Pac {
//!     entries: vec![std::fs::read("model.pmo")?, std::fs::read("skeleton.ahi")?],
//! };
//! pac.write_to_file("out.pac")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! Each file format consists of a set of Rust types representing the structures in the binary file.
//! Types are constructed from already converted data and are only ever written.
//! Conversions from higher level data like floating point vertices or RGBA images
//! are handled by [pmo_model](https://docs.rs/pmo_model).
//!
//! Fixed size records are written with [binrw].
//! Files with offsets between sections use the two pass approach in [pmo_write]
//! to place each section after computing the final size of the previous section.
use std::{
    error::Error,
    io::{Seek, Write},
    path::Path,
};

use binrw::BinWrite;
use pmo_write::write_full;

pub mod ahi;
pub mod ge;
pub mod gim;
pub mod helmet;
pub mod pac;
pub mod pmo;
pub mod tmh;
pub mod vertex;

/// The game version that determines the layout of version specific records.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub enum Version {
    /// Monster Hunter Freedom Unite with model version tag `"1.0\0"`.
    Fu,
    /// Monster Hunter Portable 3rd with model version tag `"102\0"`.
    #[default]
    P3rd,
}

macro_rules! file_write_impl {
    ($($type_name:path),*) => {
        $(
            impl $type_name {
                pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<(), Box<dyn Error + Send + Sync>> {
                    self.write_le(writer).map_err(Into::into)
                }

                /// Serialize to memory and write to `path` only if serialization succeeded.
                pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error + Send + Sync>> {
                    let bytes = self.to_bytes()?;
                    std::fs::write(path, bytes).map_err(Into::into)
                }

                /// Write to an in memory buffer.
                pub fn to_bytes(&self) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
                    let mut writer = std::io::Cursor::new(Vec::new());
                    self.write_le(&mut writer)?;
                    Ok(writer.into_inner())
                }
            }
        )*
    };
}

file_write_impl!(ahi::Ahi, tmh::Tmh, helmet::HelmetData);

macro_rules! file_write_full_impl {
    ($($type_name:path),*) => {
        $(
            impl $type_name {
                pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<(), Box<dyn Error + Send + Sync>> {
                    write_full(self, writer, 0, &mut 0).map_err(Into::into)
                }

                /// Serialize to memory and write to `path` only if serialization succeeded.
                pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error + Send + Sync>> {
                    let bytes = self.to_bytes()?;
                    std::fs::write(path, bytes).map_err(Into::into)
                }

                /// Write to an in memory buffer.
                pub fn to_bytes(&self) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
                    let mut writer = std::io::Cursor::new(Vec::new());
                    self.write(&mut writer)?;
                    Ok(writer.into_inner())
                }
            }
        )*
    };
}

file_write_full_impl!(pmo::Pmo, pac::Pac);

#[macro_export]
macro_rules! pmo_write_binwrite_impl {
    ($($ty:ty),*) => {
        $(
            impl pmo_write::PmoWrite for $ty {
                type Offsets<'a> = ();

                fn pmo_write<W: std::io::Write + std::io::Seek>(
                    &self,
                    writer: &mut W,
                    data_ptr: &mut u64,
                ) -> pmo_write::PmoResult<Self::Offsets<'_>> {
                    binrw::BinWrite::write_le(self, writer)?;
                    *data_ptr = (*data_ptr).max(writer.stream_position()?);
                    Ok(())
                }

                const ALIGNMENT: u64 = std::mem::align_of::<$ty>() as u64;
            }
        )*

    };
}
