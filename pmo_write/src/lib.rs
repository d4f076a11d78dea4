//! Two pass writing for binary files with sections that reference each other by offset.
//!
//! The first pass ([PmoWrite]) writes every field in file order.
//! Offsets and sizes that depend on the position of later data are written as zeroed placeholders.
//! The second pass ([PmoWriteOffsets]) places the referenced data after the fields
//! in increasing file order and patches each placeholder once its position is known.
//!
//! Sections never need to know their final size before they are written.
//! The `data_ptr` argument tracks the end of all written data so far.
use std::{
    error::Error,
    io::{Seek, SeekFrom, Write},
    marker::PhantomData,
};

use thiserror::Error;

pub type PmoResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Debug, Error)]
#[error("value {value:#x} does not fit in a field of type {type_name}")]
pub struct OffsetRangeError {
    pub value: u64,
    pub type_name: &'static str,
}

/// Write fields and placeholders in file order.
pub trait PmoWrite {
    /// Placeholders for the second pass.
    type Offsets<'a>
    where
        Self: 'a;

    /// Write this value at the current position.
    /// `data_ptr` is advanced to at least the end of the written bytes.
    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>>;

    /// The default alignment of data referenced by an [Offset] to this type.
    const ALIGNMENT: u64 = 4;
}

/// Place referenced data and patch placeholders.
pub trait PmoWriteOffsets {
    /// Write the data for each placeholder at `data_ptr`.
    ///
    /// Placeholders must be handled in the order their data should appear in the file.
    /// Offsets are stored relative to `base_offset`.
    fn write_offsets<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<()>;
}

/// Run both passes for `value`.
pub fn write_full<'a, T, W>(
    value: &'a T,
    writer: &mut W,
    base_offset: u64,
    data_ptr: &mut u64,
) -> PmoResult<()>
where
    W: Write + Seek,
    T: PmoWrite + 'static,
    T::Offsets<'a>: PmoWriteOffsets,
{
    value
        .pmo_write(writer, data_ptr)?
        .write_offsets(writer, base_offset, data_ptr)
}

fn checked_value<P: TryFrom<u64>>(value: u64) -> Result<P, OffsetRangeError> {
    P::try_from(value).map_err(|_| OffsetRangeError {
        value,
        type_name: std::any::type_name::<P>(),
    })
}

/// Overwrite the bytes at `position` with `value` without moving the writer.
fn patch<P, W>(writer: &mut W, position: u64, value: u64) -> PmoResult<()>
where
    P: TryFrom<u64> + PmoWrite,
    W: Write + Seek,
{
    let value: P = checked_value(value)?;

    let end = writer.stream_position()?;
    writer.seek(SeekFrom::Start(position))?;
    value.pmo_write(writer, &mut 0)?;
    writer.seek(SeekFrom::Start(end))?;
    Ok(())
}

/// A field like a size or relative offset with a value known only after later data is written.
pub struct FieldPosition<P> {
    pub position: u64,
    phantom: PhantomData<P>,
}

impl<P> std::fmt::Debug for FieldPosition<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldPosition")
            .field("position", &self.position)
            .field("type", &std::any::type_name::<P>())
            .finish()
    }
}

impl<P> FieldPosition<P>
where
    P: TryFrom<u64> + PmoWrite + Default,
{
    /// Write a zeroed `P` at the current position.
    pub fn write_placeholder<W: Write + Seek>(
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self> {
        let position = writer.stream_position()?;
        P::default().pmo_write(writer, data_ptr)?;
        Ok(Self {
            position,
            phantom: PhantomData,
        })
    }

    /// Replace the placeholder with `value`.
    /// The writer position is unchanged.
    pub fn set_offset<W: Write + Seek>(&self, writer: &mut W, value: u64) -> PmoResult<()> {
        patch::<P, W>(writer, self.position, value)
    }
}

/// An offset of type `P` to `data`.
pub struct Offset<'a, P, T> {
    pub position: u64,
    pub data: &'a T,
    /// Overrides the [PmoWrite::ALIGNMENT] of the data.
    pub field_alignment: Option<u64>,
    phantom: PhantomData<P>,
}

impl<P, T> std::fmt::Debug for Offset<'_, P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offset")
            .field("position", &self.position)
            .field("data", &std::any::type_name::<T>())
            .field("field_alignment", &self.field_alignment)
            .finish()
    }
}

impl<'a, P, T> Offset<'a, P, T>
where
    P: TryFrom<u64> + PmoWrite + Default,
{
    /// Write a zeroed `P` at the current position for `data` placed in the second pass.
    pub fn write_placeholder<W: Write + Seek>(
        writer: &mut W,
        data_ptr: &mut u64,
        data: &'a T,
        field_alignment: Option<u64>,
    ) -> PmoResult<Self> {
        let position = writer.stream_position()?;
        P::default().pmo_write(writer, data_ptr)?;
        Ok(Self {
            position,
            data,
            field_alignment,
            phantom: PhantomData,
        })
    }

    /// Pad `data_ptr` to the alignment, patch the offset, and leave the writer at the data.
    fn place<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
        type_alignment: u64,
    ) -> PmoResult<()> {
        let alignment = self.field_alignment.unwrap_or(type_alignment);
        let start = round_up(*data_ptr, alignment);
        patch::<P, W>(writer, self.position, start - base_offset)?;
        write_padding(writer, data_ptr, alignment, 0)
    }
}

impl<P, T> Offset<'_, P, T>
where
    T: PmoWrite,
    P: TryFrom<u64> + PmoWrite + Default,
{
    /// Write the data and return its placeholders without writing them.
    pub fn write_offset<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<T::Offsets<'_>> {
        self.place(writer, base_offset, data_ptr, T::ALIGNMENT)?;
        self.data.pmo_write(writer, data_ptr)
    }
}

impl<P, T> Offset<'_, P, Option<T>>
where
    T: PmoWrite,
    P: TryFrom<u64> + PmoWrite + Default,
{
    /// Missing data keeps an offset of 0.
    pub fn write_offset<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<Option<T::Offsets<'_>>> {
        self.data
            .as_ref()
            .map(|data| {
                self.place(writer, base_offset, data_ptr, T::ALIGNMENT)?;
                data.pmo_write(writer, data_ptr)
            })
            .transpose()
    }
}

impl<'a, P, T> Offset<'a, P, T>
where
    T: PmoWrite + 'static,
    T::Offsets<'a>: PmoWriteOffsets,
    P: TryFrom<u64> + PmoWrite + Default,
{
    /// Write the data and everything it references.
    pub fn write_full<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<()> {
        self.place(writer, base_offset, data_ptr, T::ALIGNMENT)?;
        write_full(self.data, writer, base_offset, data_ptr)
    }
}

impl<'a, P, T> Offset<'a, P, Option<T>>
where
    T: PmoWrite + 'static,
    T::Offsets<'a>: PmoWriteOffsets,
    P: TryFrom<u64> + PmoWrite + Default,
{
    pub fn write_full<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<()> {
        match self.data {
            Some(data) => {
                self.place(writer, base_offset, data_ptr, T::ALIGNMENT)?;
                write_full(data, writer, base_offset, data_ptr)
            }
            None => Ok(()),
        }
    }
}

macro_rules! pmo_write_impl {
    ($($ty:ty),*) => {
        $(
            impl PmoWrite for $ty {
                type Offsets<'a> = ();

                fn pmo_write<W: Write + Seek>(
                    &self,
                    writer: &mut W,
                    data_ptr: &mut u64,
                ) -> PmoResult<Self::Offsets<'_>> {
                    writer.write_all(&self.to_le_bytes())?;
                    advance(writer, data_ptr)
                }

                const ALIGNMENT: u64 = std::mem::align_of::<$ty>() as u64;
            }
        )*
    };
}

pmo_write_impl!(i8, i16, i32, u8, u16, u32, u64, f32);

fn advance<W: Seek>(writer: &mut W, data_ptr: &mut u64) -> PmoResult<()> {
    *data_ptr = (*data_ptr).max(writer.stream_position()?);
    Ok(())
}

impl<const N: usize, T> PmoWrite for [T; N]
where
    T: PmoWrite + 'static,
{
    type Offsets<'a> = ();

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        self.iter()
            .try_for_each(|v| v.pmo_write(writer, data_ptr).map(|_| ()))
    }

    const ALIGNMENT: u64 = T::ALIGNMENT;
}

/// The placeholders for each item of a [Vec].
pub struct VecOffsets<T>(pub Vec<T>);

impl<T> PmoWrite for Vec<T>
where
    T: PmoWrite + 'static,
{
    type Offsets<'a> = VecOffsets<T::Offsets<'a>>;

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        // Byte buffers like vertex data are written in a single call.
        let offsets = match <dyn std::any::Any>::downcast_ref::<Vec<u8>>(self) {
            Some(bytes) => {
                writer.write_all(bytes)?;
                Vec::new()
            }
            None => self
                .iter()
                .map(|v| v.pmo_write(writer, data_ptr))
                .collect::<PmoResult<Vec<_>>>()?,
        };
        advance(writer, data_ptr)?;
        Ok(VecOffsets(offsets))
    }

    const ALIGNMENT: u64 = T::ALIGNMENT;
}

impl<T> PmoWriteOffsets for VecOffsets<T>
where
    T: PmoWriteOffsets,
{
    fn write_offsets<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<()> {
        self.0
            .iter()
            .try_for_each(|o| o.write_offsets(writer, base_offset, data_ptr))
    }
}

impl PmoWrite for () {
    type Offsets<'a> = ();

    fn pmo_write<W: Write + Seek>(
        &self,
        _writer: &mut W,
        _data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        Ok(())
    }

    const ALIGNMENT: u64 = 1;
}

impl PmoWriteOffsets for () {
    fn write_offsets<W: Write + Seek>(
        &self,
        _writer: &mut W,
        _base_offset: u64,
        _data_ptr: &mut u64,
    ) -> PmoResult<()> {
        Ok(())
    }
}

/// Round `x` up to the next multiple of `n`.
pub const fn round_up(x: u64, n: u64) -> u64 {
    x.div_ceil(n) * n
}

/// Write `padding_byte` from `data_ptr` up to the next multiple of `alignment`.
pub fn write_padding<W: Write + Seek>(
    writer: &mut W,
    data_ptr: &mut u64,
    alignment: u64,
    padding_byte: u8,
) -> PmoResult<()> {
    writer.seek(SeekFrom::Start(*data_ptr))?;
    let padding = round_up(*data_ptr, alignment) - *data_ptr;
    vec![padding_byte; padding as usize].pmo_write(writer, data_ptr)?;
    Ok(())
}

#[doc(hidden)]
#[macro_export]
macro_rules! assert_hex_eq {
    ($a:expr, $b:expr) => {
        pretty_assertions::assert_str_eq!(hex::encode($a), hex::encode($b))
    };
}
