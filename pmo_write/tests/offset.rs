use std::io::{Cursor, Seek, Write};

use hexlit::hex;
use pmo_write::{
    assert_hex_eq, write_full, Offset, PmoResult, PmoWrite, PmoWriteOffsets, VecOffsets,
};

struct Test {
    a: u32,
    items: Vec<u16>,
    optional: Option<Vec<u8>>,
}

struct TestOffsets<'a> {
    items: Offset<'a, u32, Vec<u16>>,
    optional: Offset<'a, u32, Option<Vec<u8>>>,
}

impl PmoWrite for Test {
    type Offsets<'a> = TestOffsets<'a>;

    fn pmo_write<W: Write + Seek>(
        &self,
        writer: &mut W,
        data_ptr: &mut u64,
    ) -> PmoResult<Self::Offsets<'_>> {
        self.a.pmo_write(writer, data_ptr)?;
        let items = Offset::write_placeholder(writer, data_ptr, &self.items, Some(8))?;
        let optional = Offset::write_placeholder(writer, data_ptr, &self.optional, None)?;
        Ok(TestOffsets { items, optional })
    }
}

impl PmoWriteOffsets for TestOffsets<'_> {
    fn write_offsets<W: Write + Seek>(
        &self,
        writer: &mut W,
        base_offset: u64,
        data_ptr: &mut u64,
    ) -> PmoResult<()> {
        let VecOffsets(_) = self.items.write_offset(writer, base_offset, data_ptr)?;
        self.optional.write_full(writer, base_offset, data_ptr)?;
        Ok(())
    }
}

#[test]
fn write_offset_aligned() {
    let value = Test {
        a: 1,
        items: vec![2, 3],
        optional: Some(vec![4]),
    };

    let mut writer = Cursor::new(Vec::new());
    let mut data_ptr = 0;
    write_full(&value, &mut writer, 0, &mut data_ptr).unwrap();

    assert_hex_eq!(
        hex!(01000000 10000000 14000000 00000000 02000300 04),
        writer.into_inner()
    );
    assert_eq!(21, data_ptr);
}

#[test]
fn write_offset_none() {
    let value = Test {
        a: 1,
        items: Vec::new(),
        optional: None,
    };

    let mut writer = Cursor::new(Vec::new());
    let mut data_ptr = 0;
    write_full(&value, &mut writer, 0, &mut data_ptr).unwrap();

    // The empty list still gets an aligned offset.
    assert_hex_eq!(
        hex!(01000000 10000000 00000000 00000000),
        writer.into_inner()
    );
    assert_eq!(16, data_ptr);
}

#[test]
fn write_offset_base_offset() {
    let value = Test {
        a: 1,
        items: vec![2],
        optional: None,
    };

    let mut writer = Cursor::new(Vec::new());
    let mut data_ptr = 0;
    write_full(&value, &mut writer, 4, &mut data_ptr).unwrap();

    assert_hex_eq!(
        hex!(01000000 0c000000 00000000 00000000 0200),
        writer.into_inner()
    );
}

#[test]
fn write_offset_out_of_range() {
    struct Small {
        data: Vec<u8>,
    }

    impl PmoWrite for Small {
        type Offsets<'a> = Offset<'a, u8, Vec<u8>>;

        fn pmo_write<W: Write + Seek>(
            &self,
            writer: &mut W,
            data_ptr: &mut u64,
        ) -> PmoResult<Self::Offsets<'_>> {
            Offset::write_placeholder(writer, data_ptr, &self.data, Some(1))
        }
    }

    let value = Small { data: vec![0] };
    let mut writer = Cursor::new(Vec::new());
    let offsets = value.pmo_write(&mut writer, &mut 0).unwrap();
    let result = offsets.write_offset(&mut writer, 0, &mut 256);
    assert!(result.is_err());
}
