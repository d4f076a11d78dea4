//! Texture containers in `.tmh` files.
use binrw::BinWrite;

use crate::gim::GimImage;

const MAGIC: &[u8; 8] = b".TMH0.14";

/// A list of [GimImage] indexed by the `texture_index` of model materials.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Tmh {
    pub images: Vec<GimImage>,
}

impl Tmh {
    pub fn new(images: Vec<GimImage>) -> Self {
        Self { images }
    }
}

impl BinWrite for Tmh {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        MAGIC.write_options(writer, endian, ())?;
        (self.images.len() as u32).write_options(writer, endian, ())?;
        0u32.write_options(writer, endian, ())?;
        self.images.write_options(writer, endian, ())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hexlit::hex;
    use pmo_write::assert_hex_eq;

    #[test]
    fn write_empty() {
        let bytes = Tmh::new(Vec::new()).to_bytes().unwrap();
        assert_hex_eq!(hex!(2e544d48 302e3134 00000000 00000000), &bytes);
    }

    #[test]
    fn write_images_back_to_back() {
        let image = GimImage::from_indices(1, 1, &[0], &[[1.0; 4]], false).unwrap();
        let size = image.size();
        let bytes = Tmh::new(vec![image.clone(), image]).to_bytes().unwrap();

        assert_eq!(0x10 + size * 2, bytes.len());
        assert_hex_eq!(hex!(02000000 00000000), &bytes[8..16]);
        assert_eq!(bytes[0x10..0x10 + size], bytes[0x10 + size..]);
    }
}
