use binrw::{prelude::*, Endian};
use std::io::{Read, Seek, SeekFrom, Write};

#[binrw::writer(writer, endian)]
pub fn write_u48(value: &u64) -> binrw::BinResult<()> {
    let (buf, range) = match endian {
        Endian::Little => (value.to_le_bytes(), 0..6),
        Endian::Big => (value.to_be_bytes(), 2..8),
    };
    writer.write_all(&buf[range]).map_err(Into::into)
}

#[binrw::parser(reader, endian)]
pub fn read_u48() -> binrw::BinResult<u64> {
    type ConvFn = fn([u8; 8]) -> u64;
    let mut buf = [0u8; 8];
    let (conv, out): (ConvFn, &mut [u8]) = match endian {
        Endian::Little => (u64::from_le_bytes, &mut buf[..6]),
        Endian::Big => (u64::from_be_bytes, &mut buf[2..]),
    };
    reader.read_exact(out)?;
    Ok(conv(buf))
}

/// Reads a `T` at an absolute offset in a self-relative structure,
/// restoring the stream position afterwards. An offset of zero means
/// the element is absent.
#[binrw::parser(reader, endian)]
pub fn read_at_offset<T>(offset: u32) -> binrw::BinResult<Option<T>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    if offset == 0 {
        return Ok(None);
    }
    let saved = reader.stream_position()?;
    reader.seek(SeekFrom::Start(offset as u64))?;
    let value = T::read_options(reader, endian, ())?;
    reader.seek(SeekFrom::Start(saved))?;
    Ok(Some(value))
}
