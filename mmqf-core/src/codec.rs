/// Little-endian fixed-width integer codec over a byte buffer.
///
/// Every operation is total on offsets that fit within the buffer; anything
/// else fails with `BoundsError` rather than panicking, since these helpers
/// sit underneath both the header parser and (indirectly, via the atomic
/// views in `ring`) the control block.
use crate::error::{Error, Result};

fn check_bounds(buf_len: usize, offset: usize, width: usize) -> Result<()> {
    if offset.checked_add(width).map(|end| end > buf_len).unwrap_or(true) {
        return Err(Error::BoundsError(format!(
            "offset {} + width {} exceeds buffer length {}",
            offset, width, buf_len
        )));
    }
    Ok(())
}

pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    check_bounds(buf.len(), offset, 2)?;
    Ok(u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap()))
}

pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<()> {
    check_bounds(buf.len(), offset, 2)?;
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    check_bounds(buf.len(), offset, 4)?;
    Ok(u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()))
}

pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
    check_bounds(buf.len(), offset, 4)?;
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn read_u64(buf: &[u8], offset: usize) -> Result<u64> {
    check_bounds(buf.len(), offset, 8)?;
    Ok(u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap()))
}

pub fn write_u64(buf: &mut [u8], offset: usize, value: u64) -> Result<()> {
    check_bounds(buf.len(), offset, 8)?;
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn read_i16(buf: &[u8], offset: usize) -> Result<i16> {
    check_bounds(buf.len(), offset, 2)?;
    Ok(i16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap()))
}

pub fn write_i16(buf: &mut [u8], offset: usize, value: i16) -> Result<()> {
    check_bounds(buf.len(), offset, 2)?;
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    check_bounds(buf.len(), offset, 4)?;
    Ok(i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()))
}

pub fn write_i32(buf: &mut [u8], offset: usize, value: i32) -> Result<()> {
    check_bounds(buf.len(), offset, 4)?;
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn read_i64(buf: &[u8], offset: usize) -> Result<i64> {
    check_bounds(buf.len(), offset, 8)?;
    Ok(i64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap()))
}

pub fn write_i64(buf: &mut [u8], offset: usize, value: i64) -> Result<()> {
    check_bounds(buf.len(), offset, 8)?;
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    Ok(())
}
