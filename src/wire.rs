//! Little-endian wire primitives
//!
//! Every record exchanged with the host is built and read through these
//! helpers. The whole `offset..offset + width` range is checked before any
//! byte is touched, so a failed write never leaves a partial value behind.

use crate::error::{RtError, RtResult};

/// Checked range for a field of `width` bytes at `offset`
#[inline]
fn field(len: usize, offset: usize, width: usize) -> RtResult<core::ops::Range<usize>> {
    match offset.checked_add(width) {
        Some(end) if end <= len => Ok(offset..end),
        _ => Err(RtError::OutOfBounds { offset, width, len }),
    }
}

pub fn read_u16(buf: &[u8], offset: usize) -> RtResult<u16> {
    let range = field(buf.len(), offset, 2)?;
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(&buf[range]);
    Ok(u16::from_le_bytes(bytes))
}

pub fn read_u32(buf: &[u8], offset: usize) -> RtResult<u32> {
    let range = field(buf.len(), offset, 4)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[range]);
    Ok(u32::from_le_bytes(bytes))
}

pub fn read_u64(buf: &[u8], offset: usize) -> RtResult<u64> {
    let range = field(buf.len(), offset, 8)?;
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[range]);
    Ok(u64::from_le_bytes(bytes))
}

pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) -> RtResult<()> {
    let range = field(buf.len(), offset, 2)?;
    buf[range].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> RtResult<()> {
    let range = field(buf.len(), offset, 4)?;
    buf[range].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn write_u64(buf: &mut [u8], offset: usize, value: u64) -> RtResult<()> {
    let range = field(buf.len(), offset, 8)?;
    buf[range].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_little_endian_layout() {
        let mut buf = [0u8; 8];
        write_u32(&mut buf, 0, 0x0403_0201).unwrap();
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);

        write_u16(&mut buf, 6, 0xBEEF).unwrap();
        assert_eq!(&buf[6..], &[0xEF, 0xBE]);

        write_u64(&mut buf, 0, 0x0807_0605_0403_0201).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_failed_write_leaves_buffer_untouched() {
        let mut buf = [0xAAu8; 6];
        let err = write_u64(&mut buf, 0, u64::MAX).unwrap_err();
        assert_eq!(
            err,
            RtError::OutOfBounds {
                offset: 0,
                width: 8,
                len: 6
            }
        );
        assert_eq!(buf, [0xAA; 6]);
    }

    #[test]
    fn test_offset_overflow_is_out_of_bounds() {
        let buf = [0u8; 4];
        assert!(read_u32(&buf, usize::MAX).is_err());
        assert!(read_u16(&buf, usize::MAX - 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_u16_round_trip(len in 2usize..64, seed in any::<usize>(), v in any::<u16>()) {
            let offset = seed % (len - 1);
            let mut buf = vec![0u8; len];
            write_u16(&mut buf, offset, v).unwrap();
            prop_assert_eq!(read_u16(&buf, offset).unwrap(), v);
        }

        #[test]
        fn prop_u32_round_trip(len in 4usize..64, seed in any::<usize>(), v in any::<u32>()) {
            let offset = seed % (len - 3);
            let mut buf = vec![0u8; len];
            write_u32(&mut buf, offset, v).unwrap();
            prop_assert_eq!(read_u32(&buf, offset).unwrap(), v);
        }

        #[test]
        fn prop_u64_round_trip(len in 8usize..64, seed in any::<usize>(), v in any::<u64>()) {
            let offset = seed % (len - 7);
            let mut buf = vec![0u8; len];
            write_u64(&mut buf, offset, v).unwrap();
            prop_assert_eq!(read_u64(&buf, offset).unwrap(), v);
        }

        #[test]
        fn prop_one_past_the_end_fails(len in 8usize..64) {
            let mut buf = vec![0u8; len];
            prop_assert!(read_u16(&buf, len - 1).is_err());
            prop_assert!(read_u32(&buf, len - 3).is_err());
            prop_assert!(read_u64(&buf, len - 7).is_err());
            prop_assert!(write_u16(&mut buf, len - 1, 1).is_err());
            prop_assert!(write_u32(&mut buf, len - 3, 1).is_err());
            prop_assert!(write_u64(&mut buf, len - 7, 1).is_err());
            prop_assert!(buf.iter().all(|&b| b == 0));
        }
    }
}
