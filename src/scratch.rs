//! Scratch region for host-call staging
//!
//! The host requires 8-byte alignment for every 64-bit field it reads or
//! writes, and the general allocator makes no such promise for byte
//! buffers. A [`Scratch`] is a fixed block of at least [`SCRATCH_SIZE`]
//! bytes from which aligned slots are carved: every slot's offset is
//! rounded up so that its *address* lands on an 8-byte boundary.
//!
//! One scratch region belongs to one flow of execution. It is borrowed
//! mutably for the whole host call, so no other staging can alias it while
//! the host may still touch it. A second flow needs its own region.
//!
//! ```text
//! offset  0 (rounded up)   timestamp slot A    8 bytes
//! offset 16 (rounded up)   timestamp slot B    8 bytes
//! offset 32 (rounded up)   subscription       48 bytes
//!                          event              32 bytes
//! ```

use crate::abi::{Event, Subscription, Timestamp};
use crate::error::{RtError, RtResult};

/// Minimum scratch size in bytes
pub const SCRATCH_SIZE: usize = 1024;

/// Alignment the host expects for 64-bit fields
pub const HOST_ALIGN: usize = 8;

const POLL_OFFSET: usize = 32;

/// Round `addr` up to the next multiple of [`HOST_ALIGN`]
pub const fn align_up(addr: usize) -> usize {
    (addr + (HOST_ALIGN - 1)) & !(HOST_ALIGN - 1)
}

/// Bytes to skip so that `addr` becomes aligned
pub const fn padding_for(addr: usize) -> usize {
    align_up(addr) - addr
}

/// Which of the two 64-bit timestamp slots to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSlot {
    A,
    B,
}

impl TimestampSlot {
    fn offset(self) -> usize {
        match self {
            TimestampSlot::A => 0,
            TimestampSlot::B => 16,
        }
    }
}

/// Per-flow staging block for host records
pub struct Scratch {
    buf: Box<[u8]>,
    /// Offset of the region's base within `buf`
    start: usize,
}

impl Scratch {
    pub fn new() -> Self {
        Self::with_size(SCRATCH_SIZE)
    }

    /// Scratch of `size` bytes, never smaller than [`SCRATCH_SIZE`]
    pub fn with_size(size: usize) -> Self {
        Self {
            buf: vec![0u8; size.max(SCRATCH_SIZE)].into_boxed_slice(),
            start: 0,
        }
    }

    /// Scratch whose base address sits 4 bytes past an 8-byte boundary
    #[cfg(test)]
    fn misaligned() -> Self {
        let mut scratch = Self::with_size(SCRATCH_SIZE + 2 * HOST_ALIGN);
        let addr = scratch.buf.as_ptr() as usize;
        scratch.start = padding_for(addr) + 4;
        scratch
    }

    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn base_addr(&self) -> usize {
        self.buf[self.start..].as_ptr() as usize
    }

    /// First offset at or after `offset` whose address is 8-byte aligned
    pub fn aligned_offset(&self, offset: usize) -> usize {
        offset + padding_for(self.base_addr() + offset)
    }

    /// Aligned, bounds-checked slice of `len` bytes starting at or after `offset`
    fn region(&mut self, offset: usize, len: usize) -> RtResult<&mut [u8]> {
        let start = self.aligned_offset(offset);
        let total = self.len();
        let base = self.start;
        match start.checked_add(len) {
            Some(end) if end <= total => Ok(&mut self.buf[base + start..base + end]),
            _ => Err(RtError::OutOfBounds {
                offset: start,
                width: len,
                len: total,
            }),
        }
    }

    /// An aligned, zeroed 64-bit slot for a host-written timestamp
    pub fn timestamp(&mut self, slot: TimestampSlot) -> RtResult<&mut Timestamp> {
        let bytes = self.region(slot.offset(), 8)?;
        let addr = bytes.as_ptr() as usize;
        let value = bytemuck::try_from_bytes_mut::<Timestamp>(bytes)
            .map_err(|_| RtError::Misaligned { addr })?;
        *value = 0;
        Ok(value)
    }

    /// Aligned, zeroed subscription and event records for one poll
    pub fn poll_records(&mut self) -> RtResult<(&mut Subscription, &mut Event)> {
        let bytes = self.region(POLL_OFFSET, Subscription::SIZE + Event::SIZE)?;
        bytes.fill(0);
        let addr = bytes.as_ptr() as usize;
        let (sub, event) = bytes.split_at_mut(Subscription::SIZE);
        let sub = bytemuck::try_from_bytes_mut::<Subscription>(sub)
            .map_err(|_| RtError::Misaligned { addr })?;
        let event = bytemuck::try_from_bytes_mut::<Event>(event).map_err(|_| {
            RtError::Misaligned {
                addr: addr + Subscription::SIZE,
            }
        })?;
        Ok((sub, event))
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scratch")
            .field("base", &format_args!("{:#x}", self.base_addr()))
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_for() {
        assert_eq!(padding_for(0x1000), 0);
        assert_eq!(padding_for(0x1004), 4);
        assert_eq!(padding_for(0x1001), 7);
        assert_eq!(padding_for(0x1007), 1);
    }

    #[test]
    fn test_minimum_size() {
        assert_eq!(Scratch::with_size(16).len(), SCRATCH_SIZE);
        assert_eq!(Scratch::with_size(4096).len(), 4096);
    }

    #[test]
    fn test_aligned_offset_lands_on_boundary() {
        let scratch = Scratch::new();
        for offset in 0..16 {
            let aligned = scratch.aligned_offset(offset);
            assert!(aligned >= offset && aligned < offset + HOST_ALIGN);
            assert_eq!((scratch.base_addr() + aligned) % HOST_ALIGN, 0);
        }
    }

    #[test]
    fn test_timestamp_slots_are_aligned_and_distinct() {
        let mut scratch = Scratch::new();

        let a = scratch.timestamp(TimestampSlot::A).unwrap() as *mut Timestamp as usize;
        let b = scratch.timestamp(TimestampSlot::B).unwrap() as *mut Timestamp as usize;
        assert_eq!(a % 8, 0);
        assert_eq!(b % 8, 0);
        assert!(b >= a + 8);
    }

    #[test]
    fn test_poll_records_are_aligned() {
        let mut scratch = Scratch::new();
        let (sub, event) = scratch.poll_records().unwrap();
        assert_eq!(sub as *mut Subscription as usize % 8, 0);
        assert_eq!(event as *mut Event as usize % 8, 0);
        assert_eq!(sub.tag(), 0);
        assert_eq!(event.userdata(), 0);
    }

    #[test]
    fn test_misaligned_base_skips_forward() {
        let mut scratch = Scratch::misaligned();
        assert_eq!(scratch.base_addr() % HOST_ALIGN, 4);
        assert!(scratch.len() >= SCRATCH_SIZE);
        assert_eq!(scratch.aligned_offset(POLL_OFFSET), POLL_OFFSET + 4);

        let slot = scratch.timestamp(TimestampSlot::A).unwrap() as *mut Timestamp as usize;
        assert_eq!(slot % 8, 0);

        let base = scratch.base_addr();
        let (sub, event) = scratch.poll_records().unwrap();
        let sub_addr = sub as *mut Subscription as usize;
        let event_addr = event as *mut Event as usize;
        assert_eq!(sub_addr % 8, 0);
        assert_eq!(event_addr % 8, 0);
        assert_eq!(sub_addr - base, POLL_OFFSET + 4);
        assert_eq!(event_addr, sub_addr + Subscription::SIZE);
    }

    #[test]
    fn test_misaligned_base_still_polls() {
        use crate::platform::mock::MockHost;

        let mut host = MockHost::new();
        let mut scratch = Scratch::misaligned();
        crate::poll::sleep(&mut host, &mut scratch, 2000).unwrap();
        let req = host.subscriptions()[0].as_clock().unwrap();
        assert_eq!(req.timeout, 2_000_000);
        assert_eq!(req.precision, 1_000);
    }
}
