//! Wall-clock and monotonic time
//!
//! Both readings go through `clock_time_get` with a precision hint of 0.
//! The host writes a 64-bit timestamp, so the destination is an aligned
//! slot in the flow's [`Scratch`] rather than a stack variable. There is no
//! fallback clock: a host error is fatal to the caller.

use crate::abi::{ClockId, Timestamp, clock, errno};
use crate::error::{RtError, RtResult};
use crate::platform::Host;
use crate::scratch::{Scratch, TimestampSlot};

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Split a nanosecond timestamp into whole seconds and the remainder
pub fn split_timestamp(ns: Timestamp) -> (i64, i32) {
    ((ns / NANOS_PER_SEC) as i64, (ns % NANOS_PER_SEC) as i32)
}

fn read_clock<H: Host>(host: &mut H, scratch: &mut Scratch, id: ClockId) -> RtResult<Timestamp> {
    let slot = scratch.timestamp(TimestampSlot::A)?;
    let rc = host.clock_time_get(id, 0, slot);
    if rc != errno::SUCCESS {
        return Err(RtError::Host {
            call: "clock_time_get",
            errno: rc,
        });
    }
    Ok(*slot)
}

/// Seconds since the Unix epoch and the nanosecond remainder
pub fn wall_clock<H: Host>(host: &mut H, scratch: &mut Scratch) -> RtResult<(i64, i32)> {
    read_clock(host, scratch, clock::REALTIME).map(split_timestamp)
}

/// Nanoseconds since an arbitrary fixed origin
pub fn monotonic<H: Host>(host: &mut H, scratch: &mut Scratch) -> RtResult<i64> {
    read_clock(host, scratch, clock::MONOTONIC).map(|ns| ns as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockHost;

    #[test]
    fn test_split_timestamp() {
        assert_eq!(split_timestamp(1_500_000_001), (1, 500_000_001));
        assert_eq!(split_timestamp(0), (0, 0));
        assert_eq!(split_timestamp(999_999_999), (0, 999_999_999));
        assert_eq!(split_timestamp(2_000_000_000), (2, 0));
    }

    #[test]
    fn test_wall_clock() {
        let mut host = MockHost::new().with_realtime(1_700_000_000_123_456_789);
        let mut scratch = Scratch::new();
        assert_eq!(
            wall_clock(&mut host, &mut scratch).unwrap(),
            (1_700_000_000, 123_456_789)
        );
    }

    #[test]
    fn test_monotonic_unmodified() {
        let mut host = MockHost::new().with_monotonic(42_000_000_007);
        let mut scratch = Scratch::new();
        assert_eq!(monotonic(&mut host, &mut scratch).unwrap(), 42_000_000_007);
    }

    #[test]
    fn test_clock_error() {
        let mut host = MockHost::new().fail("clock_time_get", errno::INVAL);
        let mut scratch = Scratch::new();
        let err = monotonic(&mut host, &mut scratch).unwrap_err();
        assert_eq!(
            err,
            RtError::Host {
                call: "clock_time_get",
                errno: errno::INVAL
            }
        );
        assert!(err.is_fatal());
    }
}
