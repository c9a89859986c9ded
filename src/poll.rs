//! Blocking sleep via `poll_oneoff`
//!
//! A sleep is a single relative clock subscription on the monotonic clock.
//! The subscription and its event slot are staged in the flow's
//! [`Scratch`] so the 64-bit fields sit on 8-byte boundaries.
//!
//! The call blocks the whole execution flow until the host timer fires.
//! Nothing else runs in the meantime, and there is no way to cancel it
//! other than the timeout itself.

use crate::abi::{Size, Subscription, Userdata, clock, errno, eventtype};
use crate::console_log;
use crate::error::{RtError, RtResult};
use crate::platform::Host;
use crate::scratch::Scratch;

/// Precision hint carried by every sleep, in nanoseconds
pub const SLEEP_PRECISION_NS: u64 = 1_000;

/// Correlation tag carried by sleep subscriptions
pub const SLEEP_USERDATA: Userdata = 0;

const NANOS_PER_MICRO: u64 = 1_000;

/// Relative monotonic subscription for a sleep of `usec` microseconds
pub fn sleep_subscription(usec: u32) -> Subscription {
    Subscription::clock(
        SLEEP_USERDATA,
        clock::MONOTONIC,
        u64::from(usec) * NANOS_PER_MICRO,
        SLEEP_PRECISION_NS,
        0,
    )
}

/// Block for `usec` microseconds
pub fn sleep<H: Host>(host: &mut H, scratch: &mut Scratch, usec: u32) -> RtResult<()> {
    let (sub, event) = scratch.poll_records()?;
    *sub = sleep_subscription(usec);

    let mut nevents: Size = 0;
    let rc = host.poll_oneoff(
        core::slice::from_ref(sub),
        core::slice::from_mut(event),
        &mut nevents,
    );
    if rc != errno::SUCCESS {
        return Err(RtError::Host {
            call: "poll_oneoff",
            errno: rc,
        });
    }

    if nevents > 0 {
        if event.userdata() != SLEEP_USERDATA || event.event_type() != eventtype::CLOCK {
            console_log!("poll_oneoff: unexpected event {:?} for sleep", event);
        } else if event.error() != 0 {
            console_log!("poll_oneoff: clock event reported errno {}", event.error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::SubscriptionClock;
    use crate::platform::mock::MockHost;

    #[test]
    fn test_sleep_subscription_encoding() {
        let sub = sleep_subscription(2000);
        assert_eq!(sub.tag(), eventtype::CLOCK);
        assert_eq!(sub.userdata(), SLEEP_USERDATA);
        assert_eq!(
            sub.as_clock(),
            Some(SubscriptionClock {
                id: clock::MONOTONIC,
                timeout: 2_000_000,
                precision: 1_000,
                flags: 0,
            })
        );
    }

    #[test]
    fn test_sleep_max_usec_does_not_overflow() {
        let sub = sleep_subscription(u32::MAX);
        assert_eq!(sub.as_clock().unwrap().timeout, u64::from(u32::MAX) * 1_000);
    }

    #[test]
    fn test_sleep_issues_one_clock_subscription() {
        let mut host = MockHost::new().with_monotonic(1_000);
        let mut scratch = Scratch::new();

        sleep(&mut host, &mut scratch, 2000).unwrap();

        assert_eq!(host.subscriptions().len(), 1);
        let req = host.subscriptions()[0].as_clock().unwrap();
        assert_eq!(req.id, clock::MONOTONIC);
        assert_eq!(req.timeout, 2_000_000);
        assert_eq!(req.precision, 1_000);
        assert!(!req.is_absolute());
        assert_eq!(host.monotonic_ns(), 2_001_000);
    }

    #[test]
    fn test_sleep_reuses_scratch() {
        let mut host = MockHost::new();
        let mut scratch = Scratch::new();
        sleep(&mut host, &mut scratch, 1).unwrap();
        sleep(&mut host, &mut scratch, 3).unwrap();

        let timeouts: Vec<u64> = host
            .subscriptions()
            .iter()
            .map(|s| s.as_clock().unwrap().timeout)
            .collect();
        assert_eq!(timeouts, vec![1_000, 3_000]);
    }

    #[test]
    fn test_poll_error() {
        let mut host = MockHost::new().fail("poll_oneoff", errno::NOSYS);
        let mut scratch = Scratch::new();
        let err = sleep(&mut host, &mut scratch, 10).unwrap_err();
        assert_eq!(
            err,
            RtError::Host {
                call: "poll_oneoff",
                errno: errno::NOSYS
            }
        );
        assert!(err.is_fatal());
    }
}
