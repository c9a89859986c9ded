//! Host-provided random bytes
//!
//! Unlike every other host call in this crate, a `random_get` failure is
//! not fatal: callers get a fill count of zero and decide for themselves
//! whether to retry.

use crate::abi::errno;
use crate::error::{RtError, RtResult};
use crate::platform::Host;

/// Fill all of `buf`, reporting the host error if there is one
pub fn try_fill_random<H: Host>(host: &mut H, buf: &mut [u8]) -> RtResult<usize> {
    let rc = host.random_get(buf);
    if rc != errno::SUCCESS {
        return Err(RtError::Host {
            call: "random_get",
            errno: rc,
        });
    }
    Ok(buf.len())
}

/// Fill all of `buf`; returns the number of bytes filled (0 on host error)
pub fn fill_random<H: Host>(host: &mut H, buf: &mut [u8]) -> usize {
    try_fill_random(host, buf).unwrap_or(0)
}
