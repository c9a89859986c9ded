//! Single-buffer write
//!
//! The lowest output path in the runtime: one iovec, one `fd_write`. It is
//! what fatal diagnostics are printed through, so it has nothing further to
//! fall back on when the host refuses the write.

use crate::abi::{Fd, HostAddr, Iovec, Size, errno};
use crate::error::{RtError, RtResult};
use crate::platform::Host;

/// Length of `buf` as the host's 32-bit size
fn iovec_len(len: usize) -> RtResult<Size> {
    Size::try_from(len).map_err(|_| RtError::OutOfBounds {
        offset: 0,
        width: len,
        len: Size::MAX as usize,
    })
}

/// Write `buf` to `fd` with a single `fd_write`; returns bytes written
pub fn write_once<H: Host>(host: &mut H, fd: Fd, buf: &[u8]) -> RtResult<usize> {
    let buf_len = iovec_len(buf.len())?;
    let mut nwritten: Size = 0;
    let rc = HostAddr::pinned(buf, |addr| {
        let iovs = [Iovec::new(addr, buf_len)];
        host.fd_write(fd, &iovs, &mut nwritten)
    });
    if rc != errno::SUCCESS {
        return Err(RtError::Host {
            call: "fd_write",
            errno: rc,
        });
    }
    Ok(nwritten as usize)
}
