//! Host Abstraction Layer
//!
//! [`Host`] mirrors the WASI preview1 imports this adapter uses, one method
//! per import, with the same argument order and widths:
//!
//! - WASI preview1 hosts (wasmtime, wasmer, ...) via [`wasi::Wasip1`]
//! - An in-memory scripted host for native builds and tests via
//!   [`mock::MockHost`]
//!
//! Implementations check only what memory safety needs. Every method
//! returns the raw errno (0 = success); interpreting it is the caller's job.

#[cfg(target_os = "wasi")]
pub mod wasi;

pub mod mock;

use crate::abi::{ClockId, Errno, Event, Fd, HostAddr, Iovec, Size, Subscription, Timestamp};

/// The preview1 import surface
pub trait Host {
    // ===== Process =====

    /// `proc_exit`: terminate the process, never returns
    fn proc_exit(&mut self, code: u32) -> !;

    // ===== Arguments & environment =====

    /// `args_sizes_get`: entry count and total byte length of the argument data
    fn args_sizes_get(&mut self, argc: &mut Size, argv_buf_len: &mut Size) -> Errno;

    /// `args_get`: fill the address index and the NUL-terminated data buffer
    ///
    /// Each `argv[i]` is written as a host address inside `argv_buf`.
    fn args_get(&mut self, argv: &mut [HostAddr], argv_buf: &mut [u8]) -> Errno;

    /// `environ_sizes_get`
    fn environ_sizes_get(&mut self, environc: &mut Size, environ_buf_len: &mut Size) -> Errno;

    /// `environ_get`
    fn environ_get(&mut self, environ: &mut [HostAddr], environ_buf: &mut [u8]) -> Errno;

    // ===== Clocks =====

    /// `clock_time_get`: `time` must be 8-byte aligned
    fn clock_time_get(&mut self, id: ClockId, precision: Timestamp, time: &mut Timestamp)
    -> Errno;

    // ===== I/O =====

    /// `fd_write`: gather-write `iovs` to `fd`
    fn fd_write(&mut self, fd: Fd, iovs: &[Iovec], nwritten: &mut Size) -> Errno;

    // ===== Randomness =====

    /// `random_get`
    fn random_get(&mut self, buf: &mut [u8]) -> Errno;

    // ===== Polling =====

    /// `poll_oneoff`: block until one of `subscriptions` fires
    ///
    /// `events` must hold at least as many slots as `subscriptions`; both
    /// must be 8-byte aligned.
    fn poll_oneoff(
        &mut self,
        subscriptions: &[Subscription],
        events: &mut [Event],
        nevents: &mut Size,
    ) -> Errno;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn proc_exit(&mut self, code: u32) -> ! {
        (**self).proc_exit(code)
    }

    fn args_sizes_get(&mut self, argc: &mut Size, argv_buf_len: &mut Size) -> Errno {
        (**self).args_sizes_get(argc, argv_buf_len)
    }

    fn args_get(&mut self, argv: &mut [HostAddr], argv_buf: &mut [u8]) -> Errno {
        (**self).args_get(argv, argv_buf)
    }

    fn environ_sizes_get(&mut self, environc: &mut Size, environ_buf_len: &mut Size) -> Errno {
        (**self).environ_sizes_get(environc, environ_buf_len)
    }

    fn environ_get(&mut self, environ: &mut [HostAddr], environ_buf: &mut [u8]) -> Errno {
        (**self).environ_get(environ, environ_buf)
    }

    fn clock_time_get(
        &mut self,
        id: ClockId,
        precision: Timestamp,
        time: &mut Timestamp,
    ) -> Errno {
        (**self).clock_time_get(id, precision, time)
    }

    fn fd_write(&mut self, fd: Fd, iovs: &[Iovec], nwritten: &mut Size) -> Errno {
        (**self).fd_write(fd, iovs, nwritten)
    }

    fn random_get(&mut self, buf: &mut [u8]) -> Errno {
        (**self).random_get(buf)
    }

    fn poll_oneoff(
        &mut self,
        subscriptions: &[Subscription],
        events: &mut [Event],
        nevents: &mut Size,
    ) -> Errno {
        (**self).poll_oneoff(subscriptions, events, nevents)
    }
}
