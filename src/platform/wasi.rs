//! WASI preview1 host
//!
//! Binds the `wasi_snapshot_preview1` imports. Only compiled for WASI
//! targets; on wasm32 every pointer argument below is already a 32-bit
//! host address.

use super::Host;
use crate::abi::{
    ClockId, Errno, Event, Fd, HostAddr, Iovec, Size, Subscription, Timestamp, errno,
};

mod sys {
    use crate::abi::{ClockId, Errno, Event, Fd, HostAddr, Iovec, Size, Subscription, Timestamp};

    #[link(wasm_import_module = "wasi_snapshot_preview1")]
    unsafe extern "C" {
        pub fn proc_exit(code: u32) -> !;
        pub fn args_get(argv: *mut HostAddr, argv_buf: *mut u8) -> Errno;
        pub fn args_sizes_get(argc: *mut Size, argv_buf_len: *mut Size) -> Errno;
        pub fn clock_time_get(id: ClockId, precision: Timestamp, time: *mut Timestamp) -> Errno;
        pub fn environ_get(environ: *mut HostAddr, environ_buf: *mut u8) -> Errno;
        pub fn environ_sizes_get(environc: *mut Size, environ_buf_len: *mut Size) -> Errno;
        pub fn fd_write(fd: Fd, iovs: *const Iovec, iovs_len: Size, nwritten: *mut Size) -> Errno;
        pub fn random_get(buf: *mut u8, buf_len: Size) -> Errno;
        pub fn poll_oneoff(
            subscriptions: *const Subscription,
            events: *mut Event,
            nsubscriptions: Size,
            nevents: *mut Size,
        ) -> Errno;
    }
}

/// The real preview1 host
#[derive(Debug, Default, Clone, Copy)]
pub struct Wasip1;

impl Host for Wasip1 {
    fn proc_exit(&mut self, code: u32) -> ! {
        // SAFETY: plain integer argument, no memory access.
        unsafe { sys::proc_exit(code) }
    }

    fn args_sizes_get(&mut self, argc: &mut Size, argv_buf_len: &mut Size) -> Errno {
        // SAFETY: both pointers come from live exclusive borrows.
        unsafe { sys::args_sizes_get(argc, argv_buf_len) }
    }

    fn args_get(&mut self, argv: &mut [HostAddr], argv_buf: &mut [u8]) -> Errno {
        // SAFETY: the caller sized both slices from args_sizes_get; they stay
        // exclusively borrowed until the host returns.
        unsafe { sys::args_get(argv.as_mut_ptr(), argv_buf.as_mut_ptr()) }
    }

    fn environ_sizes_get(&mut self, environc: &mut Size, environ_buf_len: &mut Size) -> Errno {
        // SAFETY: both pointers come from live exclusive borrows.
        unsafe { sys::environ_sizes_get(environc, environ_buf_len) }
    }

    fn environ_get(&mut self, environ: &mut [HostAddr], environ_buf: &mut [u8]) -> Errno {
        // SAFETY: as for args_get.
        unsafe { sys::environ_get(environ.as_mut_ptr(), environ_buf.as_mut_ptr()) }
    }

    fn clock_time_get(
        &mut self,
        id: ClockId,
        precision: Timestamp,
        time: &mut Timestamp,
    ) -> Errno {
        // SAFETY: `time` is a live exclusive borrow; a `&mut u64` is 8-byte
        // aligned on wasm32.
        unsafe { sys::clock_time_get(id, precision, time) }
    }

    fn fd_write(&mut self, fd: Fd, iovs: &[Iovec], nwritten: &mut Size) -> Errno {
        let Ok(count) = Size::try_from(iovs.len()) else {
            return errno::INVAL;
        };
        // SAFETY: the iovecs point into buffers the caller keeps borrowed
        // across this call.
        unsafe { sys::fd_write(fd, iovs.as_ptr(), count, nwritten) }
    }

    fn random_get(&mut self, buf: &mut [u8]) -> Errno {
        let Ok(len) = Size::try_from(buf.len()) else {
            return errno::INVAL;
        };
        // SAFETY: valid mutable slice pointer and its exact length.
        unsafe { sys::random_get(buf.as_mut_ptr(), len) }
    }

    fn poll_oneoff(
        &mut self,
        subscriptions: &[Subscription],
        events: &mut [Event],
        nevents: &mut Size,
    ) -> Errno {
        if events.len() < subscriptions.len() {
            return errno::INVAL;
        }
        let Ok(count) = Size::try_from(subscriptions.len()) else {
            return errno::INVAL;
        };
        // SAFETY: both record types are align(8) and `events` has room for
        // one event per subscription.
        unsafe {
            sys::poll_oneoff(
                subscriptions.as_ptr(),
                events.as_mut_ptr(),
                count,
                nevents,
            )
        }
    }
}
