//! Scripted in-memory host
//!
//! Behaves like a preview1 host from the guest's point of view:
//! - argument/environment tables are laid out with host addresses relative
//!   to the narrowed base of the guest's buffer
//! - clocks are plain counters; a clock subscription advances the monotonic
//!   clock by its timeout
//! - every call is recorded, and any call can be scripted to fail
//! - `proc_exit` panics with the exit code, so fatal paths are testable

use std::collections::HashMap;

use super::Host;
use crate::abi::{
    self, ClockId, Errno, Event, Fd, HostAddr, Iovec, Size, Subscription, Timestamp, errno,
    eventtype,
};

#[derive(Debug, Default)]
pub struct MockHost {
    args: Vec<String>,
    env: Vec<String>,
    realtime_ns: Timestamp,
    monotonic_ns: Timestamp,
    failures: HashMap<&'static str, Errno>,
    calls: Vec<&'static str>,
    subscriptions: Vec<Subscription>,
    writes: Vec<(Fd, Size)>,
    iovecs: Vec<(Fd, Iovec)>,
    random_state: u64,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            random_state: 0x9E37_79B9_7F4A_7C15,
            ..Self::default()
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_env(mut self, env: &[&str]) -> Self {
        self.env = env.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_realtime(mut self, ns: Timestamp) -> Self {
        self.realtime_ns = ns;
        self
    }

    pub fn with_monotonic(mut self, ns: Timestamp) -> Self {
        self.monotonic_ns = ns;
        self
    }

    /// Make every later call to `call` return `errno`
    pub fn fail(mut self, call: &'static str, errno: Errno) -> Self {
        self.failures.insert(call, errno);
        self
    }

    /// Stop failing `call`
    pub fn recover(&mut self, call: &'static str) {
        self.failures.remove(call);
    }

    /// Names of the imports invoked so far, in order
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// Every subscription passed to `poll_oneoff`
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// `(fd, total bytes)` for every `fd_write`
    pub fn writes(&self) -> &[(Fd, Size)] {
        &self.writes
    }

    /// Every iovec passed to `fd_write`, with its descriptor
    pub fn iovecs(&self) -> &[(Fd, Iovec)] {
        &self.iovecs
    }

    pub fn monotonic_ns(&self) -> Timestamp {
        self.monotonic_ns
    }

    fn enter(&mut self, call: &'static str) -> Errno {
        self.calls.push(call);
        self.failures.get(call).copied().unwrap_or(errno::SUCCESS)
    }

    fn table_sizes(entries: &[String], count: &mut Size, buf_len: &mut Size) {
        *count = entries.len() as Size;
        *buf_len = entries.iter().map(|e| e.len() as Size + 1).sum();
    }

    fn fill_table(entries: &[String], index: &mut [HostAddr], buf: &mut [u8]) -> Errno {
        let needed: usize = entries.iter().map(|e| e.len() + 1).sum();
        if index.len() < entries.len() || buf.len() < needed {
            return errno::FAULT;
        }

        let base = HostAddr::narrow(buf.as_ptr());
        let mut offset = 0usize;
        for (slot, entry) in index.iter_mut().zip(entries) {
            *slot = base.add(offset as u32);
            buf[offset..offset + entry.len()].copy_from_slice(entry.as_bytes());
            buf[offset + entry.len()] = 0;
            offset += entry.len() + 1;
        }
        errno::SUCCESS
    }

    fn next_random(&mut self) -> u8 {
        // xorshift64
        let mut x = self.random_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.random_state = x;
        (x >> 56) as u8
    }
}

impl Host for MockHost {
    fn proc_exit(&mut self, code: u32) -> ! {
        self.calls.push("proc_exit");
        panic!("proc_exit({})", code);
    }

    fn args_sizes_get(&mut self, argc: &mut Size, argv_buf_len: &mut Size) -> Errno {
        let rc = self.enter("args_sizes_get");
        if rc == errno::SUCCESS {
            Self::table_sizes(&self.args, argc, argv_buf_len);
        }
        rc
    }

    fn args_get(&mut self, argv: &mut [HostAddr], argv_buf: &mut [u8]) -> Errno {
        let rc = self.enter("args_get");
        if rc != errno::SUCCESS {
            return rc;
        }
        Self::fill_table(&self.args, argv, argv_buf)
    }

    fn environ_sizes_get(&mut self, environc: &mut Size, environ_buf_len: &mut Size) -> Errno {
        let rc = self.enter("environ_sizes_get");
        if rc == errno::SUCCESS {
            Self::table_sizes(&self.env, environc, environ_buf_len);
        }
        rc
    }

    fn environ_get(&mut self, environ: &mut [HostAddr], environ_buf: &mut [u8]) -> Errno {
        let rc = self.enter("environ_get");
        if rc != errno::SUCCESS {
            return rc;
        }
        Self::fill_table(&self.env, environ, environ_buf)
    }

    fn clock_time_get(
        &mut self,
        id: ClockId,
        _precision: Timestamp,
        time: &mut Timestamp,
    ) -> Errno {
        let rc = self.enter("clock_time_get");
        if rc != errno::SUCCESS {
            return rc;
        }
        if (&*time as *const Timestamp as usize) % 8 != 0 {
            return errno::INVAL;
        }
        match id {
            abi::clock::REALTIME => *time = self.realtime_ns,
            abi::clock::MONOTONIC => *time = self.monotonic_ns,
            _ => return errno::INVAL,
        }
        errno::SUCCESS
    }

    fn fd_write(&mut self, fd: Fd, iovs: &[Iovec], nwritten: &mut Size) -> Errno {
        let rc = self.enter("fd_write");
        if rc != errno::SUCCESS {
            return rc;
        }
        let total = iovs.iter().map(|iov| iov.buf_len).sum();
        self.iovecs.extend(iovs.iter().map(|iov| (fd, *iov)));
        self.writes.push((fd, total));
        *nwritten = total;
        errno::SUCCESS
    }

    fn random_get(&mut self, buf: &mut [u8]) -> Errno {
        let rc = self.enter("random_get");
        if rc != errno::SUCCESS {
            return rc;
        }
        for byte in buf.iter_mut() {
            *byte = self.next_random();
        }
        errno::SUCCESS
    }

    fn poll_oneoff(
        &mut self,
        subscriptions: &[Subscription],
        events: &mut [Event],
        nevents: &mut Size,
    ) -> Errno {
        let rc = self.enter("poll_oneoff");
        if rc != errno::SUCCESS {
            return rc;
        }
        if subscriptions.is_empty() || events.len() < subscriptions.len() {
            return errno::INVAL;
        }

        self.subscriptions.extend_from_slice(subscriptions);

        let mut count = 0;
        for sub in subscriptions {
            if let Some(clock) = sub.as_clock() {
                if clock.id == abi::clock::MONOTONIC && !clock.is_absolute() {
                    self.monotonic_ns += clock.timeout;
                }
                events[count] = Event::new(sub.userdata(), 0, eventtype::CLOCK);
                count += 1;
            }
        }
        *nevents = count as Size;
        errno::SUCCESS
    }
}
