//! Runtime facade
//!
//! Owns the host, the scratch region and the decoded process environment
//! for one execution flow, and applies the error policy in one place:
//!
//! - fatal errors print `fatal error: <message>` to the diagnostic fd and
//!   terminate with `proc_exit(2)`
//! - `random_get` failures come back as a zero fill count
//! - configuration errors are logged and the defaults kept

use crate::abi::Fd;
use crate::bootstrap::ProcessEnv;
use crate::config::Config;
use crate::console_log;
use crate::error::{RtError, RtResult};
use crate::platform::Host;
use crate::scratch::Scratch;
use crate::zoneinfo::{self, Location, SystemZoneLoader, UtcSystem, ZoneTable};
use crate::{clock, io, poll, random};

/// Exit code used after a fatal diagnostic
pub const FATAL_EXIT_CODE: u32 = 2;

pub struct Runtime<H: Host> {
    host: H,
    scratch: Scratch,
    env: ProcessEnv,
    config: Config,
    zones: Box<dyn SystemZoneLoader>,
}

impl<H: Host> Runtime<H> {
    /// Decode args and environment, then apply configuration from them
    pub fn boot(mut host: H) -> Self {
        let env = match ProcessEnv::load(&mut host) {
            Ok(env) => env,
            Err(err) => abort(&mut host, Config::default().diagnostic_fd, &err),
        };

        let config = match Config::from_env(&env) {
            Ok(config) => config,
            Err(err) => {
                console_log!("[runtime] ignoring configuration: {}", err);
                Config::default()
            }
        };

        if config.trace_host_calls {
            console_log!(
                "[runtime] booted: {} args, {} env vars, scratch {} bytes",
                env.args().len(),
                env.env().len(),
                config.scratch_size
            );
        }

        Self {
            host,
            scratch: Scratch::with_size(config.scratch_size),
            env,
            config,
            zones: Box::new(UtcSystem),
        }
    }

    /// Replace the loader used for `""`, `"UTC"` and `"Local"`
    pub fn set_zone_loader<S: SystemZoneLoader + 'static>(&mut self, loader: S) {
        self.zones = Box::new(loader);
    }

    pub fn args(&self) -> &[String] {
        self.env.args()
    }

    pub fn env(&self) -> &[String] {
        self.env.env()
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.env.var(name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Seconds since the Unix epoch and the nanosecond remainder
    pub fn wall_clock(&mut self) -> (i64, i32) {
        self.trace("clock_time_get(realtime)");
        let result = clock::wall_clock(&mut self.host, &mut self.scratch);
        self.check(result)
    }

    /// Monotonic nanoseconds
    pub fn monotonic(&mut self) -> i64 {
        self.trace("clock_time_get(monotonic)");
        let result = clock::monotonic(&mut self.host, &mut self.scratch);
        self.check(result)
    }

    /// Block the flow for `usec` microseconds
    pub fn sleep(&mut self, usec: u32) {
        self.trace("poll_oneoff");
        let result = poll::sleep(&mut self.host, &mut self.scratch, usec);
        self.check(result)
    }

    /// Fill `buf` with random bytes; 0 means the host refused
    pub fn fill_random(&mut self, buf: &mut [u8]) -> usize {
        self.trace("random_get");
        match random::try_fill_random(&mut self.host, buf) {
            Ok(n) => n,
            Err(err) => {
                console_log!("[runtime] {}", err);
                0
            }
        }
    }

    /// Single `fd_write` of `buf`; returns bytes written
    pub fn write_once(&mut self, fd: Fd, buf: &[u8]) -> usize {
        self.trace("fd_write");
        let result = io::write_once(&mut self.host, fd, buf);
        self.check(result)
    }

    /// Resolve a timezone against the embedded table
    pub fn load_location(&self, name: &str, table: &ZoneTable) -> RtResult<Location> {
        zoneinfo::load_location(name, self.zones.as_ref(), table)
    }

    /// Terminate the process
    pub fn exit(&mut self, code: u32) -> ! {
        self.trace("proc_exit");
        self.host.proc_exit(code)
    }

    fn check<T>(&mut self, result: RtResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => abort(&mut self.host, self.config.diagnostic_fd, &err),
        }
    }

    fn trace(&self, call: &str) {
        if self.config.trace_host_calls {
            console_log!("[wasi] {}", call);
        }
    }
}

#[cfg(target_os = "wasi")]
impl Runtime<crate::platform::wasi::Wasip1> {
    /// Boot against the real `wasi_snapshot_preview1` imports
    pub fn boot_wasi() -> Self {
        Self::boot(crate::platform::wasi::Wasip1)
    }
}

/// Print the diagnostic and terminate; a failed diagnostic write is ignored
#[cold]
fn abort<H: Host>(host: &mut H, diagnostic_fd: Fd, err: &RtError) -> ! {
    let message = format!("fatal error: {}\n", err);
    console_log!("[runtime] {}", message.trim_end());
    let _ = io::write_once(host, diagnostic_fd, message.as_bytes());
    host.proc_exit(FATAL_EXIT_CODE)
}
