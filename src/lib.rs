//! wasip1-rt - runtime support layer over the WASI preview1 host interface
//!
//! The guest side of `wasi_snapshot_preview1`: process bootstrap, clocks,
//! sleep, random bytes, single-buffer writes and process exit, plus the
//! layout and alignment rules the host ABI imposes on shared records.
//!
//! Layering:
//! - `abi`, `wire`: record layouts and little-endian field access
//! - `scratch`, `aligned`: host-visible memory with 8-byte alignment
//! - `platform`: the `Host` seam (real imports or a mock)
//! - `bootstrap`, `clock`, `poll`, `random`, `io`: one concern per host call
//! - `runtime`: owns the pieces and applies the error policy
//!
//! Everything here assumes a single execution flow. Each flow owns its
//! own `Runtime` and with it its own scratch region; staging memory is never
//! shared between flows.

pub mod abi;
pub mod aligned;
pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod error;
pub mod io;
pub mod platform;
pub mod poll;
pub mod random;
pub mod runtime;
pub mod scratch;
pub mod wire;
pub mod zoneinfo;

pub use error::{RtError, RtResult};
pub use platform::Host;
pub use runtime::Runtime;

/// Log to stderr
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        eprintln!($($t)*)
    };
}
