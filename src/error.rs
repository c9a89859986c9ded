//! Error types for the host adapter
//!
//! Errors fall into two classes. Fatal errors (host failures during
//! bootstrap, clock reads, poll and write) abort the process; the only
//! recoverable host failure is `random_get`, which callers see as a short
//! fill. The classification lives in [`RtError::is_fatal`] and is applied by
//! the [`Runtime`](crate::runtime::Runtime) façade.

use std::fmt;

use crate::abi::Errno;

/// Result type for adapter operations
pub type RtResult<T> = Result<T, RtError>;

/// Errors raised while marshalling to or from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtError {
    /// A host import returned a non-zero errno
    Host { call: &'static str, errno: Errno },

    /// A wire read or write would cross the end of its buffer
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// A host-bound record is not on an 8-byte boundary
    Misaligned { addr: usize },

    /// The host handed back an argument/environment table we cannot decode
    MalformedTable {
        table: &'static str,
        index: usize,
        reason: &'static str,
    },

    /// Timezone name not present in the embedded table
    UnknownLocation { name: String },

    /// Timezone blob present but not TZif data
    InvalidZoneData { name: String },

    /// Runtime configuration could not be parsed
    Config { reason: String },
}

impl RtError {
    /// Whether this error must abort the process
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Host { call, .. } => *call != "random_get",
            Self::OutOfBounds { .. } | Self::Misaligned { .. } | Self::MalformedTable { .. } => {
                true
            }
            Self::UnknownLocation { .. } | Self::InvalidZoneData { .. } | Self::Config { .. } => {
                false
            }
        }
    }
}

impl fmt::Display for RtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host { call, errno } => {
                write!(f, "{} failed with errno {}", call, errno)
            }
            Self::OutOfBounds { offset, width, len } => {
                write!(
                    f,
                    "wire access out of bounds: offset {} + width {} > length {}",
                    offset, width, len
                )
            }
            Self::Misaligned { addr } => {
                write!(f, "address {:#x} is not 8-byte aligned", addr)
            }
            Self::MalformedTable {
                table,
                index,
                reason,
            } => {
                write!(f, "malformed {} entry {}: {}", table, index, reason)
            }
            Self::UnknownLocation { name } => {
                write!(f, "unknown location {}", name)
            }
            Self::InvalidZoneData { name } => {
                write!(f, "invalid timezone data for {}", name)
            }
            Self::Config { reason } => {
                write!(f, "invalid runtime configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for RtError {}

/// Abort on a broken internal contract when no host is at hand
///
/// Used where the failure means an assumption about the environment is
/// wrong (e.g. allocator alignment), not that a host call failed.
#[cold]
pub fn fatal(message: &str) -> ! {
    crate::console_log!("fatal error: {}", message);
    panic!("{}", message);
}
