//! Runtime configuration
//!
//! Read from the process environment once bootstrap has decoded it:
//!
//! - `WASIRT_CONFIG`: a JSON object; any field left out keeps its default
//! - `WASIRT_TRACE=1`: log every host call the runtime issues
//!
//! Configuration problems are reported and then ignored; they never stop
//! the process.

use serde::Deserialize;

use crate::abi::{Fd, fd};
use crate::bootstrap::ProcessEnv;
use crate::error::{RtError, RtResult};
use crate::scratch::SCRATCH_SIZE;

/// Environment variable holding the JSON configuration
pub const CONFIG_VAR: &str = "WASIRT_CONFIG";

/// Environment variable enabling host-call tracing
pub const TRACE_VAR: &str = "WASIRT_TRACE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Scratch region size in bytes (at least 1024)
    pub scratch_size: usize,
    /// Descriptor fatal diagnostics are written to
    pub diagnostic_fd: Fd,
    /// Log each host call
    pub trace_host_calls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scratch_size: SCRATCH_SIZE,
            diagnostic_fd: fd::STDERR,
            trace_host_calls: false,
        }
    }
}

impl Config {
    /// Parse a JSON configuration object
    pub fn from_json(text: &str) -> RtResult<Self> {
        let config: Config = serde_json::from_str(text).map_err(|e| RtError::Config {
            reason: e.to_string(),
        })?;
        config.validate()
    }

    /// Build the configuration from the decoded process environment
    pub fn from_env(env: &ProcessEnv) -> RtResult<Self> {
        let mut config = match env.var(CONFIG_VAR) {
            Some(text) => Self::from_json(text)?,
            None => Self::default(),
        };
        if let Some(trace) = env.var(TRACE_VAR) {
            config.trace_host_calls = matches!(trace, "1" | "true" | "yes");
        }
        Ok(config)
    }

    fn validate(self) -> RtResult<Self> {
        if self.scratch_size < SCRATCH_SIZE {
            return Err(RtError::Config {
                reason: format!(
                    "scratch_size {} is below the minimum of {}",
                    self.scratch_size, SCRATCH_SIZE
                ),
            });
        }
        Ok(self)
    }
}
