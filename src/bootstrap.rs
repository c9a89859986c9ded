//! Process bootstrap: arguments and environment
//!
//! Both tables arrive the same way. The host reports an entry count and a
//! total byte length, then fills an index of host addresses plus a flat
//! buffer of NUL-terminated entries. The addresses are in the host's view
//! of the buffer, so each entry starts at `index[i] - base(buffer)`.
//!
//! Decoding happens once at startup; the resulting [`ProcessEnv`] is
//! immutable afterwards. Any host error here is fatal since a partially
//! read argument list is never valid.

use crate::abi::{Errno, HostAddr, Size, errno};
use crate::error::{RtError, RtResult};
use crate::platform::Host;

/// Which host table to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Args,
    Environ,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Args => "argument",
            Table::Environ => "environment",
        }
    }

    fn sizes_call(self) -> &'static str {
        match self {
            Table::Args => "args_sizes_get",
            Table::Environ => "environ_sizes_get",
        }
    }

    fn get_call(self) -> &'static str {
        match self {
            Table::Args => "args_get",
            Table::Environ => "environ_get",
        }
    }

    fn sizes<H: Host>(self, host: &mut H, count: &mut Size, buf_len: &mut Size) -> Errno {
        match self {
            Table::Args => host.args_sizes_get(count, buf_len),
            Table::Environ => host.environ_sizes_get(count, buf_len),
        }
    }

    fn get<H: Host>(self, host: &mut H, index: &mut [HostAddr], buf: &mut [u8]) -> Errno {
        match self {
            Table::Args => host.args_get(index, buf),
            Table::Environ => host.environ_get(index, buf),
        }
    }
}

/// Decode a host-filled table into ordered strings
///
/// `base` is the host address of `flat[0]`. Entries that are not valid
/// UTF-8 are decoded lossily.
pub fn decode_table(
    table: Table,
    index: &[HostAddr],
    flat: &[u8],
    base: HostAddr,
) -> RtResult<Vec<String>> {
    index
        .iter()
        .enumerate()
        .map(|(i, addr)| {
            let start = addr.offset_from(base) as usize;
            if start >= flat.len() {
                return Err(RtError::MalformedTable {
                    table: table.name(),
                    index: i,
                    reason: "offset outside buffer",
                });
            }
            let len = flat[start..]
                .iter()
                .position(|&b| b == 0)
                .ok_or(RtError::MalformedTable {
                    table: table.name(),
                    index: i,
                    reason: "missing NUL terminator",
                })?;
            Ok(String::from_utf8_lossy(&flat[start..start + len]).into_owned())
        })
        .collect()
}

/// Query, fetch and decode one table from the host
pub fn read_table<H: Host>(host: &mut H, table: Table) -> RtResult<Vec<String>> {
    let mut count: Size = 0;
    let mut buf_len: Size = 0;
    let rc = table.sizes(host, &mut count, &mut buf_len);
    if rc != errno::SUCCESS {
        return Err(RtError::Host {
            call: table.sizes_call(),
            errno: rc,
        });
    }

    if count == 0 {
        return Ok(Vec::new());
    }

    let mut index = vec![HostAddr::NULL; count as usize];
    let mut flat = vec![0u8; buf_len as usize];
    let rc = table.get(host, &mut index, &mut flat);
    if rc != errno::SUCCESS {
        return Err(RtError::Host {
            call: table.get_call(),
            errno: rc,
        });
    }

    let base = HostAddr::narrow(flat.as_ptr());
    decode_table(table, &index, &flat, base)
}

/// Arguments and environment captured at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnv {
    args: Vec<String>,
    env: Vec<String>,
}

impl ProcessEnv {
    /// Read both tables from the host
    pub fn load<H: Host>(host: &mut H) -> RtResult<Self> {
        let args = read_table(host, Table::Args)?;
        let env = read_table(host, Table::Environ)?;
        Ok(Self { args, env })
    }

    pub fn from_parts(args: Vec<String>, env: Vec<String>) -> Self {
        Self { args, env }
    }

    /// Arguments in host order; the first is usually the program name
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `NAME=value` entries in host order
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Value of the first `name=...` entry
    pub fn var(&self, name: &str) -> Option<&str> {
        self.env.iter().find_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            (key == name).then_some(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockHost;

    /// Index for `entries` laid out back to back from `base`
    fn synthetic(entries: &[&str], base: u32) -> (Vec<HostAddr>, Vec<u8>) {
        let mut index = Vec::new();
        let mut flat = Vec::new();
        for entry in entries {
            index.push(HostAddr::from_raw(base).add(flat.len() as u32));
            flat.extend_from_slice(entry.as_bytes());
            flat.push(0);
        }
        (index, flat)
    }

    #[test]
    fn test_decode_two_entries() {
        let (index, flat) = synthetic(&["a", "bc"], 0x2000);
        let decoded =
            decode_table(Table::Args, &index, &flat, HostAddr::from_raw(0x2000)).unwrap();
        assert_eq!(decoded, vec!["a".to_string(), "bc".to_string()]);
    }

    #[test]
    fn test_decode_empty_table() {
        let decoded = decode_table(Table::Args, &[], &[], HostAddr::from_raw(0x10)).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_decode_is_idempotent() {
        let (index, flat) = synthetic(&["PATH=/bin", "HOME=/", ""], 0x40);
        let base = HostAddr::from_raw(0x40);
        let first = decode_table(Table::Environ, &index, &flat, base).unwrap();
        let second = decode_table(Table::Environ, &index, &flat, base).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["PATH=/bin", "HOME=/", ""]);
    }

    #[test]
    fn test_decode_follows_index_order() {
        // Index need not be sorted by offset.
        let flat = b"one\0two\0".to_vec();
        let base = HostAddr::from_raw(0x100);
        let index = [base.add(4), base.add(0)];
        let decoded = decode_table(Table::Args, &index, &flat, base).unwrap();
        assert_eq!(decoded, vec!["two", "one"]);
    }

    #[test]
    fn test_decode_wraps_around_address_space() {
        let (index, flat) = synthetic(&["x", "yz"], 0xFFFF_FFFE);
        let decoded =
            decode_table(Table::Args, &index, &flat, HostAddr::from_raw(0xFFFF_FFFE)).unwrap();
        assert_eq!(decoded, vec!["x", "yz"]);
    }

    #[test]
    fn test_decode_rejects_offset_outside_buffer() {
        let flat = b"a\0".to_vec();
        let base = HostAddr::from_raw(0x100);
        let err = decode_table(Table::Args, &[base.add(2)], &flat, base).unwrap_err();
        assert_eq!(
            err,
            RtError::MalformedTable {
                table: "argument",
                index: 0,
                reason: "offset outside buffer",
            }
        );
    }

    #[test]
    fn test_decode_rejects_missing_terminator() {
        let flat = b"abc".to_vec();
        let base = HostAddr::from_raw(0x100);
        let err = decode_table(Table::Environ, &[base], &flat, base).unwrap_err();
        assert!(matches!(
            err,
            RtError::MalformedTable {
                reason: "missing NUL terminator",
                ..
            }
        ));
    }

    #[test]
    fn test_decode_lossy_utf8() {
        let flat = vec![b'a', 0xFF, 0];
        let base = HostAddr::from_raw(0);
        let decoded = decode_table(Table::Args, &[base], &flat, base).unwrap();
        assert_eq!(decoded, vec!["a\u{FFFD}"]);
    }

    #[test]
    fn test_read_table_from_host() {
        let mut host = MockHost::new().with_args(&["prog", "--flag", "x y"]);
        let args = read_table(&mut host, Table::Args).unwrap();
        assert_eq!(args, vec!["prog", "--flag", "x y"]);
        assert_eq!(host.calls(), &["args_sizes_get", "args_get"]);
    }

    #[test]
    fn test_zero_entries_skip_get_call() {
        let mut host = MockHost::new();
        let env = read_table(&mut host, Table::Environ).unwrap();
        assert!(env.is_empty());
        assert_eq!(host.call_count("environ_get"), 0);
        assert_eq!(host.call_count("environ_sizes_get"), 1);
    }

    #[test]
    fn test_sizes_failure_is_reported() {
        let mut host = MockHost::new()
            .with_args(&["prog"])
            .fail("args_sizes_get", errno::FAULT);
        let err = read_table(&mut host, Table::Args).unwrap_err();
        assert_eq!(
            err,
            RtError::Host {
                call: "args_sizes_get",
                errno: errno::FAULT
            }
        );
        assert!(err.is_fatal());
        assert_eq!(host.call_count("args_get"), 0);
    }

    #[test]
    fn test_get_failure_is_reported() {
        let mut host = MockHost::new()
            .with_env(&["A=1"])
            .fail("environ_get", errno::IO);
        let err = read_table(&mut host, Table::Environ).unwrap_err();
        assert_eq!(
            err,
            RtError::Host {
                call: "environ_get",
                errno: errno::IO
            }
        );
    }

    #[test]
    fn test_process_env_var_lookup() {
        let env = ProcessEnv::from_parts(
            vec!["prog".to_string()],
            vec![
                "NOVALUE".to_string(),
                "TZ=UTC".to_string(),
                "EMPTY=".to_string(),
                "TZ=Europe/Paris".to_string(),
                "EQ=a=b".to_string(),
            ],
        );
        assert_eq!(env.var("TZ"), Some("UTC"));
        assert_eq!(env.var("EMPTY"), Some(""));
        assert_eq!(env.var("EQ"), Some("a=b"));
        assert_eq!(env.var("NOVALUE"), None);
        assert_eq!(env.var("MISSING"), None);
    }
}
