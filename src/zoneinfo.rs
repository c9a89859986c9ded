//! Timezone lookup boundary
//!
//! The reserved names `""`, `"UTC"` and `"Local"` go to the system loader.
//! Everything else is looked up as `zoneinfo/<name>` in an embedded table
//! of TZif blobs. Interpreting the TZif contents is left to the consumer;
//! this layer only checks the header.

use std::collections::HashMap;

use crate::error::{RtError, RtResult};

const TZIF_MAGIC: &[u8; 4] = b"TZif";
const TZIF_HEADER_LEN: usize = 44;

/// A resolved timezone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    name: String,
    tzdata: Option<Vec<u8>>,
}

impl Location {
    /// Coordinated Universal Time
    pub fn utc() -> Self {
        Self {
            name: "UTC".to_string(),
            tzdata: None,
        }
    }

    /// Location backed by TZif data
    pub fn from_tzdata(name: &str, data: &[u8]) -> RtResult<Self> {
        let valid = data.len() >= TZIF_HEADER_LEN
            && &data[..4] == TZIF_MAGIC
            && matches!(data[4], 0 | b'2' | b'3' | b'4');
        if !valid {
            return Err(RtError::InvalidZoneData {
                name: name.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            tzdata: Some(data.to_vec()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw TZif bytes, `None` for UTC
    pub fn tzdata(&self) -> Option<&[u8]> {
        self.tzdata.as_deref()
    }
}

/// Loader for the reserved names
pub trait SystemZoneLoader {
    fn load(&self, name: &str) -> RtResult<Location>;
}

/// System loader for hosts without a zone database: everything is UTC
#[derive(Debug, Default, Clone, Copy)]
pub struct UtcSystem;

impl SystemZoneLoader for UtcSystem {
    fn load(&self, _name: &str) -> RtResult<Location> {
        Ok(Location::utc())
    }
}

/// Embedded `zoneinfo/<name>` → TZif blob table
#[derive(Debug, Default, Clone)]
pub struct ZoneTable {
    files: HashMap<String, Vec<u8>>,
}

impl ZoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_static(entries: &[(&str, &[u8])]) -> Self {
        let mut table = Self::new();
        for (name, data) in entries {
            table.insert(name, data);
        }
        table
    }

    /// Register the blob for zone `name` (without the `zoneinfo/` prefix)
    pub fn insert(&mut self, name: &str, data: &[u8]) {
        self.files.insert(format!("zoneinfo/{}", name), data.to_vec());
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files
            .get(&format!("zoneinfo/{}", name))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Resolve `name` to a [`Location`]
pub fn load_location<S: SystemZoneLoader + ?Sized>(
    name: &str,
    system: &S,
    table: &ZoneTable,
) -> RtResult<Location> {
    if matches!(name, "" | "UTC" | "Local") {
        return system.load(name);
    }
    match table.get(name) {
        Some(data) => Location::from_tzdata(name, data),
        None => Err(RtError::UnknownLocation {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn tzif(version: u8) -> Vec<u8> {
        let mut data = b"TZif".to_vec();
        data.push(version);
        data.resize(TZIF_HEADER_LEN, 0);
        data
    }

    #[derive(Default)]
    struct Recording {
        seen: RefCell<Vec<String>>,
    }

    impl SystemZoneLoader for Recording {
        fn load(&self, name: &str) -> RtResult<Location> {
            self.seen.borrow_mut().push(name.to_string());
            Ok(Location::utc())
        }
    }

    #[test]
    fn test_reserved_names_defer_to_system() {
        let system = Recording::default();
        let table = ZoneTable::from_static(&[("UTC", &b"not consulted"[..])]);

        for name in ["", "UTC", "Local"] {
            let loc = load_location(name, &system, &table).unwrap();
            assert_eq!(loc, Location::utc());
        }
        assert_eq!(*system.seen.borrow(), vec!["", "UTC", "Local"]);
    }

    #[test]
    fn test_embedded_lookup() {
        let data = tzif(b'2');
        let mut table = ZoneTable::new();
        table.insert("Europe/Paris", &data);

        let loc = load_location("Europe/Paris", &UtcSystem, &table).unwrap();
        assert_eq!(loc.name(), "Europe/Paris");
        assert_eq!(loc.tzdata(), Some(data.as_slice()));
    }

    #[test]
    fn test_unknown_location() {
        let err = load_location("Mars/Olympus", &UtcSystem, &ZoneTable::new()).unwrap_err();
        assert_eq!(err.to_string(), "unknown location Mars/Olympus");
    }

    #[test]
    fn test_invalid_zone_data() {
        let table = ZoneTable::from_static(&[("Bad/Zone", &b"garbage"[..])]);
        let err = load_location("Bad/Zone", &UtcSystem, &table).unwrap_err();
        assert!(matches!(err, RtError::InvalidZoneData { .. }));

        let mut table = ZoneTable::new();
        table.insert("Odd/Version", &tzif(b'9'));
        assert!(load_location("Odd/Version", &UtcSystem, &table).is_err());
    }

    #[test]
    fn test_table_keys_are_prefixed() {
        let data = tzif(0);
        let table = ZoneTable::from_static(&[("Asia/Tokyo", data.as_slice())]);
        assert_eq!(table.len(), 1);
        assert!(table.files.contains_key("zoneinfo/Asia/Tokyo"));
        assert!(table.get("zoneinfo/Asia/Tokyo").is_none());
    }
}
