//! Memory zones observed by the introspection layer
//!
//! A zone is a contiguous run of words starting at `lower_bound`. Addresses
//! are word indices, so offsets and slot arithmetic stay in safe integer
//! space and every read is bounds-checked against the owning zone.

use crate::{Address, Word};
use indexmap::IndexMap;
use std::fmt;

/// Identifies a zone inside a [`ZoneRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bounded memory region. `top` is the end of the allocated words, not
/// the current stack pointer of whatever uses the zone.
#[derive(Debug, Clone)]
pub struct Zone {
    id: ZoneId,
    name: String,
    lower_bound: Address,
    words: Vec<Word>,
}

impl Zone {
    /// Create a zone of `size` zeroed words starting at `lower_bound`
    pub fn new(id: ZoneId, name: impl Into<String>, lower_bound: Address, size: usize) -> Self {
        Zone {
            id,
            name: name.into(),
            lower_bound,
            words: vec![0; size],
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower_bound(&self) -> Address {
        self.lower_bound
    }

    pub fn top(&self) -> Address {
        self.lower_bound + self.words.len()
    }

    /// `lower_bound <= addr < top`
    pub fn contains(&self, addr: Address) -> bool {
        self.lower_bound <= addr && addr < self.top()
    }

    /// Word distance from the lower bound. Negative for addresses below it.
    pub fn offset_of(&self, addr: Address) -> isize {
        addr as isize - self.lower_bound as isize
    }

    pub fn read(&self, addr: Address) -> Option<Word> {
        if !self.contains(addr) {
            return None;
        }
        self.words.get(addr - self.lower_bound).copied()
    }

    /// Store a word. Only the zone's owner (the machine) writes; the
    /// introspection layer never calls this on live state.
    pub fn write(&mut self, addr: Address, value: Word) -> bool {
        if !self.contains(addr) {
            return false;
        }
        self.words[addr - self.lower_bound] = value;
        true
    }
}

/// Arena of zones in creation order
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: IndexMap<ZoneId, Zone>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone, replacing any previous zone with the same id
    pub fn insert(&mut self, zone: Zone) {
        self.zones.insert(zone.id(), zone);
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn zone_mut(&mut self, id: ZoneId) -> Option<&mut Zone> {
        self.zones.get_mut(&id)
    }

    /// The first zone, in creation order, that holds `addr`
    pub fn zone_containing(&self, addr: Address) -> Option<&Zone> {
        self.zones.values().find(|zone| zone.contains(addr))
    }

    pub fn read_any(&self, addr: Address) -> Option<Word> {
        self.zone_containing(addr).and_then(|zone| zone.read(addr))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_uses_half_open_bounds() {
        let zone = Zone::new(ZoneId(1), "det", 1000, 100);
        assert!(zone.contains(1000));
        assert!(zone.contains(1099));
        assert!(!zone.contains(1100));
        assert!(!zone.contains(999));
        assert_eq!(zone.top(), 1100);
    }

    #[test]
    fn reads_outside_the_zone_are_refused() {
        let mut zone = Zone::new(ZoneId(1), "heap", 10, 4);
        assert!(zone.write(12, 0xbeef));
        assert!(!zone.write(14, 1));
        assert_eq!(zone.read(12), Some(0xbeef));
        assert_eq!(zone.read(9), None);
        assert_eq!(zone.offset_of(12), 2);
        assert_eq!(zone.offset_of(8), -2);
    }

    #[test]
    fn registry_finds_zone_by_address() {
        let mut zones = ZoneRegistry::new();
        zones.insert(Zone::new(ZoneId(1), "a", 0, 50));
        zones.insert(Zone::new(ZoneId(2), "b", 100, 50));
        assert_eq!(zones.zone_containing(120).map(|z| z.id()), Some(ZoneId(2)));
        assert!(zones.zone_containing(75).is_none());
        assert_eq!(zones.read_any(75), None);
        assert_eq!(zones.len(), 2);
    }
}
