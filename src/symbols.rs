//! Code-address to label resolution
//!
//! The machine's label tables are an external collaborator. `LabelTable` is
//! an in-memory implementation for embedders that register labels as code
//! is loaded, and for tests.

use crate::CodeAddr;
use std::collections::BTreeMap;
use std::fmt;

/// What a code address resolves to. `Unknown` is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// A label inside a procedure body
    Internal { address: CodeAddr, procedure: String },
    Entry { address: CodeAddr, name: String },
    UnnamedEntry(CodeAddr),
    Unknown(CodeAddr),
}

impl Label {
    pub fn address(&self) -> CodeAddr {
        match self {
            Label::Internal { address, .. } | Label::Entry { address, .. } => *address,
            Label::UnnamedEntry(address) | Label::Unknown(address) => *address,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Label::Unknown(_))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Internal { procedure, .. } => write!(f, "label {}", procedure),
            Label::Entry { name, .. } => write!(f, "entry label {}", name),
            Label::UnnamedEntry(addr) => write!(f, "unnamed entry label 0x{:x}", addr),
            Label::Unknown(addr) => write!(f, "label UNKNOWN 0x{:x}", addr),
        }
    }
}

pub trait SymbolTable {
    /// Resolve `addr`; never fails
    fn resolve(&self, addr: CodeAddr) -> Label;

    /// Name of the entry label exactly at `addr`
    fn entry_name_at(&self, addr: CodeAddr) -> Option<&str>;
}

/// Resolves nothing; every address is `Unknown`
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSymbols;

impl SymbolTable for NoSymbols {
    fn resolve(&self, addr: CodeAddr) -> Label {
        Label::Unknown(addr)
    }

    fn entry_name_at(&self, _addr: CodeAddr) -> Option<&str> {
        None
    }
}

#[derive(Debug, Default)]
pub struct LabelTable {
    internals: BTreeMap<CodeAddr, String>,
    entries: BTreeMap<CodeAddr, Option<String>>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure entry point; `None` for an anonymous entry
    pub fn add_entry(&mut self, addr: CodeAddr, name: Option<&str>) {
        self.entries.insert(addr, name.map(str::to_string));
    }

    /// Register an internal label belonging to `procedure`
    pub fn add_internal(&mut self, addr: CodeAddr, procedure: &str) {
        self.internals.insert(addr, procedure.to_string());
    }

    /// The closest entry at or below `addr`
    pub fn prev_entry_by_addr(&self, addr: CodeAddr) -> Option<(CodeAddr, Option<&str>)> {
        self.entries
            .range(..=addr)
            .next_back()
            .map(|(&a, name)| (a, name.as_deref()))
    }
}

impl SymbolTable for LabelTable {
    fn resolve(&self, addr: CodeAddr) -> Label {
        if let Some(procedure) = self.internals.get(&addr) {
            return Label::Internal {
                address: addr,
                procedure: procedure.clone(),
            };
        }

        match self.prev_entry_by_addr(addr) {
            Some((entry, Some(name))) if entry == addr => Label::Entry {
                address: addr,
                name: name.to_string(),
            },
            Some((entry, None)) if entry == addr => Label::UnnamedEntry(addr),
            _ => Label::Unknown(addr),
        }
    }

    fn entry_name_at(&self, addr: CodeAddr) -> Option<&str> {
        match self.prev_entry_by_addr(addr) {
            Some((entry, name)) if entry == addr => name,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LabelTable {
        let mut t = LabelTable::new();
        t.add_entry(0x100, Some("list.append/3-0"));
        t.add_entry(0x200, None);
        t.add_internal(0x108, "list.append/3-0");
        t
    }

    #[test]
    fn resolves_each_label_kind() {
        let t = table();
        assert_eq!(
            t.resolve(0x100),
            Label::Entry {
                address: 0x100,
                name: "list.append/3-0".into()
            }
        );
        assert_eq!(t.resolve(0x200), Label::UnnamedEntry(0x200));
        assert!(matches!(t.resolve(0x108), Label::Internal { .. }));
        assert_eq!(t.resolve(0x104), Label::Unknown(0x104));
        assert!(!t.resolve(0x104).is_known());
    }

    #[test]
    fn entry_names_match_exact_addresses_only() {
        let t = table();
        assert_eq!(t.entry_name_at(0x100), Some("list.append/3-0"));
        assert_eq!(t.entry_name_at(0x104), None);
        assert_eq!(t.entry_name_at(0x200), None);
        assert_eq!(t.prev_entry_by_addr(0x1ff).map(|e| e.0), Some(0x100));
        assert_eq!(NoSymbols.entry_name_at(0x100), None);
    }

    #[test]
    fn unknown_labels_render_a_placeholder() {
        assert_eq!(Label::Unknown(0x2a).to_string(), "label UNKNOWN 0x2a");
    }
}
