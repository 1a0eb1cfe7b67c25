//! Read-only view of the machine handed to every trace hook

use crate::classify::PointerClassifier;
use crate::context::{ContextDirectory, StackModel};
use crate::symbols::SymbolTable;
use crate::watch::CallSiteSource;
use crate::zone::{Zone, ZoneId, ZoneRegistry};
use crate::{Address, CodeAddr, Word};

/// Number of general purpose registers shown in snapshots
pub const NUM_ORDINARY_REGS: usize = 8;

/// The abstract machine registers the tracer reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    /// Success continuation
    pub succip: CodeAddr,
    /// Current choice-point frame
    pub curfr: Address,
    /// Topmost choice-point frame
    pub maxfr: Address,
    /// Heap pointer
    pub hp: Address,
    /// Det stack pointer
    pub sp: Address,
    /// Sentinel below the oldest frame a stack dump shows
    pub choice_bottom: Address,
    pub general: [Word; NUM_ORDINARY_REGS],
}

/// Borrowed collaborators for one hook invocation
#[derive(Clone, Copy)]
pub struct MachineView<'a> {
    pub zones: &'a ZoneRegistry,
    pub contexts: &'a ContextDirectory,
    pub registers: &'a Registers,
    pub symbols: &'a dyn SymbolTable,
    /// Absent under a conservative collector
    pub heap: Option<ZoneId>,
    /// Present only when call-site profiling is active
    pub call_sites: Option<&'a dyn CallSiteSource>,
}

impl<'a> MachineView<'a> {
    pub fn new(
        zones: &'a ZoneRegistry,
        contexts: &'a ContextDirectory,
        registers: &'a Registers,
        symbols: &'a dyn SymbolTable,
    ) -> Self {
        MachineView {
            zones,
            contexts,
            registers,
            symbols,
            heap: None,
            call_sites: None,
        }
    }

    pub fn with_heap(mut self, heap: ZoneId) -> Self {
        self.heap = Some(heap);
        self
    }

    pub fn with_call_sites(mut self, call_sites: &'a dyn CallSiteSource) -> Self {
        self.call_sites = Some(call_sites);
        self
    }

    pub fn classifier(&self, model: StackModel) -> PointerClassifier<'a> {
        PointerClassifier::new(self.contexts, self.zones, model)
    }

    pub fn heap_zone(&self) -> Option<&'a Zone> {
        self.heap.and_then(|id| self.zones.zone(id))
    }
}
