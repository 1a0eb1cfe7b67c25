//! Differential watch over one call site's profiling record
//!
//! The engine keeps a value copy of the last record it saw. Each poll
//! compares the live record against that copy in a fixed field order and
//! reports a change when any field differs, then takes a fresh copy.

use crate::Address;
use log::debug;
use serde::Deserialize;

/// Identity of a procedure's dynamic profiling node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcRef(pub Address);

/// Which profiling facets the engine was built to record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfilingFacets {
    pub port_counts: bool,
    /// Only meaningful with port counts; otherwise calls are derived
    pub explicit_call_counts: bool,
    pub timing: bool,
    pub memory: bool,
}

impl Default for ProfilingFacets {
    fn default() -> Self {
        ProfilingFacets {
            port_counts: true,
            explicit_call_counts: false,
            timing: true,
            memory: true,
        }
    }
}

/// One per-call-site counter, in comparison order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    Calls,
    Exits,
    Fails,
    Redos,
    Quanta,
    Allocations,
    WordsAllocated,
}

impl MetricField {
    pub const ALL: [MetricField; 7] = [
        MetricField::Calls,
        MetricField::Exits,
        MetricField::Fails,
        MetricField::Redos,
        MetricField::Quanta,
        MetricField::Allocations,
        MetricField::WordsAllocated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricField::Calls => "calls",
            MetricField::Exits => "exits",
            MetricField::Fails => "fails",
            MetricField::Redos => "redos",
            MetricField::Quanta => "quanta",
            MetricField::Allocations => "allocs",
            MetricField::WordsAllocated => "words",
        }
    }
}

/// Own-cost counters. A field is `None` when its facet is not recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnMetrics {
    pub calls: Option<u64>,
    pub exits: Option<u64>,
    pub fails: Option<u64>,
    pub redos: Option<u64>,
    pub quanta: Option<u64>,
    pub allocations: Option<u64>,
    pub words_allocated: Option<u64>,
}

impl OwnMetrics {
    /// All recorded fields present and zero
    pub fn zeroed(facets: ProfilingFacets) -> Self {
        let port = facets.port_counts.then_some(0);
        OwnMetrics {
            calls: (facets.port_counts && facets.explicit_call_counts).then_some(0),
            exits: port,
            fails: port,
            redos: port,
            quanta: facets.timing.then_some(0),
            allocations: facets.memory.then_some(0),
            words_allocated: facets.memory.then_some(0),
        }
    }

    pub fn get(&self, field: MetricField) -> Option<u64> {
        match field {
            MetricField::Calls => self.calls,
            MetricField::Exits => self.exits,
            MetricField::Fails => self.fails,
            MetricField::Redos => self.redos,
            MetricField::Quanta => self.quanta,
            MetricField::Allocations => self.allocations,
            MetricField::WordsAllocated => self.words_allocated,
        }
    }

    /// Present fields, in comparison order
    pub fn present(&self) -> impl Iterator<Item = (MetricField, u64)> + '_ {
        MetricField::ALL
            .iter()
            .filter_map(move |&field| self.get(field).map(|v| (field, v)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSiteDynamicRecord {
    pub callee: Option<ProcRef>,
    pub own: OwnMetrics,
    pub depth_count: u32,
}

impl CallSiteDynamicRecord {
    pub fn zeroed(facets: ProfilingFacets) -> Self {
        CallSiteDynamicRecord {
            callee: None,
            own: OwnMetrics::zeroed(facets),
            depth_count: 0,
        }
    }

    /// Stand-in for a missing record: every optional field absent
    pub fn absent() -> Self {
        Self::default()
    }
}

/// The first field found to differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Callee,
    Metric(MetricField),
    DepthCount,
}

/// First differing field of two records, if any. Callee identity first,
/// then each metric in declaration order, then depth.
pub fn first_difference(old: &CallSiteDynamicRecord, new: &CallSiteDynamicRecord) -> Option<RecordField> {
    if old.callee != new.callee {
        return Some(RecordField::Callee);
    }
    for field in MetricField::ALL {
        if old.own.get(field) != new.own.get(field) {
            return Some(RecordField::Metric(field));
        }
    }
    if old.depth_count != new.depth_count {
        return Some(RecordField::DepthCount);
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub at_call_count: u64,
    pub site: Address,
    pub field: RecordField,
    pub new_value: CallSiteDynamicRecord,
}

/// Profiling records owned by the machine
pub trait CallSiteSource {
    /// The record stored at `addr`, if one lives there
    fn record_at(&self, addr: Address) -> Option<CallSiteDynamicRecord>;

    /// Address the next created call-site record will occupy
    fn next_call_site(&self) -> Option<Address>;
}

#[derive(Debug, Clone)]
pub struct DifferentialWatch {
    site: Option<Address>,
    started: bool,
    snapshot: CallSiteDynamicRecord,
}

impl DifferentialWatch {
    pub fn new(site: Option<Address>, facets: ProfilingFacets) -> Self {
        DifferentialWatch {
            site,
            started: false,
            snapshot: CallSiteDynamicRecord::zeroed(facets),
        }
    }

    pub fn site(&self) -> Option<Address> {
        self.site
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Begin comparing. Called once the watched site has been entered.
    pub fn start(&mut self) {
        if let Some(site) = self.site {
            if !self.started {
                debug!("call-site watch started at 0x{:x}", site);
                self.started = true;
            }
        }
    }

    pub fn snapshot(&self) -> &CallSiteDynamicRecord {
        &self.snapshot
    }

    /// Compare `current` with the retained copy, then retain `current`
    pub fn poll(&mut self, call_count: u64, current: Option<&CallSiteDynamicRecord>) -> Option<ChangeEvent> {
        let site = self.site?;
        if !self.started {
            return None;
        }

        let current = current.copied().unwrap_or_else(CallSiteDynamicRecord::absent);
        let changed = first_difference(&self.snapshot, &current);
        self.snapshot = current;

        changed.map(|field| ChangeEvent {
            at_call_count: call_count,
            site,
            field,
            new_value: current,
        })
    }
}
