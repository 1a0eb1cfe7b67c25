//! Call-count windows that switch verbose tracing on and off
//!
//! Three independent windows are tracked against one call counter: a
//! call-number range, a block of calls following a call to a named
//! procedure, and a block following entry to a watched call site. Tracing
//! is enabled while any of them, or the manual override, is active.

use crate::symbols::SymbolTable;
use crate::{Address, CodeAddr};
use log::debug;

/// Half-open range of call numbers `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallWindow {
    pub min: u64,
    pub max: u64,
}

impl CallWindow {
    /// `None` for an empty range
    pub fn new(min: u64, max: u64) -> Option<Self> {
        (min < max).then_some(CallWindow { min, max })
    }
}

/// Take the next `min-max` window off a comma separated list.
///
/// Returns the window and the unparsed remainder. An empty list, or a
/// malformed or empty entry, ends the list: no window and nothing left.
pub fn next_interval(spec: &str) -> (Option<CallWindow>, String) {
    let (head, rest) = match spec.split_once(',') {
        Some((head, rest)) => (head, rest),
        None => (spec, ""),
    };

    let parsed = head.split_once('-').and_then(|(min, max)| {
        let min = min.trim().parse::<u64>().ok()?;
        let max = max.trim().parse::<u64>().ok()?;
        CallWindow::new(min, max)
    });

    match parsed {
        Some(window) => (Some(window), rest.trim().to_string()),
        None => {
            if !head.trim().is_empty() {
                debug!("ignoring malformed call window spec <{}>", spec);
            }
            (None, String::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    EnteringRegion { window: CallWindow, more: String },
    /// `next` is the window parsed from the remaining list, if any
    LeavingRegion { next: Option<CallWindow>, more: String },
    EnteringNameBlock { name: String },
    LeavingNameBlock,
    EnteringCallSiteBlock { site: Address },
    LeavingCallSiteBlock,
}

/// What one call event did to the windows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOutcome {
    pub call: u64,
    pub events: Vec<WindowEvent>,
    /// The watched call site was just entered
    pub watch_started: bool,
}

/// Initial window configuration
#[derive(Debug, Clone, Default)]
pub struct WindowSettings {
    pub window: Option<CallWindow>,
    pub more: String,
    pub start_name: Option<String>,
    pub start_block: u64,
    pub watch_site: Option<Address>,
    pub manual: bool,
}

#[derive(Debug, Clone)]
pub struct CallWindowController {
    calls: u64,

    window: Option<CallWindow>,
    more: String,
    region_enabled: bool,

    start_name: Option<String>,
    start_block: u64,
    name_enabled: bool,
    name_until: Option<u64>,

    watch_site: Option<Address>,
    site_enabled: bool,
    site_until: Option<u64>,

    manual: bool,
    print_enabled: bool,
}

impl CallWindowController {
    pub fn new(settings: WindowSettings) -> Self {
        CallWindowController {
            calls: 0,
            window: settings.window,
            more: settings.more,
            region_enabled: false,
            start_name: settings.start_name,
            start_block: settings.start_block,
            name_enabled: false,
            name_until: None,
            watch_site: settings.watch_site,
            site_enabled: false,
            site_until: None,
            manual: settings.manual,
            print_enabled: settings.manual,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn window(&self) -> Option<CallWindow> {
        self.window
    }

    pub fn more(&self) -> &str {
        &self.more
    }

    pub fn region_active(&self) -> bool {
        self.region_enabled
    }

    pub fn name_active(&self) -> bool {
        self.name_enabled
    }

    pub fn site_active(&self) -> bool {
        self.site_enabled
    }

    pub fn print_enabled(&self) -> bool {
        self.print_enabled
    }

    /// Turn on the manual override. Nothing here turns it off again.
    pub fn enable_manual(&mut self) {
        self.manual = true;
        self.print_enabled = true;
    }

    /// Count a call or tail call to `target` and update every window.
    ///
    /// `next_call_site` is the address of the profiling record the call is
    /// about to create, or `None` when call-site profiling is inactive.
    pub fn on_call(
        &mut self,
        target: CodeAddr,
        symbols: &dyn SymbolTable,
        next_call_site: Option<Address>,
    ) -> CallOutcome {
        self.calls += 1;
        let n = self.calls;
        let mut outcome = CallOutcome {
            call: n,
            ..Default::default()
        };

        self.step_region(n, &mut outcome.events);
        self.step_name(n, target, symbols, &mut outcome.events);
        outcome.watch_started = self.step_site(n, next_call_site, &mut outcome.events);

        self.print_enabled = self.region_enabled || self.name_enabled || self.site_enabled || self.manual;
        outcome
    }

    fn step_region(&mut self, n: u64, events: &mut Vec<WindowEvent>) {
        if !self.region_enabled {
            if let Some(window) = self.window.filter(|w| w.min == n) {
                self.region_enabled = true;
                debug!("call {}: entering printed region", n);
                events.push(WindowEvent::EnteringRegion {
                    window,
                    more: self.more.clone(),
                });
            }
        } else if self.window.is_some_and(|w| w.max == n) {
            self.region_enabled = false;
            let (next, more) = next_interval(&self.more);
            self.window = next;
            self.more = more;
            debug!("call {}: leaving printed region, next {:?}", n, next);
            events.push(WindowEvent::LeavingRegion {
                next,
                more: self.more.clone(),
            });
        }
    }

    fn step_name(&mut self, n: u64, target: CodeAddr, symbols: &dyn SymbolTable, events: &mut Vec<WindowEvent>) {
        let matched = match &self.start_name {
            Some(name) => symbols.entry_name_at(target) == Some(name.as_str()),
            None => false,
        };

        if matched {
            self.name_enabled = true;
            self.name_until = Some(n + self.start_block);
            events.push(WindowEvent::EnteringNameBlock {
                name: self.start_name.clone().unwrap_or_default(),
            });
        } else if self.name_until == Some(n) {
            self.name_enabled = false;
            events.push(WindowEvent::LeavingNameBlock);
        }
    }

    fn step_site(&mut self, n: u64, next_call_site: Option<Address>, events: &mut Vec<WindowEvent>) -> bool {
        match self.watch_site {
            Some(site) if next_call_site == Some(site) => {
                self.site_enabled = true;
                self.site_until = Some(n + self.start_block);
                events.push(WindowEvent::EnteringCallSiteBlock { site });
                true
            }
            _ => {
                if self.site_until == Some(n) {
                    self.site_enabled = false;
                    events.push(WindowEvent::LeavingCallSiteBlock);
                }
                false
            }
        }
    }
}
