//! Trace configuration
//!
//! Everything the tracer consults is read from here; nothing lives in
//! process globals. A config is usually loaded from TOML:
//!
//! ```toml
//! lowlevel = false
//! ordinary_regs = true
//! call_window_min = 100
//! call_window_max = 200
//! more_windows = "500-600,900-1000"
//! start_name = "list.append/3-0"
//! watch_call_site = 0x7000
//! stack_model = "own_stacks"
//! ```

use crate::context::StackModel;
use crate::error::IntrospectError;
use crate::watch::ProfilingFacets;
use crate::window::{next_interval, CallWindow, WindowSettings};
use crate::Address;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Calls traced after a call to the start procedure or watched site
pub const DEFAULT_START_BLOCK: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Manual override: trace everything
    pub lowlevel: bool,
    /// Heap allocation messages
    pub heap: bool,
    /// Gotos and register dumps
    pub gotos: bool,
    /// Full choice stack dumps on frame creation, registers on success
    pub detail: bool,
    /// succip, curfr, maxfr, hp and sp in register snapshots
    pub special_regs: bool,
    /// The general purpose registers in register snapshots
    pub ordinary_regs: bool,
    /// Include raw addresses alongside zone offsets
    pub raw_addresses: bool,

    pub call_window_min: Option<u64>,
    pub call_window_max: Option<u64>,
    /// Further windows, `min-max` pairs separated by commas
    pub more_windows: String,

    pub start_name: Option<String>,
    pub start_block: u64,

    /// Word to report at every watch point
    pub watch_address: Option<Address>,
    /// Call-site profiling record to diff at every watch point
    pub watch_call_site: Option<Address>,

    pub stack_model: StackModel,
    pub facets: ProfilingFacets,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            lowlevel: false,
            heap: false,
            gotos: false,
            detail: false,
            special_regs: false,
            ordinary_regs: false,
            raw_addresses: false,
            call_window_min: None,
            call_window_max: None,
            more_windows: String::new(),
            start_name: None,
            start_block: DEFAULT_START_BLOCK,
            watch_address: None,
            watch_call_site: None,
            stack_model: StackModel::default(),
            facets: ProfilingFacets::default(),
        }
    }
}

impl TraceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, IntrospectError> {
        let config: TraceConfig = toml::from_str(text)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, IntrospectError> {
        debug!("loading trace config from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Either register class requested
    pub fn any_regs(&self) -> bool {
        self.special_regs || self.ordinary_regs
    }

    /// Initial window state. An explicit min or max wins (a missing min is
    /// call 1, a missing max is unbounded); otherwise the first window is
    /// taken off `more_windows`.
    pub fn window_settings(&self) -> WindowSettings {
        let (window, more) = match (self.call_window_min, self.call_window_max) {
            (Some(min), Some(max)) => (CallWindow::new(min, max), self.more_windows.clone()),
            (Some(min), None) => (CallWindow::new(min, u64::MAX), self.more_windows.clone()),
            (None, Some(max)) => {
                debug!("call_window_max without call_window_min: window starts at call 1");
                (CallWindow::new(1, max), self.more_windows.clone())
            }
            _ => next_interval(&self.more_windows),
        };

        WindowSettings {
            window,
            more,
            start_name: self.start_name.clone(),
            start_block: self.start_block,
            watch_site: self.watch_call_site,
            manual: self.lowlevel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_traces_nothing() {
        let c = TraceConfig::default();
        let w = c.window_settings();
        assert!(!w.manual);
        assert_eq!(w.window, None);
        assert_eq!(w.start_block, DEFAULT_START_BLOCK);
        assert!(!c.any_regs());
    }

    #[test]
    fn parses_toml() {
        let c = TraceConfig::from_toml_str(
            r#"
            ordinary_regs = true
            call_window_min = 100
            call_window_max = 200
            more_windows = "500-600"
            start_name = "list.append/3-0"
            start_block = 5
            watch_call_site = 0x7000
            stack_model = "own_stacks"

            [facets]
            timing = false
            "#,
        )
        .unwrap();

        assert!(c.any_regs());
        assert_eq!(c.stack_model, StackModel::OwnStacks);
        assert_eq!(c.watch_call_site, Some(0x7000));
        assert!(!c.facets.timing);
        assert!(c.facets.port_counts);

        let w = c.window_settings();
        assert_eq!(w.window, CallWindow::new(100, 200));
        assert_eq!(w.more, "500-600");
        assert_eq!(w.start_block, 5);
    }

    #[test]
    fn first_window_can_come_from_the_list() {
        let c = TraceConfig {
            more_windows: "3-7,9-10".to_string(),
            ..Default::default()
        };
        let w = c.window_settings();
        assert_eq!(w.window, CallWindow::new(3, 7));
        assert_eq!(w.more, "9-10");
    }

    #[test]
    fn max_alone_opens_a_window_at_the_first_call() {
        let c = TraceConfig {
            call_window_max: Some(5),
            more_windows: "9-10".to_string(),
            ..Default::default()
        };
        let w = c.window_settings();
        assert_eq!(w.window, CallWindow::new(1, 5));
        assert_eq!(w.more, "9-10");
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let err = TraceConfig::from_toml_str("verbose = true").unwrap_err();
        assert!(matches!(err, IntrospectError::Config(_)));
        assert!(!err.is_fatal());
    }
}
