use crate::symbols::{LabelTable, NoSymbols};
use crate::window::*;
use test_log::test;

const APPEND: u64 = 0x100;
const OTHER: u64 = 0x200;

fn labels() -> LabelTable {
    let mut t = LabelTable::new();
    t.add_entry(APPEND, Some("append"));
    t.add_entry(OTHER, Some("other"));
    t
}

fn range(min: u64, max: u64, more: &str) -> CallWindowController {
    CallWindowController::new(WindowSettings {
        window: CallWindow::new(min, max),
        more: more.to_string(),
        start_block: 100,
        ..Default::default()
    })
}

#[test]
fn test_interval_parsing() {
    assert_eq!(
        next_interval("10-20,30-40"),
        (CallWindow::new(10, 20), "30-40".to_string())
    );
    assert_eq!(next_interval(" 30 - 40 "), (CallWindow::new(30, 40), String::new()));
    assert_eq!(next_interval(""), (None, String::new()));
    assert_eq!(next_interval("7"), (None, String::new()));
    assert_eq!(next_interval("9-3,1-2"), (None, String::new()));
    assert_eq!(next_interval("x-y,1-2"), (None, String::new()));
}

#[test]
fn test_range_window_active_for_three_to_six() {
    let mut ctl = range(3, 7, "");
    let mut active = Vec::new();
    for _ in 0..10 {
        let out = ctl.on_call(OTHER, &NoSymbols, None);
        if ctl.region_active() {
            active.push(out.call);
        }
        assert_eq!(ctl.print_enabled(), ctl.region_active());
    }
    assert_eq!(active, vec![3, 4, 5, 6]);
}

#[test]
fn test_range_exit_loads_next_window() {
    let mut ctl = range(3, 7, "9-10,20-22");
    let mut events = Vec::new();
    for _ in 0..9 {
        events.extend(ctl.on_call(OTHER, &NoSymbols, None).events);
    }

    assert_eq!(
        events,
        vec![
            WindowEvent::EnteringRegion {
                window: CallWindow { min: 3, max: 7 },
                more: "9-10,20-22".to_string(),
            },
            WindowEvent::LeavingRegion {
                next: CallWindow::new(9, 10),
                more: "20-22".to_string(),
            },
            WindowEvent::EnteringRegion {
                window: CallWindow { min: 9, max: 10 },
                more: "20-22".to_string(),
            },
        ]
    );
    assert!(ctl.region_active());
    ctl.on_call(OTHER, &NoSymbols, None);
    assert!(!ctl.region_active());
    assert_eq!(ctl.window(), CallWindow::new(20, 22));
}

#[test]
fn test_exhausted_spec_never_reenables() {
    let mut ctl = range(1, 2, "garbage");
    for _ in 0..50 {
        ctl.on_call(OTHER, &NoSymbols, None);
    }
    assert_eq!(ctl.window(), None);
    assert_eq!(ctl.more(), "");
    assert!(!ctl.print_enabled());
}

#[test]
fn test_name_block() {
    let mut ctl = CallWindowController::new(WindowSettings {
        start_name: Some("append".to_string()),
        start_block: 3,
        ..Default::default()
    });
    let symbols = labels();

    assert!(ctl.on_call(OTHER, &symbols, None).events.is_empty());
    let out = ctl.on_call(APPEND, &symbols, None);
    assert_eq!(
        out.events,
        vec![WindowEvent::EnteringNameBlock {
            name: "append".to_string()
        }]
    );
    assert!(ctl.name_active() && ctl.print_enabled());

    ctl.on_call(OTHER, &symbols, None);
    ctl.on_call(OTHER, &symbols, None);
    let out = ctl.on_call(OTHER, &symbols, None);
    assert_eq!(out.call, 5);
    assert_eq!(out.events, vec![WindowEvent::LeavingNameBlock]);
    assert!(!ctl.print_enabled());
}

#[test]
fn test_unresolvable_name_does_not_match() {
    let mut ctl = CallWindowController::new(WindowSettings {
        start_name: Some("append".to_string()),
        start_block: 3,
        ..Default::default()
    });
    let out = ctl.on_call(APPEND, &NoSymbols, None);
    assert!(out.events.is_empty());
    assert!(!ctl.name_active());
}

#[test]
fn test_region_and_name_expiry_on_same_call() {
    let mut ctl = CallWindowController::new(WindowSettings {
        window: CallWindow::new(1, 4),
        start_name: Some("append".to_string()),
        start_block: 3,
        ..Default::default()
    });
    let symbols = labels();

    ctl.on_call(APPEND, &symbols, None);
    ctl.on_call(OTHER, &symbols, None);
    ctl.on_call(OTHER, &symbols, None);
    let out = ctl.on_call(OTHER, &symbols, None);
    assert_eq!(out.call, 4);
    assert_eq!(out.events.len(), 2);
    assert!(matches!(out.events[0], WindowEvent::LeavingRegion { next: None, .. }));
    assert_eq!(out.events[1], WindowEvent::LeavingNameBlock);
}

#[test]
fn test_call_site_block_starts_watch() {
    let mut ctl = CallWindowController::new(WindowSettings {
        start_block: 2,
        watch_site: Some(0x7000),
        ..Default::default()
    });

    let out = ctl.on_call(OTHER, &NoSymbols, Some(0x6ff0));
    assert!(!out.watch_started);
    let out = ctl.on_call(OTHER, &NoSymbols, Some(0x7000));
    assert!(out.watch_started);
    assert_eq!(out.events, vec![WindowEvent::EnteringCallSiteBlock { site: 0x7000 }]);
    assert!(ctl.site_active());

    ctl.on_call(OTHER, &NoSymbols, None);
    let out = ctl.on_call(OTHER, &NoSymbols, None);
    assert_eq!(out.events, vec![WindowEvent::LeavingCallSiteBlock]);
    assert!(!ctl.site_active());
}

#[test]
fn test_manual_override_survives_window_exit() {
    let mut ctl = range(1, 2, "");
    ctl.enable_manual();
    for _ in 0..4 {
        ctl.on_call(OTHER, &NoSymbols, None);
        assert!(ctl.print_enabled());
    }
}
