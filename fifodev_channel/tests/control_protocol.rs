//! # Control-protocol and ledger behavior
//!
//! Tests the command dispatcher end to end: register semantics of each
//! command, access-window validation, ledger population by `Info`, and
//! teardown on fresh and used devices.

use std::sync::Arc;
use std::thread;

use fifodev::config::DeviceConfig;
use fifodev::consts::DEFAULT_QUANTUM;
use fifodev_channel::{
    ArgCell, ChannelError, CommandCode, ControlArg, FifoDevice, TaskCell,
};

// ─── Helpers ────────────────────────────────────────────────────────

fn device() -> FifoDevice {
    FifoDevice::new(&DeviceConfig::default()).expect("valid config")
}

fn query(dev: &FifoDevice) -> i64 {
    dev.dispatch(CommandCode::Query as u32, &mut ControlArg::None)
        .unwrap()
}

// ─── Register command semantics ─────────────────────────────────────

#[test]
fn exchange_returns_old_value_and_installs_new() {
    let dev = device();
    assert_eq!(query(&dev), DEFAULT_QUANTUM);

    let mut cell = ArgCell::new(77);
    let old = dev
        .dispatch(CommandCode::Exchange as u32, &mut ControlArg::Cell(&mut cell))
        .unwrap();

    assert_eq!(old, DEFAULT_QUANTUM);
    assert_eq!(cell.value(), DEFAULT_QUANTUM, "old value written back through the cell");
    assert_eq!(query(&dev), 77);
}

#[test]
fn shift_is_tell_plus_query() {
    let dev = device();

    let old = dev
        .dispatch(CommandCode::Shift as u32, &mut ControlArg::Value(55))
        .unwrap();
    assert_eq!(old, DEFAULT_QUANTUM);
    assert_eq!(query(&dev), 55);
}

#[test]
fn set_get_roundtrip_through_cells() {
    let dev = device();

    let mut input = ArgCell::read_only(2048);
    dev.dispatch(CommandCode::Set as u32, &mut ControlArg::Cell(&mut input))
        .unwrap();

    let mut output = ArgCell::write_only();
    dev.dispatch(CommandCode::Get as u32, &mut ControlArg::Cell(&mut output))
        .unwrap();
    assert_eq!(output.value(), 2048);
}

#[test]
fn reset_restores_configured_default() {
    let dev = device();

    dev.dispatch(CommandCode::Tell as u32, &mut ControlArg::Value(1))
        .unwrap();
    assert_eq!(query(&dev), 1);

    dev.dispatch(CommandCode::Reset as u32, &mut ControlArg::None)
        .unwrap();
    assert_eq!(query(&dev), DEFAULT_QUANTUM);
}

// ─── Validation: no side effect on failure ──────────────────────────

#[test]
fn out_of_range_code_is_rejected_before_dispatch() {
    let dev = device();

    for code in [8u32, 100, u32::MAX] {
        let result = dev.dispatch(code, &mut ControlArg::None);
        assert!(matches!(result, Err(ChannelError::InvalidCommand { .. })));
    }
    assert_eq!(query(&dev), DEFAULT_QUANTUM);
}

#[test]
fn unreadable_cell_faults_without_register_mutation() {
    let dev = device();

    let mut cell = ArgCell::write_only();
    let result = dev.dispatch(CommandCode::Set as u32, &mut ControlArg::Cell(&mut cell));
    assert!(matches!(result, Err(ChannelError::AccessFault { .. })));
    assert_eq!(query(&dev), DEFAULT_QUANTUM);
}

#[test]
fn unwritable_cell_faults_without_register_mutation() {
    let dev = device();

    let mut cell = ArgCell::inaccessible();
    for code in [CommandCode::Get, CommandCode::Exchange] {
        let result = dev.dispatch(code as u32, &mut ControlArg::Cell(&mut cell));
        assert!(matches!(result, Err(ChannelError::AccessFault { .. })));
    }
    assert_eq!(query(&dev), DEFAULT_QUANTUM);
}

#[test]
fn wrong_argument_kind_is_an_access_fault() {
    let dev = device();

    // Set wants a cell, not a bare value.
    let result = dev.dispatch(CommandCode::Set as u32, &mut ControlArg::Value(9));
    assert!(matches!(result, Err(ChannelError::AccessFault { .. })));

    // Info wants a task cell.
    let result = dev.dispatch(CommandCode::Info as u32, &mut ControlArg::None);
    assert!(matches!(result, Err(ChannelError::AccessFault { .. })));

    assert_eq!(query(&dev), DEFAULT_QUANTUM);
}

// ─── Info command and the ledger ────────────────────────────────────

#[test]
fn info_snapshot_identifies_the_calling_thread() {
    let dev = device();
    let mut task = TaskCell::new();

    dev.dispatch(CommandCode::Info as u32, &mut ControlArg::Task(&mut task))
        .unwrap();

    let snapshot = task.snapshot().expect("snapshot delivered");
    assert_eq!(snapshot.tgid, nix::unistd::getpid().as_raw());
    assert_eq!(snapshot.pid, nix::unistd::gettid().as_raw());
}

#[test]
fn repeated_info_from_one_thread_registers_one_pair() {
    let dev = device();
    let mut task = TaskCell::new();

    for _ in 0..3 {
        dev.dispatch(CommandCode::Info as u32, &mut ControlArg::Task(&mut task))
            .unwrap();
    }
    assert_eq!(dev.ledger().len(), 1);
}

#[test]
fn info_from_sibling_threads_registers_distinct_pairs() {
    let dev = Arc::new(device());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dev = Arc::clone(&dev);
            thread::spawn(move || {
                let mut task = TaskCell::new();
                dev.dispatch(CommandCode::Info as u32, &mut ControlArg::Task(&mut task))
                    .unwrap();
                task.snapshot().unwrap().pid
            })
        })
        .collect();

    let mut pids: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    pids.sort_unstable();
    pids.dedup();
    assert_eq!(pids.len(), 4, "sibling threads have distinct tids");

    let entries = dev.ledger().snapshot();
    assert_eq!(entries.len(), 4);
    let tgid = nix::unistd::getpid().as_raw();
    assert!(entries.iter().all(|e| e.tgid == tgid));
}

#[test]
fn unwritable_task_cell_does_not_touch_the_ledger() {
    let dev = device();

    let mut task = TaskCell::inaccessible();
    let result = dev.dispatch(CommandCode::Info as u32, &mut ControlArg::Task(&mut task));
    assert!(matches!(result, Err(ChannelError::AccessFault { .. })));
    assert!(dev.ledger().is_empty());
}

// ─── Teardown ───────────────────────────────────────────────────────

#[test]
fn teardown_on_never_used_device_completes_cleanly() {
    let dev = device();
    dev.teardown();
    dev.teardown();
    drop(dev); // Drop must not release anything twice.
}

#[test]
fn teardown_after_use_drains_the_ledger() {
    let dev = device();
    let mut task = TaskCell::new();
    dev.dispatch(CommandCode::Info as u32, &mut ControlArg::Task(&mut task))
        .unwrap();
    assert_eq!(dev.ledger().len(), 1);

    dev.teardown();
    assert!(dev.ledger().is_empty());
}
