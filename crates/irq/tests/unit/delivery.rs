//! Delivery Engine Tests.
//!
//! Verifies that the disabled → enabled transition is the only delivery
//! trigger, that batches are dispatched lowest line first, that raises
//! coalesce, and that delivery never re-enters itself.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use hostirq_core::config::PendingBackend;
use hostirq_core::host::NoopHost;
use hostirq_core::{EnableFlag, LineId};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{config, recording_controller, table_controller};

#[rstest]
#[case::atomic(PendingBackend::Atomic)]
#[case::locked(PendingBackend::Locked)]
fn every_line_is_delivered_exactly_once(#[case] backend: PendingBackend) {
    let ctl = recording_controller(config(64, backend));
    for raw in 1..64 {
        ctl.local_irq_disable();
        ctl.raise(raw).unwrap_or_else(|e| panic!("raise {raw}: {e}"));
        ctl.restore_enable_state(EnableFlag::Enabled);

        assert_eq!(ctl.domain().count(raw), 1, "line {raw}");
        let line = LineId::new(raw, 64).unwrap_or_else(|| panic!("line {raw}"));
        assert!(!ctl.pending_lines().contains(line));
    }
    assert_eq!(ctl.domain().dispatched().len(), 63);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(17)]
#[case(1000)]
fn k_raises_before_enable_dispatch_once(#[case] k: usize) {
    let ctl = recording_controller(config(64, PendingBackend::Auto));
    for _ in 0..k {
        ctl.raise(5).unwrap_or_else(|e| panic!("{e}"));
    }
    ctl.local_irq_enable();

    assert_eq!(ctl.domain().dispatched(), vec![5]);
    let stats = ctl.stats();
    assert_eq!(stats.raised, k as u64);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.coalesced(), k as u64 - 1);
}

#[test]
fn batch_is_dispatched_lowest_first() {
    let ctl = recording_controller(config(64, PendingBackend::Auto));
    for raw in [40, 3, 63, 1, 17] {
        ctl.raise(raw).unwrap_or_else(|e| panic!("{e}"));
    }
    ctl.local_irq_enable();
    assert_eq!(ctl.domain().dispatched(), vec![1, 3, 17, 40, 63]);
    assert_eq!(ctl.stats().delivery_passes, 1);
}

#[test]
fn raise_while_enabled_waits_for_next_transition() {
    let ctl = recording_controller(config(64, PendingBackend::Auto));
    ctl.local_irq_enable();

    ctl.raise(9).unwrap_or_else(|e| panic!("{e}"));
    // Enabled → enabled is not a transition.
    ctl.restore_enable_state(EnableFlag::Enabled);
    assert!(ctl.domain().dispatched().is_empty());

    ctl.local_irq_disable();
    ctl.local_irq_enable();
    assert_eq!(ctl.domain().dispatched(), vec![9]);
}

#[test]
fn disabling_never_delivers() {
    let ctl = recording_controller(config(64, PendingBackend::Auto));
    ctl.raise(2).unwrap_or_else(|e| panic!("{e}"));
    ctl.restore_enable_state(EnableFlag::Disabled);
    ctl.local_irq_disable();
    assert!(ctl.domain().dispatched().is_empty());
    assert_eq!(ctl.pending_lines().len(), 1);
}

#[test]
fn empty_transition_counts_no_pass() {
    let ctl = recording_controller(config(64, PendingBackend::Auto));
    ctl.local_irq_enable();
    ctl.local_irq_disable();
    ctl.local_irq_enable();
    assert_eq!(ctl.stats().delivery_passes, 0);
}

#[test]
fn handler_runs_in_interrupt_context() {
    let ctl = table_controller(config(64, PendingBackend::Auto), Arc::new(NoopHost));
    let line = ctl.allocate_line("probe").unwrap_or_else(|e| panic!("{e}"));
    let seen = Arc::new(AtomicBool::new(false));
    let weak = Arc::downgrade(&ctl);
    let flag = Arc::clone(&seen);
    ctl.handlers()
        .request_irq(line, "probe", move |_| {
            if let Some(ctl) = weak.upgrade() {
                flag.store(ctl.in_interrupt(), Ordering::SeqCst);
            }
        })
        .unwrap_or_else(|e| panic!("{e}"));

    ctl.raise(line.get()).unwrap_or_else(|e| panic!("{e}"));
    ctl.local_irq_enable();

    assert!(seen.load(Ordering::SeqCst));
    assert!(!ctl.in_interrupt());
}

#[test]
fn restore_inside_handler_does_not_nest_delivery() {
    let ctl = table_controller(config(64, PendingBackend::Auto), Arc::new(NoopHost));
    let first = ctl.allocate_line("first").unwrap_or_else(|e| panic!("{e}"));
    let second = ctl.allocate_line("second").unwrap_or_else(|e| panic!("{e}"));
    let order = Arc::new(Mutex::new(Vec::new()));

    let weak = Arc::downgrade(&ctl);
    let log = Arc::clone(&order);
    ctl.handlers()
        .request_irq(first, "first", move |line| {
            log.lock().unwrap_or_else(PoisonError::into_inner).push(line.get());
            if let Some(ctl) = weak.upgrade() {
                // Re-raise a line and re-enable from dispatch context: this
                // must only record the flag, not start a nested pass.
                let _ = ctl.raise(second.get());
                let saved = ctl.local_irq_save();
                ctl.restore_enable_state(EnableFlag::Enabled);
                ctl.restore_enable_state(saved);
            }
        })
        .unwrap_or_else(|e| panic!("{e}"));
    let log = Arc::clone(&order);
    ctl.handlers()
        .request_irq(second, "second", move |line| {
            log.lock().unwrap_or_else(PoisonError::into_inner).push(line.get());
        })
        .unwrap_or_else(|e| panic!("{e}"));

    ctl.raise(first.get()).unwrap_or_else(|e| panic!("{e}"));
    ctl.local_irq_enable();

    // The second line was raised mid-batch and is deferred.
    assert_eq!(*order.lock().unwrap_or_else(PoisonError::into_inner), vec![first.get()]);
    assert!(ctl.pending_lines().contains(second));
    assert_eq!(ctl.stats().delivery_passes, 1);

    ctl.local_irq_disable();
    ctl.local_irq_enable();
    assert_eq!(
        *order.lock().unwrap_or_else(PoisonError::into_inner),
        vec![first.get(), second.get()]
    );
    assert!(ctl.pending_lines().is_empty());
}

#[test]
fn lines_raised_during_batch_are_deferred() {
    let ctl = table_controller(config(64, PendingBackend::Auto), Arc::new(NoopHost));
    let line = ctl.allocate_line("self-raising").unwrap_or_else(|e| panic!("{e}"));
    let weak = Arc::downgrade(&ctl);
    ctl.handlers()
        .request_irq(line, "self-raising", move |line| {
            if let Some(ctl) = weak.upgrade() {
                let _ = ctl.raise(line.get());
            }
        })
        .unwrap_or_else(|e| panic!("{e}"));

    ctl.raise(line.get()).unwrap_or_else(|e| panic!("{e}"));
    ctl.local_irq_enable();
    assert_eq!(ctl.handlers().count(line), 1);
    assert!(ctl.pending_lines().contains(line));

    for expected in 2..=4 {
        ctl.local_irq_disable();
        ctl.local_irq_enable();
        assert_eq!(ctl.handlers().count(line), expected);
    }
}

#[test]
fn panicking_handler_leaves_interrupt_context() {
    let ctl = table_controller(config(64, PendingBackend::Auto), Arc::new(NoopHost));
    let line = ctl.allocate_line("faulty").unwrap_or_else(|e| panic!("{e}"));
    ctl.handlers()
        .request_irq(line, "faulty", |_| panic!("handler fault"))
        .unwrap_or_else(|e| panic!("{e}"));
    ctl.raise(line.get()).unwrap_or_else(|e| panic!("{e}"));

    let result = panic::catch_unwind(AssertUnwindSafe(|| ctl.local_irq_enable()));

    assert!(result.is_err());
    assert!(!ctl.in_interrupt());
}
