//! Chip Contract Tests.
//!
//! The dummy chip must never touch the host for lifecycle operations and
//! must forward resource requests and releases.

use std::sync::Arc;

use hostirq_core::chip::{DummyChip, IrqChip};
use hostirq_core::{IrqError, LineId};
use mockall::predicate::eq;

use crate::common::mocks::host::MockHost;

fn line(raw: u32) -> LineId {
    LineId::new(raw, 64).unwrap_or_else(|| panic!("line {raw} out of range"))
}

#[test]
fn lifecycle_operations_are_noops() {
    // No expectations: any host call would panic.
    let chip = DummyChip::new(Arc::new(MockHost::new()));
    let l = line(4);
    chip.startup(l);
    chip.enable(l);
    chip.ack(l);
    chip.mask(l);
    chip.unmask(l);
    chip.disable(l);
    chip.shutdown(l);
    assert_eq!(chip.name(), DummyChip::NAME);
}

#[test]
fn request_without_host_hook_succeeds() {
    let mut host = MockHost::new();
    host.expect_irq_request().return_const(None);
    let chip = DummyChip::new(Arc::new(host));
    assert_eq!(chip.request_resources(line(1)), Ok(()));
}

#[test]
fn request_is_forwarded_to_host() {
    let mut host = MockHost::new();
    host.expect_irq_request()
        .with(eq(line(6)))
        .times(1)
        .return_const(Some(Ok(())));
    let chip = DummyChip::new(Arc::new(host));
    assert_eq!(chip.request_resources(line(6)), Ok(()));
}

#[test]
fn host_refusal_becomes_resource_unavailable() {
    let mut host = MockHost::new();
    host.expect_irq_request()
        .return_const(Some(Err("eventfd limit".to_owned())));
    let chip = DummyChip::new(Arc::new(host));
    assert_eq!(
        chip.request_resources(line(2)),
        Err(IrqError::ResourceUnavailable {
            line: line(2),
            reason: "eventfd limit".to_owned(),
        })
    );
}

#[test]
fn release_is_forwarded_to_host() {
    let mut host = MockHost::new();
    host.expect_irq_release()
        .with(eq(line(9)))
        .times(1)
        .return_const(());
    let chip = DummyChip::new(Arc::new(host));
    chip.release_resources(line(9));
}
