//! Metrics facade for ledger and transfer activity.
//!
//! Emits through the `metrics` crate; a recorder installed by the host
//! process picks these up. Without a recorder every call is a no-op.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_gauge!("mirrormem_regions", "Registered memory regions");
    describe_gauge!("mirrormem_aliases", "Memoized alias records");
    describe_counter!(
        "mirrormem_device_allocations_total",
        "Lazy device buffer allocations"
    );
    describe_counter!(
        "mirrormem_device_allocated_bytes_total",
        Unit::Bytes,
        "Bytes of device storage allocated"
    );
    describe_counter!(
        "mirrormem_transfers_total",
        "Transfer operations by direction"
    );
    describe_histogram!(
        "mirrormem_transfer_bytes",
        Unit::Bytes,
        "Per-transfer payload size by direction"
    );
}

pub fn record_region_count(count: usize) {
    gauge!("mirrormem_regions").set(count as f64);
}

pub fn record_alias_count(count: usize) {
    gauge!("mirrormem_aliases").set(count as f64);
}

pub fn record_device_allocation(bytes: usize) {
    counter!("mirrormem_device_allocations_total").increment(1);
    counter!("mirrormem_device_allocated_bytes_total").increment(bytes as u64);
}

/// `direction` is one of `"htod"`, `"dtoh"`, or `"dtod"`.
pub fn record_transfer(direction: &'static str, bytes: usize) {
    counter!("mirrormem_transfers_total", "direction" => direction).increment(1);
    histogram!("mirrormem_transfer_bytes", "direction" => direction).record(bytes as f64);
}
