//! Telemetry module for the residency ledger.
//!
//! Provides structured logging, a metrics facade, and the colorized
//! execution-mode trace. All output is stderr- or file-based.

mod logging;
pub mod metrics;
pub mod mode;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    init_metrics, record_alias_count, record_device_allocation, record_region_count,
    record_transfer,
};
pub use mode::{ModeSnapshot, ModeTrace};
