//! mirrormem
//!
//! A dual-residency memory ledger: host allocations register once, device
//! mirrors appear lazily, and every pointer handed to a kernel or a host
//! loop resolves through the ledger to whichever copy is current.
//!
//! # Model
//!
//! - **Regions**: registered host spans, keyed by base address
//! - **Aliases**: interior pointers, resolved by containment and memoized
//! - **Residency**: one validity flag per region (host or device copy holds
//!   the freshest bytes), flipped only by pointer translation
//! - **Transfers**: explicit push/pull synchronization that never flips
//!   residency
//!
//! # Pass-Through
//!
//! Managers outside managed mode, or before the device path has ever been
//! enabled, return every pointer unchanged. Code written against this crate
//! behaves identically on device-less builds.

pub mod config;
pub mod device;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod telemetry;

use std::sync::Arc;

pub use config::{EffectiveConfig, EnvConfig};
pub use device::{CopyStream, DeviceBackend, DeviceError, DevicePtr, MockDeviceBackend};
pub use error::{fatal, ResidencyError};
pub use ledger::{HostAddr, Ledger, Region, Residency};
pub use manager::{ExecutionState, ManagerConfig, ManagerStats, MemoryManager, Resolved, Target};

/// Build a manager from process environment.
///
/// `MIRRORMEM_*` variables select the mode flags and the mock backend
/// capacity; see [`config`] for the full table. Feature-gated hardware
/// backends are constructed explicitly instead.
pub fn manager_from_env() -> MemoryManager {
    let cfg = config::load();
    let backend = Arc::new(MockDeviceBackend::new(cfg.mock));
    MemoryManager::new(backend, cfg.manager)
}
