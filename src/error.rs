//! Error taxonomy for the residency ledger.
//!
//! Every failure in this crate is a caller programming error, not a
//! transient condition: there are no retries and no recovery paths.
//! Operations still return `Result` so embedders and tests can observe the
//! kind; callers that keep the all-or-nothing contract route errors through
//! [`fatal`], the single process-terminating handler.

use thiserror::Error;

use crate::device::DeviceError;
use crate::ledger::HostAddr;

/// Fatal error kinds raised by ledger and manager operations.
#[derive(Debug, Error)]
pub enum ResidencyError {
    #[error("pointer {0} is already registered")]
    AlreadyRegistered(HostAddr),

    #[error("pointer {0} is not a registered region base")]
    UnknownRegion(HostAddr),

    #[error("alias lookup on registered base {0}")]
    AliasLookupOnBase(HostAddr),

    #[error("zero-length region {0} cannot back a device allocation")]
    ZeroLengthRegion(HostAddr),

    #[error("region {0} has no device buffer where one is assumed")]
    MissingDevicePointer(HostAddr),

    #[error("region {0} has no host backing for a device-to-host copy")]
    MissingHostPointer(HostAddr),

    #[error("alternate backend is active while the device path is enabled")]
    UnsupportedBackend,

    #[error("unknown pointer {addr} under device execution ({op})")]
    UnknownPointer { addr: HostAddr, op: &'static str },

    #[error("zero-byte push for pointer {0}")]
    EmptyPush(HostAddr),

    #[error("device backend: {0}")]
    Backend(#[from] DeviceError),
}

impl ResidencyError {
    /// Stable kind token for log fields and test assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "already_registered",
            Self::UnknownRegion(_) => "unknown_region",
            Self::AliasLookupOnBase(_) => "alias_lookup_on_base",
            Self::ZeroLengthRegion(_) => "zero_length_region",
            Self::MissingDevicePointer(_) => "missing_device_pointer",
            Self::MissingHostPointer(_) => "missing_host_pointer",
            Self::UnsupportedBackend => "unsupported_backend",
            Self::UnknownPointer { .. } => "unknown_pointer",
            Self::EmptyPush(_) => "empty_push",
            Self::Backend(_) => "backend",
        }
    }

    /// True for kinds caused by the ledger's own bookkeeping going
    /// inconsistent rather than by a bad argument at the call site.
    pub fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            Self::ZeroLengthRegion(_)
                | Self::MissingDevicePointer(_)
                | Self::MissingHostPointer(_)
                | Self::Backend(_)
        )
    }
}

/// Terminate the process after logging the error.
///
/// The ledger has no recoverable failures; embedders that do not intercept
/// error kinds themselves funnel every `Err` here.
pub fn fatal(err: ResidencyError) -> ! {
    tracing::error!(kind = err.kind(), error = %err, "fatal residency error");
    std::process::abort();
}
