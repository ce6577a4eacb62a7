//! Execution-mode snapshot diagnostics.
//!
//! Best-effort visibility into the mode flags driving residency
//! decisions. No correctness contract: output is a single colorized line
//! on stderr, printed only when the snapshot changes and only under the
//! debug gate.

use serde::Serialize;

use crate::manager::ExecutionState;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// One capture of the seven-query mode surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeSnapshot {
    pub managed: bool,
    pub device_ever_enabled: bool,
    pub device_enabled: bool,
    pub device_disabled: bool,
    pub targeting_host: bool,
    pub targeting_device: bool,
    pub alternate_backend: bool,
}

impl ModeSnapshot {
    pub fn capture(state: &ExecutionState) -> Self {
        Self {
            managed: state.using_managed(),
            device_ever_enabled: state.device_ever_enabled(),
            device_enabled: state.device_enabled(),
            device_disabled: state.device_disabled(),
            targeting_host: state.targeting_host(),
            targeting_device: state.targeting_device(),
            alternate_backend: state.alternate_backend_active(),
        }
    }

    fn flags(&self) -> [(&'static str, bool); 7] {
        [
            ("managed", self.managed),
            ("dev-ever", self.device_ever_enabled),
            ("dev-on", self.device_enabled),
            ("dev-off", self.device_disabled),
            ("host", self.targeting_host),
            ("device", self.targeting_device),
            ("alt", self.alternate_backend),
        ]
    }

    /// Bit-packed form, one bit per query flag.
    pub fn bits(&self) -> u8 {
        self.flags()
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, (_, on))| acc | ((*on as u8) << i))
    }

    /// One-line rendering: green for set flags, red for clear ones.
    pub fn render_ansi(&self) -> String {
        let mut line = String::from("mode:");
        for (name, on) in self.flags() {
            let color = if on { GREEN } else { RED };
            line.push(' ');
            line.push_str(color);
            line.push_str(name);
            line.push_str(RESET);
        }
        line
    }
}

/// Change-gated printer for mode snapshots.
#[derive(Debug, Default)]
pub struct ModeTrace {
    enabled: bool,
    last: Option<ModeSnapshot>,
}

impl ModeTrace {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, last: None }
    }

    /// Gate on the `MIRRORMEM_DEBUG` environment variable.
    pub fn from_env() -> Self {
        Self::new(crate::config::env_flag("MIRRORMEM_DEBUG"))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Observe the current state, printing when the snapshot changed.
    /// Returns whether a line was printed.
    pub fn observe(&mut self, state: &ExecutionState) -> bool {
        if !self.enabled {
            return false;
        }
        let snapshot = ModeSnapshot::capture(state);
        if self.last == Some(snapshot) {
            return false;
        }
        eprintln!("{}", snapshot.render_ansi());
        tracing::trace!(bits = snapshot.bits(), "execution mode changed");
        self.last = Some(snapshot);
        true
    }
}
