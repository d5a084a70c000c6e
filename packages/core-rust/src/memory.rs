//! Process memory sampling for size-bounded eviction.
//!
//! The eviction size phase and the `bytes` stats key both need the resident
//! set size of the current process. Sampling goes through [`MemoryGauge`] so
//! tests can exercise the size phase with a fake gauge instead of allocating
//! until the real RSS moves.

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Abstraction over resident-memory sampling for dependency injection.
pub trait MemoryGauge: Send + Sync {
    /// Returns the resident set size of the current process in bytes.
    fn resident_bytes(&self) -> u64;
}

/// Default gauge that samples the current process via `sysinfo`.
///
/// Refreshing process information mutates the underlying [`System`] table,
/// so it lives behind a mutex. Sampling happens only during purge passes and
/// `stats`, never on the per-command hot path.
pub struct ProcessMemory {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessMemory {
    /// Creates a gauge bound to the current process.
    ///
    /// # Panics
    ///
    /// Panics if the current PID cannot be determined (unsupported platform).
    #[must_use]
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().expect("current process id is unavailable");
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGauge for ProcessMemory {
    fn resident_bytes(&self) -> u64 {
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(self.pid).map_or(0, sysinfo::Process::memory)
    }
}
