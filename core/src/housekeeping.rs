//! Per-invocation bookkeeping: slow-call warnings and a periodic hint to the
//! allocator to hand freed memory back to the OS.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use pkgwatch_config::HousekeepingConfig;

/// How an invocation settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Success,
  HandlerError,
  Timeout,
}

impl Outcome {
  pub fn as_str(self) -> &'static str {
    match self {
      Outcome::Success => "success",
      Outcome::HandlerError => "handler_error",
      Outcome::Timeout => "timeout",
    }
  }
}

#[derive(Debug)]
pub struct InvocationMonitor {
  reclaim_every: u64,
  slow_threshold: Duration,
  completed: AtomicU64,
  reclaims: AtomicU64,
}

impl InvocationMonitor {
  pub fn new(config: &HousekeepingConfig) -> Self {
    Self {
      reclaim_every: config.reclaim_every,
      slow_threshold: Duration::from_millis(config.slow_invocation_ms),
      completed: AtomicU64::new(0),
      reclaims: AtomicU64::new(0),
    }
  }

  /// Record a settled invocation. Never fails and never blocks.
  pub fn record(&self, tool: &str, elapsed: Duration, outcome: Outcome) {
    let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;

    if elapsed >= self.slow_threshold {
      warn!(
        tool,
        elapsed_ms = elapsed.as_millis() as u64,
        outcome = outcome.as_str(),
        "slow tool invocation"
      );
    }

    if self.reclaim_every > 0 && completed.is_multiple_of(self.reclaim_every) {
      self.reclaims.fetch_add(1, Ordering::Relaxed);
      let released = reclaim_memory();
      debug!(completed, released, "memory reclamation hint issued");
    }
  }

  pub fn completed(&self) -> u64 {
    self.completed.load(Ordering::Relaxed)
  }

  /// Reclamation hints issued so far.
  pub fn reclaims(&self) -> u64 {
    self.reclaims.load(Ordering::Relaxed)
  }
}

impl Default for InvocationMonitor {
  fn default() -> Self {
    Self::new(&HousekeepingConfig::default())
  }
}

/// Ask the allocator to return free heap pages. Returns whether anything was
/// released; `false` on platforms without such a call.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn reclaim_memory() -> bool {
  // SAFETY: malloc_trim only walks glibc's own arenas and takes no pointers.
  unsafe { libc::malloc_trim(0) != 0 }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn reclaim_memory() -> bool {
  false
}
