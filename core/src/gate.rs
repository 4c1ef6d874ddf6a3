//! FIFO pacing gate for outbound registry traffic.
//!
//! Every network call acquires the gate first. Callers are released strictly
//! in the order they called [`PacedGate::acquire`], and two releases are never
//! closer together than the configured spacing. Bursts queue up and drain at
//! the configured rate instead of being rejected.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Mutable state shared by every caller of one gate.
#[derive(Debug, Default)]
struct GateState {
  last_dispatch: Option<Instant>,
}

/// Admission gate that spaces dispatches to a shared upstream.
///
/// `tokio::sync::Mutex` queues lockers fairly, which gives the FIFO order. The
/// lock is held while a waiter sleeps until its slot, so the next waiter only
/// computes its slot after the previous dispatch is stamped.
#[derive(Debug)]
pub struct PacedGate {
  spacing: Duration,
  state: Mutex<GateState>,
  queued: AtomicUsize,
  released: AtomicU64,
}

/// Proof that the caller's slot came up.
#[derive(Debug, Clone, Copy)]
pub struct GateTicket {
  /// Position of this release since the gate was created, starting at 1.
  pub sequence: u64,
  /// When the slot was granted.
  pub granted_at: Instant,
  /// Time spent between calling `acquire` and the release.
  pub waited: Duration,
}

/// The waiter gave up before its slot came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request abandoned while queued for the registry")]
pub struct Abandoned;

impl PacedGate {
  pub fn new(spacing: Duration) -> Self {
    Self {
      spacing,
      state: Mutex::new(GateState::default()),
      queued: AtomicUsize::new(0),
      released: AtomicU64::new(0),
    }
  }

  /// Gate allowing `requests_per_second` dispatches per second.
  pub fn per_second(requests_per_second: f64) -> Self {
    Self::new(Duration::from_secs_f64(1.0 / requests_per_second))
  }

  pub fn shared(self) -> Arc<Self> {
    Arc::new(self)
  }

  pub fn spacing(&self) -> Duration {
    self.spacing
  }

  /// Callers currently waiting for a slot.
  pub fn queued(&self) -> usize {
    self.queued.load(Ordering::Relaxed)
  }

  /// Slots granted since the gate was created.
  pub fn released(&self) -> u64 {
    self.released.load(Ordering::Relaxed)
  }

  /// Wait for this caller's turn. Never fails and never drops a waiter.
  pub async fn acquire(&self) -> GateTicket {
    let enqueued_at = Instant::now();
    let _waiting = QueuedGuard::enter(&self.queued);

    let mut state = self.state.lock().await;
    if let Some(last) = state.last_dispatch {
      tokio::time::sleep_until(last + self.spacing).await;
    }

    let granted_at = Instant::now();
    state.last_dispatch = Some(granted_at);
    let sequence = self.released.fetch_add(1, Ordering::Relaxed) + 1;

    let ticket = GateTicket {
      sequence,
      granted_at,
      waited: granted_at.duration_since(enqueued_at),
    };
    debug!(
      sequence = ticket.sequence,
      waited_ms = ticket.waited.as_millis() as u64,
      "registry gate released"
    );
    ticket
  }

  /// Like [`acquire`](Self::acquire), but leaves the queue without taking a
  /// slot once `abandon` is cancelled.
  ///
  /// A waiter dropped mid-sleep never stamps `last_dispatch`, so the next
  /// waiter inherits its slot.
  pub async fn acquire_unless(&self, abandon: &CancellationToken) -> Result<GateTicket, Abandoned> {
    tokio::select! {
      biased;
      _ = abandon.cancelled() => Err(Abandoned),
      ticket = self.acquire() => Ok(ticket),
    }
  }
}

struct QueuedGuard<'a>(&'a AtomicUsize);

impl<'a> QueuedGuard<'a> {
  fn enter(counter: &'a AtomicUsize) -> Self {
    counter.fetch_add(1, Ordering::Relaxed);
    Self(counter)
  }
}

impl Drop for QueuedGuard<'_> {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::Relaxed);
  }
}
