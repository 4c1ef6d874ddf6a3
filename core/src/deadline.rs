//! Hard wall-clock deadlines around asynchronous work.
//!
//! Two flavours exist. [`with_deadline`] drops the wrapped future when time
//! runs out, which cancels it; for a reqwest call that aborts the request and
//! releases the connection. [`with_detached_deadline`] runs the work as its own
//! task and abandons that task on expiry: the caller gets the timeout at once
//! and the task keeps running, its eventual result discarded.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// The deadline fired before the wrapped work settled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} timed out after {}ms", .after.as_millis())]
pub struct DeadlineExceeded {
  pub operation: String,
  pub after: Duration,
}

impl DeadlineExceeded {
  pub fn new(operation: impl Into<String>, after: Duration) -> Self {
    Self {
      operation: operation.into(),
      after,
    }
  }
}

/// Outcome of detached work that did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum DetachedError {
  #[error(transparent)]
  TimedOut(#[from] DeadlineExceeded),
  #[error("{operation} panicked: {message}")]
  Panicked { operation: String, message: String },
}

/// Race `work` against `duration`; the loser is dropped.
///
/// Exactly one of the work's own output or [`DeadlineExceeded`] is returned.
pub async fn with_deadline<F>(
  operation: &str,
  duration: Duration,
  work: F,
) -> Result<F::Output, DeadlineExceeded>
where
  F: Future,
{
  let started = Instant::now();
  match tokio::time::timeout(duration, work).await {
    Ok(output) => {
      debug!(
        operation,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "settled before deadline"
      );
      Ok(output)
    }
    Err(_) => {
      warn!(
        operation,
        deadline_ms = duration.as_millis() as u64,
        "deadline fired; in-flight work cancelled"
      );
      Err(DeadlineExceeded::new(operation, duration))
    }
  }
}

/// Run `work` as a detached task and wait at most `duration` for it.
///
/// On expiry the task is left running and whatever it eventually returns is
/// dropped. This bounds the caller's latency, not the task's resource use.
pub async fn with_detached_deadline<F>(
  operation: &str,
  duration: Duration,
  work: F,
) -> Result<F::Output, DetachedError>
where
  F: Future + Send + 'static,
  F::Output: Send + 'static,
{
  let handle = tokio::spawn(work);
  match tokio::time::timeout(duration, handle).await {
    Ok(Ok(output)) => Ok(output),
    Ok(Err(join_error)) => Err(DetachedError::Panicked {
      operation: operation.to_string(),
      message: join_error.to_string(),
    }),
    Err(_) => {
      warn!(
        operation,
        deadline_ms = duration.as_millis() as u64,
        "deadline fired; detached task left to finish in the background"
      );
      Err(DeadlineExceeded::new(operation, duration).into())
    }
  }
}
