use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{Instrument, info, info_span, warn};

use pkgwatch_protocol::{ProtocolError, ResponseEnvelope};

use crate::deadline::{DetachedError, with_detached_deadline};
use crate::housekeeping::{InvocationMonitor, Outcome};
use crate::tools::context::{ToolError, ToolInvocation};
use crate::tools::registry::ToolRegistry;
use crate::tools::spec::ToolSpec;
use crate::tools::validation::validate_arguments;

/// Single entry point for tool invocations.
///
/// Unknown names and invalid arguments come back as [`ProtocolError`]; every
/// other outcome, timeouts included, is folded into a [`ResponseEnvelope`].
pub struct ToolDispatcher {
  registry: Arc<ToolRegistry>,
  monitor: InvocationMonitor,
}

impl ToolDispatcher {
  pub fn new(registry: Arc<ToolRegistry>, monitor: InvocationMonitor) -> Self {
    Self { registry, monitor }
  }

  pub async fn dispatch(
    &self,
    name: &str,
    arguments: Option<Value>,
  ) -> Result<ResponseEnvelope, ProtocolError> {
    let tool = self
      .registry
      .get(name)
      .ok_or_else(|| ProtocolError::UnknownOperation {
        name: name.to_string(),
      })?;

    let arguments = validate_arguments(&tool.spec.input_schema, arguments).map_err(|issues| {
      ProtocolError::InvalidArguments {
        operation: name.to_string(),
        issues,
      }
    })?;

    let invocation = ToolInvocation::new(name, arguments);
    let abandon = invocation.abandon.clone();
    let span = info_span!("tool", tool = name, invocation_id = %invocation.id);
    let handler = tool.handler.clone();
    let timeout = tool.spec.timeout;

    async move {
      let started = Instant::now();
      info!("tool invocation started");

      let work = async move { handler.handle(invocation).await }.in_current_span();
      let result = with_detached_deadline(name, timeout, work).await;

      let (envelope, outcome) = match result {
        Ok(Ok(output)) => (ResponseEnvelope::success(output.content), Outcome::Success),
        Ok(Err(err)) => {
          let outcome = if matches!(err, ToolError::UpstreamTimeout(_)) {
            Outcome::Timeout
          } else {
            Outcome::HandlerError
          };
          (ResponseEnvelope::failure(err.to_string()), outcome)
        }
        Err(DetachedError::TimedOut(deadline)) => {
          abandon.cancel();
          (
            ResponseEnvelope::failure(ToolError::UpstreamTimeout(deadline).to_string()),
            Outcome::Timeout,
          )
        }
        Err(panicked @ DetachedError::Panicked { .. }) => {
          warn!(error = %panicked, "tool handler panicked");
          (ResponseEnvelope::failure(panicked.to_string()), Outcome::HandlerError)
        }
      };

      let elapsed = started.elapsed();
      info!(
        elapsed_ms = elapsed.as_millis() as u64,
        outcome = outcome.as_str(),
        "tool invocation finished"
      );
      self.monitor.record(name, elapsed, outcome);
      Ok::<_, ProtocolError>(envelope)
    }
    .instrument(span)
    .await
  }

  /// Specs in catalog order.
  pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
    self.registry.list_specs()
  }

  pub fn monitor(&self) -> &InvocationMonitor {
    &self.monitor
  }
}
