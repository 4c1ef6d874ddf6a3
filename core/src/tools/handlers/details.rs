use std::sync::Arc;

use async_trait::async_trait;

use super::PackageArgs;
use crate::shape::{ShapeLimits, shape_package_detail};
use crate::tools::context::{ToolError, ToolInvocation, ToolOutput};
use crate::tools::registry::ToolHandler;
use crate::upstream::RegistryClient;

pub struct DetailsHandler {
  client: Arc<RegistryClient>,
  limits: ShapeLimits,
}

impl DetailsHandler {
  pub fn new(client: Arc<RegistryClient>, limits: ShapeLimits) -> Self {
    Self { client, limits }
  }
}

#[async_trait]
impl ToolHandler for DetailsHandler {
  async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
    let args: PackageArgs = invocation.parse_arguments()?;

    let packument = self
      .client
      .packument(args.name(), &invocation.abandon)
      .await?;
    let shaped = shape_package_detail(packument, &self.limits);

    let text = serde_json::to_string_pretty(&shaped)
      .map_err(|e| ToolError::failure(format!("failed to render details for {}: {e}", args.name())))?;
    Ok(ToolOutput::text(text))
  }
}
