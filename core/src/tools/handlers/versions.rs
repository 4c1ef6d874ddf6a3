use std::sync::Arc;

use async_trait::async_trait;

use super::PackageArgs;
use crate::shape::{ShapeLimits, VersionListing, format_versions};
use crate::tools::context::{ToolError, ToolInvocation, ToolOutput};
use crate::tools::registry::ToolHandler;
use crate::upstream::RegistryClient;

pub struct VersionsHandler {
  client: Arc<RegistryClient>,
  limits: ShapeLimits,
}

impl VersionsHandler {
  pub fn new(client: Arc<RegistryClient>, limits: ShapeLimits) -> Self {
    Self { client, limits }
  }
}

#[async_trait]
impl ToolHandler for VersionsHandler {
  async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
    let args: PackageArgs = invocation.parse_arguments()?;

    let packument = self
      .client
      .packument(args.name(), &invocation.abandon)
      .await?;
    let listing =
      VersionListing::from_packument(args.name(), &packument, self.limits.max_listed_versions);
    drop(packument);

    Ok(ToolOutput::text(format_versions(&listing)))
  }
}
