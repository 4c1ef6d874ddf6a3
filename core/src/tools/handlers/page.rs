use std::sync::Arc;

use async_trait::async_trait;

use super::PackageArgs;
use crate::shape::{PageScrubber, ShapeLimits};
use crate::tools::context::{ToolError, ToolInvocation, ToolOutput};
use crate::tools::registry::ToolHandler;
use crate::upstream::RegistryClient;

pub struct PageHandler {
  client: Arc<RegistryClient>,
  scrubber: Arc<PageScrubber>,
  limits: ShapeLimits,
}

impl PageHandler {
  pub fn new(client: Arc<RegistryClient>, scrubber: Arc<PageScrubber>, limits: ShapeLimits) -> Self {
    Self {
      client,
      scrubber,
      limits,
    }
  }
}

#[async_trait]
impl ToolHandler for PageHandler {
  async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
    let args: PackageArgs = invocation.parse_arguments()?;

    let html = self
      .client
      .package_page(args.name(), &invocation.abandon)
      .await?;
    let page = self
      .scrubber
      .extract(&html, args.name(), self.limits.max_page_chars);
    drop(html);

    Ok(ToolOutput::text(page.render()))
  }
}
