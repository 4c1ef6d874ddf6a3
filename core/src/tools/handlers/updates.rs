use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::tools::context::{ToolError, ToolInvocation, ToolOutput};
use crate::tools::registry::ToolHandler;
use crate::updates::{
  UpdateDefaults, UpdateMode, UpdateOptions, UpdateOverrides, UpdateResolver, format_updates,
};

/// Serves both `check_updates` and `upgrade_packages`; `mode` tells them apart.
pub struct UpdateHandler {
  resolver: Arc<dyn UpdateResolver>,
  defaults: UpdateDefaults,
  mode: UpdateMode,
}

impl UpdateHandler {
  pub fn new(resolver: Arc<dyn UpdateResolver>, defaults: UpdateDefaults, mode: UpdateMode) -> Self {
    Self {
      resolver,
      defaults,
      mode,
    }
  }
}

#[async_trait]
impl ToolHandler for UpdateHandler {
  async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
    let overrides: UpdateOverrides = invocation.parse_arguments()?;
    let options = UpdateOptions::merge(overrides, &self.defaults);

    let exists = tokio::fs::try_exists(&options.manifest).await.unwrap_or(false);
    if !exists {
      warn!(manifest = %options.manifest.display(), "package file not found");
      return Err(ToolError::failure(format!(
        "package file not found: {}",
        options.manifest.display()
      )));
    }

    let upgrades = self.resolver.resolve(&options, self.mode).await?;
    Ok(ToolOutput::text(format_updates(&options, self.mode, &upgrades)))
  }
}
