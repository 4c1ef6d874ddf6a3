use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::tools::context::{ToolError, ToolInvocation, ToolOutput};
use crate::tools::spec::ToolSpec;

#[async_trait]
pub trait ToolHandler: Send + Sync {
  async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
  #[error("tool {0} is registered twice")]
  Duplicate(String),
  #[error("no handler serves tool {0}")]
  MissingHandler(String),
}

/// A spec paired with the handler that serves it.
#[derive(Clone)]
pub struct RegisteredTool {
  pub spec: ToolSpec,
  pub handler: Arc<dyn ToolHandler>,
}

/// Operation table, filled once at startup and then shared read-only.
#[derive(Default)]
pub struct ToolRegistry {
  tools: Vec<RegisteredTool>,
  by_name: HashMap<String, usize>,
}

impl ToolRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_tool(
    &mut self,
    spec: ToolSpec,
    handler: Arc<dyn ToolHandler>,
  ) -> Result<(), RegistryError> {
    if self.by_name.contains_key(&spec.name) {
      return Err(RegistryError::Duplicate(spec.name));
    }
    self.by_name.insert(spec.name.clone(), self.tools.len());
    self.tools.push(RegisteredTool { spec, handler });
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
    self.by_name.get(name).map(|index| &self.tools[*index])
  }

  /// Specs in registration order.
  pub fn list_specs(&self) -> impl Iterator<Item = &ToolSpec> {
    self.tools.iter().map(|tool| &tool.spec)
  }

  pub fn len(&self) -> usize {
    self.tools.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tools.is_empty()
  }
}

impl std::fmt::Debug for ToolRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list()
      .entries(self.tools.iter().map(|tool| &tool.spec.name))
      .finish()
  }
}
