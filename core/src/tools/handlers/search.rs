use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::shape::{SearchSummary, format_search};
use crate::tools::context::{ToolError, ToolInvocation, ToolOutput};
use crate::tools::registry::ToolHandler;
use crate::upstream::RegistryClient;

pub struct SearchHandler {
  client: Arc<RegistryClient>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
  query: String,
  size: u32,
}

impl SearchHandler {
  pub fn new(client: Arc<RegistryClient>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl ToolHandler for SearchHandler {
  async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolError> {
    let args: SearchArgs = invocation.parse_arguments()?;
    let query = args.query.trim();

    let raw = self
      .client
      .search(query, args.size, &invocation.abandon)
      .await?;
    let summary = SearchSummary::from_response(&raw);
    drop(raw);

    Ok(ToolOutput::text(format_search(query, &summary)))
  }
}
