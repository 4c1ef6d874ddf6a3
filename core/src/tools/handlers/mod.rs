pub mod details;
pub mod page;
pub mod search;
pub mod updates;
pub mod versions;

use std::sync::Arc;

use serde::Deserialize;

use crate::tools::ToolServices;
use crate::tools::registry::{RegistryError, ToolHandler, ToolRegistry};
use crate::tools::spec::{
  CHECK_UPDATES, PACKAGE_DETAILS, PACKAGE_PAGE, PACKAGE_VERSIONS, SEARCH_PACKAGES, ToolSpec,
  UPGRADE_PACKAGES,
};
use crate::updates::UpdateMode;

/// Arguments of the single-package tools.
#[derive(Debug, Deserialize)]
pub(crate) struct PackageArgs {
  pub package: String,
}

impl PackageArgs {
  pub fn name(&self) -> &str {
    self.package.trim()
  }
}

/// Pair every spec with its handler and register both.
pub fn register_builtin_handlers(
  registry: &mut ToolRegistry,
  specs: Vec<ToolSpec>,
  services: &ToolServices,
) -> Result<(), RegistryError> {
  let limits = services.limits;
  for spec in specs {
    let handler: Arc<dyn ToolHandler> = match spec.name.as_str() {
      SEARCH_PACKAGES => Arc::new(search::SearchHandler::new(services.client.clone())),
      PACKAGE_VERSIONS => Arc::new(versions::VersionsHandler::new(services.client.clone(), limits)),
      PACKAGE_DETAILS => Arc::new(details::DetailsHandler::new(services.client.clone(), limits)),
      PACKAGE_PAGE => Arc::new(page::PageHandler::new(
        services.client.clone(),
        services.scrubber.clone(),
        limits,
      )),
      CHECK_UPDATES => Arc::new(updates::UpdateHandler::new(
        services.resolver.clone(),
        services.update_defaults.clone(),
        UpdateMode::Check,
      )),
      UPGRADE_PACKAGES => Arc::new(updates::UpdateHandler::new(
        services.resolver.clone(),
        services.update_defaults.clone(),
        UpdateMode::Upgrade,
      )),
      other => return Err(RegistryError::MissingHandler(other.to_string())),
    };
    registry.register_tool(spec, handler)?;
  }
  Ok(())
}
