pub mod context;
pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod spec;
pub mod validation;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use pkgwatch_config::Config;

use crate::gate::PacedGate;
use crate::housekeeping::InvocationMonitor;
use crate::shape::{PageScrubber, ShapeLimits};
use crate::tools::dispatcher::ToolDispatcher;
use crate::tools::registry::ToolRegistry;
use crate::tools::spec::build_specs;
use crate::updates::{CommandUpdateResolver, UpdateDefaults, UpdateResolver};
use crate::upstream::RegistryClient;

/// Shared collaborators the built-in handlers are constructed from.
#[derive(Clone)]
pub struct ToolServices {
  pub client: Arc<RegistryClient>,
  pub scrubber: Arc<PageScrubber>,
  pub resolver: Arc<dyn UpdateResolver>,
  pub update_defaults: UpdateDefaults,
  pub limits: ShapeLimits,
}

impl ToolServices {
  /// Production wiring: one gate for all registry traffic and the command
  /// resolver, with relative manifest paths resolved against `cwd`.
  pub fn from_config(config: &Config, cwd: PathBuf) -> anyhow::Result<Self> {
    let gate = PacedGate::per_second(config.registry.requests_per_second).shared();
    let client = RegistryClient::new(&config.registry, &config.timeouts, gate)
      .context("Failed to build registry client")?;
    let scrubber = PageScrubber::new().context("Failed to compile page scrubbing patterns")?;

    Ok(Self {
      client: Arc::new(client),
      scrubber: Arc::new(scrubber),
      resolver: Arc::new(CommandUpdateResolver::new(&config.updates)),
      update_defaults: UpdateDefaults::new(&config.updates, cwd),
      limits: ShapeLimits::from(&config.shaping),
    })
  }

  pub fn with_resolver(mut self, resolver: Arc<dyn UpdateResolver>) -> Self {
    self.resolver = resolver;
    self
  }
}

/// Build the frozen tool table and the dispatcher in front of it.
pub fn build_dispatcher(config: &Config, services: &ToolServices) -> anyhow::Result<ToolDispatcher> {
  for warning in config.timeout_warnings() {
    warn!("{warning}");
  }

  let mut registry = ToolRegistry::new();
  handlers::register_builtin_handlers(&mut registry, build_specs(config), services)
    .context("Failed to register tools")?;
  info!(tools = registry.len(), "tool registry ready");

  Ok(ToolDispatcher::new(
    Arc::new(registry),
    InvocationMonitor::new(&config.housekeeping),
  ))
}
