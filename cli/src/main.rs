// Pkgwatch CLI - Command Line Interface Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pkgwatch_absolute_path::resolve_from_cwd;
use pkgwatch_config::{Config, ConfigLoader, parse_override};
use pkgwatch_core::{ToolServices, build_dispatcher};

/// Pkgwatch - npm registry and dependency-update tools over MCP
#[derive(Parser, Debug)]
#[command(name = "pkgwatch")]
#[command(version, about, long_about = None)]
struct TopCli {
    #[clap(flatten)]
    config_overrides: CliConfigOverrides,

    #[clap(subcommand)]
    command: Option<Commands>,

    /// Project directory: project config and relative manifest paths resolve against it
    #[arg(short = 'd', long = "dir", global = true)]
    dir: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, clap::Args)]
struct CliConfigOverrides {
    /// Configuration override in key=value format
    #[arg(short = 'c', long = "config", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,
}

/// Available commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the tools over MCP on stdin/stdout (default)
    Serve,

    /// Print the tool catalog with argument schemas as JSON
    Tools,

    /// Configuration management
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
}

/// Configuration commands
#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration as TOML
    Show,

    /// Validate configuration and report timeout warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TopCli::parse();

    let project_dir = resolve_from_cwd(cli.dir.clone().unwrap_or_else(|| PathBuf::from(".")))?;
    let config = load_config(&cli, project_dir.clone())?;

    // stdout carries MCP frames, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, project_dir).await?,
        Commands::Tools => print_tools(&config, project_dir)?,
        Commands::Config { config_command } => handle_config_command(&config, config_command)?,
    }

    Ok(())
}

fn load_config(cli: &TopCli, project_dir: PathBuf) -> Result<Config> {
    let overrides = cli
        .config_overrides
        .overrides
        .iter()
        .map(|raw| parse_override(raw))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid -c override")?;

    ConfigLoader::new()
        .with_project_dir(project_dir)
        .load_with_cli_overrides(overrides)
}

/// Run the MCP server until the client disconnects
async fn serve(config: &Config, project_dir: PathBuf) -> Result<()> {
    info!(
        registry = %config.registry.registry_url,
        requests_per_second = config.registry.requests_per_second,
        project_dir = %project_dir.display(),
        "Pkgwatch starting"
    );

    let services = ToolServices::from_config(config, project_dir)?;
    let dispatcher = build_dispatcher(config, &services)?;
    pkgwatch_mcp_server::run_stdio_server(Arc::new(dispatcher)).await
}

/// Print the advertised tool catalog
fn print_tools(config: &Config, project_dir: PathBuf) -> Result<()> {
    let services = ToolServices::from_config(config, project_dir)?;
    let dispatcher = build_dispatcher(config, &services)?;

    let catalog: Vec<serde_json::Value> = dispatcher
        .specs()
        .map(|spec| {
            serde_json::json!({
                "name": spec.name,
                "description": spec.description,
                "inputSchema": spec.input_schema.to_value(),
                "timeoutMs": spec.timeout.as_millis() as u64,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

/// Handle config commands
fn handle_config_command(config: &Config, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
            print!("{rendered}");
        }
        ConfigCommands::Validate => {
            let warnings = config.timeout_warnings();
            for warning in &warnings {
                warn!("{warning}");
            }
            println!("Configuration is valid ({} warning(s)).", warnings.len());
        }
    }
    Ok(())
}
