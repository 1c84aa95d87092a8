//! rustible-lookup - resolve Rustible lookup plugins from the shell
//!
//! Runs a single lookup and prints its values, which makes it handy for
//! checking what a playbook's `lookup(...)` call would return.

mod cli;

use anyhow::{Context, Result};
use cli::{Cli, OutputFormat};
use rustible_lookup::config::LookupConfig;
use rustible_lookup::lookup::{value_to_string, LookupContext, LookupRegistry, LookupRequest};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 {
        eprintln!("rustible-lookup v{} by {}", VERSION, AUTHORS);
    }

    let registry = LookupRegistry::with_builtins();
    if cli.list {
        list_plugins(&registry);
        return Ok(());
    }

    let config = LookupConfig::load(cli.config.as_ref()).unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {:#}", e);
        LookupConfig::default()
    });

    let cancellation = CancellationToken::new();
    let mut ctx = LookupContext::new()
        .with_config(config)
        .with_cancellation(cancellation.clone());
    if let Some(ref dir) = cli.work_dir {
        ctx = ctx.with_work_dir(dir);
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling lookup");
            cancellation.cancel();
        }
    });

    // `required_unless_present = "list"` guarantees a plugin here.
    let plugin = cli.plugin.clone().unwrap_or_default();
    let request = LookupRequest {
        terms: cli.terms.clone(),
        variables: cli.variables()?,
        options: cli.lookup_options()?,
    };

    let values = registry
        .run(&plugin, &ctx, &request)
        .await
        .with_context(|| format!("Lookup '{}' failed", plugin))?;

    print_values(&values, cli.output)?;
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}

fn list_plugins(registry: &LookupRegistry) {
    for info in registry.describe() {
        println!("{:<12} {}", info.name, info.descriptor.description);
    }
}

fn print_values(values: &[Value], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(values)?);
        }
        OutputFormat::Lines => {
            for value in values {
                println!("{}", value_to_string(value));
            }
        }
    }
    Ok(())
}
