//! Command-line interface for rustible-lookup

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use rustible_lookup::lookup::{LookupOptions, Variables};
use serde_json::Value;
use std::path::PathBuf;

/// Resolve Rustible lookups from the command line
///
/// Runs one lookup plugin over the given terms and prints the result.
#[derive(Parser, Debug, Clone)]
#[command(name = "rustible-lookup")]
#[command(author = "Rustible Contributors")]
#[command(version)]
#[command(about = "Resolve Rustible lookup plugins", long_about = None)]
pub struct Cli {
    /// Lookup plugin to run (file, env, pipe, url, sequence, ...)
    #[arg(required_unless_present = "list")]
    pub plugin: Option<String>,

    /// Lookup terms
    pub terms: Vec<String>,

    /// Plugin option (key=value, value parsed as JSON when possible)
    #[arg(short = 'o', long = "option", action = clap::ArgAction::Append)]
    pub options: Vec<String>,

    /// Variable visible to the lookup (key=value)
    #[arg(short = 'e', long = "extra-vars", action = clap::ArgAction::Append)]
    pub extra_vars: Vec<String>,

    /// Directory relative paths are resolved against
    #[arg(short = 'w', long, env = "RUSTIBLE_LOOKUP_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Path to the lookup configuration file
    #[arg(short = 'c', long, env = "RUSTIBLE_LOOKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// List registered lookup plugins and exit
    #[arg(long)]
    pub list: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array
    Json,
    /// One value per line, strings unquoted
    Lines,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Decode `-o key=value` flags
    pub fn lookup_options(&self) -> Result<LookupOptions> {
        self.options
            .iter()
            .map(|raw| parse_pair(raw))
            .collect::<Result<Vec<_>>>()
            .map(|pairs| pairs.into_iter().collect())
    }

    /// Decode `-e key=value` flags
    pub fn variables(&self) -> Result<Variables> {
        self.extra_vars.iter().map(|raw| parse_pair(raw)).collect()
    }
}

/// Split `key=value`, reading the value as JSON when it parses
fn parse_pair(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Expected key=value, got '{}'", raw);
    };
    if key.is_empty() {
        bail!("Empty key in '{}'", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
