//! Lines Lookup Plugin
//!
//! Reads files and returns one value per line. Lines of all files are
//! concatenated in term order.
//!
//! # Usage
//!
//! ```yaml
//! hosts: "{{ lookup('lines', 'inventory/hosts.txt') }}"
//! users: "{{ lookup('lines', 'users.txt', strip=true) }}"
//! ```
//!
//! # Options
//!
//! - `strip` (bool): Trim surrounding whitespace from each line (default: false)

use super::{
    LookupContext, LookupError, LookupOptionInfo, LookupOptions, LookupPlugin, LookupResult,
    PluginDescriptor, Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use tracing::debug;

/// Lines lookup plugin
#[derive(Debug, Clone)]
pub struct LinesLookup {
    descriptor: PluginDescriptor,
}

impl LinesLookup {
    /// Create a new LinesLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin("lines", "Reads files line by line"),
        }
    }
}

impl Default for LinesLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for LinesLookup {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn run(
        &self,
        ctx: &LookupContext,
        terms: &[String],
        _variables: &Variables,
        options: &LookupOptions,
    ) -> LookupResult<Vec<Value>> {
        let strip = options.get_bool_or("strip", false);
        let mut results = Vec::new();

        for term in terms {
            ctx.check_cancelled()?;
            let path = ctx.resolve_path(term);
            let content = fs::read_to_string(&path)
                .map_err(|e| LookupError::source_unavailable(path.display().to_string(), e))?;

            let before = results.len();
            results.extend(content.lines().map(|line| {
                let line = if strip { line.trim() } else { line };
                Value::String(line.to_string())
            }));
            debug!(path = %path.display(), lines = results.len() - before, "Read lines");
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["inventory/hosts.txt"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![LookupOptionInfo::new("strip", "Trim whitespace from each line", "bool").with_default("false")]
    }
}
