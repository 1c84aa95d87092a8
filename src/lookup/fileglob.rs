//! File Glob Lookup Plugin
//!
//! Expands shell-style glob patterns to the regular files they match.
//! Similar to Ansible's `fileglob` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! configs: "{{ lookup('fileglob', '/etc/nginx/conf.d/*.conf') }}"
//! keys: "{{ lookup('fileglob', '~/.ssh/*.pub', 'files/*.txt') }}"
//! ```
//!
//! Matches of all patterns are concatenated in term order; within a pattern
//! they are sorted. Directories are never returned and a pattern matching
//! nothing contributes nothing.

use super::{
    LookupContext, LookupError, LookupOptions, LookupPlugin, LookupResult, PluginDescriptor,
    Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

/// File glob lookup plugin
#[derive(Debug, Clone)]
pub struct FileGlobLookup {
    descriptor: PluginDescriptor,
}

impl FileGlobLookup {
    /// Create a new FileGlobLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin(
                "fileglob",
                "Lists regular files matching glob patterns",
            ),
        }
    }
}

impl Default for FileGlobLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for FileGlobLookup {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn run(
        &self,
        ctx: &LookupContext,
        terms: &[String],
        _variables: &Variables,
        _options: &LookupOptions,
    ) -> LookupResult<Vec<Value>> {
        let mut results = Vec::new();

        for term in terms {
            ctx.check_cancelled()?;
            let pattern = ctx.resolve_path(term);
            let pattern = pattern.to_string_lossy();

            let paths = glob::glob(&pattern)
                .map_err(|e| LookupError::invalid_term(term.as_str(), e.to_string()))?;

            let before = results.len();
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => {
                        results.push(Value::String(path.display().to_string()));
                    }
                    Ok(_) => {}
                    Err(e) => trace!(error = %e, "Skipping unreadable glob entry"),
                }
            }
            debug!(pattern = %pattern, matches = results.len() - before, "Expanded glob");
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["/etc/nginx/conf.d/*.conf", "files/**/*.j2"]
    }
}
