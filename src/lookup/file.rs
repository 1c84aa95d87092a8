//! File Lookup Plugin
//!
//! Reads file contents from the filesystem. Similar to Ansible's `file` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! # Read a single file
//! content: "{{ lookup('file', '/etc/hostname') }}"
//!
//! # Read multiple files, one value per file
//! contents: "{{ lookup('file', '/etc/hosts', '~/.ssh/id_ed25519.pub') }}"
//!
//! # With options
//! content: "{{ lookup('file', '/path/to/file', rstrip=true, errors='ignore') }}"
//! ```
//!
//! # Options
//!
//! - `rstrip` (bool): Strip trailing newlines and carriage returns (default: false)
//! - `lstrip` (bool): Strip leading whitespace (default: false)
//! - `errors` (string): How to handle unreadable files - `strict` (default), `warn`, `ignore`

use super::{
    ErrorBehavior, FromLookupOptions, LookupContext, LookupError, LookupOptionInfo, LookupOptions,
    LookupPlugin, LookupResult, PluginDescriptor, Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use tracing::{debug, warn};

/// Typed options for [`FileLookup`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileOptions {
    /// Strip trailing `\n` / `\r`
    pub rstrip: bool,
    /// Strip leading whitespace
    pub lstrip: bool,
    /// Unreadable file handling
    pub errors: ErrorBehavior,
}

impl FromLookupOptions for FileOptions {
    fn from_options(options: &LookupOptions, _ctx: &LookupContext) -> Self {
        Self {
            rstrip: options.get_bool_or("rstrip", false),
            lstrip: options.get_bool_or("lstrip", false),
            errors: options
                .get_string("errors")
                .map(|e| ErrorBehavior::parse(&e))
                .unwrap_or_default(),
        }
    }
}

/// File lookup plugin for reading file contents
#[derive(Debug, Clone)]
pub struct FileLookup {
    descriptor: PluginDescriptor,
}

impl FileLookup {
    /// Create a new FileLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin("file", "Reads file contents from the filesystem"),
        }
    }
}

impl Default for FileLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for FileLookup {
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
        let opts = FileOptions::from_options(options, ctx);
        let mut results = Vec::with_capacity(terms.len());

        for term in terms {
            ctx.check_cancelled()?;
            let path = ctx.resolve_path(term);

            let mut content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => match opts.errors {
                    ErrorBehavior::Ignore => {
                        debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                        continue;
                    }
                    ErrorBehavior::Warn => {
                        warn!("Failed to read file '{}': {}", path.display(), e);
                        continue;
                    }
                    ErrorBehavior::Strict => {
                        return Err(LookupError::source_unavailable(
                            path.display().to_string(),
                            e,
                        ));
                    }
                },
            };

            if opts.lstrip {
                content = content.trim_start().to_string();
            }
            if opts.rstrip {
                content = content.trim_end_matches(['\n', '\r']).to_string();
            }

            debug!(path = %path.display(), bytes = content.len(), "Read file");
            results.push(Value::String(content));
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["/etc/hostname", "~/.ssh/id_ed25519.pub"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![
            LookupOptionInfo::new("rstrip", "Strip trailing newlines", "bool").with_default("false"),
            LookupOptionInfo::new("lstrip", "Strip leading whitespace", "bool").with_default("false"),
            LookupOptionInfo::new("errors", "strict, warn or ignore", "string").with_default("strict"),
        ]
    }
}
