//! First Found Lookup Plugin
//!
//! Returns the first path that exists out of a list of candidates.
//! Similar to Ansible's `first_found` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! vars_file: "{{ lookup('first_found', 'vars/' ~ ansible_os_family ~ '.yml', 'vars/default.yml') }}"
//!
//! # Candidate names searched under several directories
//! template: "{{ lookup('first_found', files=['site.conf', 'default.conf'], paths=['templates', '/etc/app']) }}"
//!
//! # Empty result instead of an error
//! optional: "{{ lookup('first_found', 'local.yml', skip=true) }}"
//! ```
//!
//! # Options
//!
//! - `files` (list): Extra candidates, searched after the terms
//! - `paths` (list): Directories each relative candidate is tried under, in order
//! - `skip` (bool): Return an empty result when nothing exists (default: false)

use super::{
    FromLookupOptions, LookupContext, LookupError, LookupOptionInfo, LookupOptions, LookupPlugin,
    LookupResult, PluginDescriptor, Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Typed options for [`FirstFoundLookup`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirstFoundOptions {
    /// Candidates appended after the terms
    pub files: Vec<String>,
    /// Search directories
    pub paths: Vec<String>,
    /// Empty result instead of [`LookupError::NoMatch`]
    pub skip: bool,
}

impl FromLookupOptions for FirstFoundOptions {
    fn from_options(options: &LookupOptions, _ctx: &LookupContext) -> Self {
        Self {
            files: options.get_string_list("files").unwrap_or_default(),
            paths: options.get_string_list("paths").unwrap_or_default(),
            skip: options.get_bool_or("skip", false),
        }
    }
}

/// Expand one candidate to the concrete paths to probe, in order
fn search_paths(ctx: &LookupContext, candidate: &str, dirs: &[String]) -> Vec<PathBuf> {
    let expanded = ctx.expand_home(candidate);
    if dirs.is_empty() || expanded.is_absolute() {
        return vec![ctx.resolve_path(candidate)];
    }
    dirs.iter()
        .map(|dir| ctx.resolve_path(dir).join(&expanded))
        .collect()
}

/// First found lookup plugin
#[derive(Debug, Clone)]
pub struct FirstFoundLookup {
    descriptor: PluginDescriptor,
}

impl FirstFoundLookup {
    /// Create a new FirstFoundLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin(
                "first_found",
                "Returns the first existing path from a list of candidates",
            ),
        }
    }
}

impl Default for FirstFoundLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for FirstFoundLookup {
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
        let opts = FirstFoundOptions::from_options(options, ctx);
        let candidates: Vec<&String> = terms.iter().chain(opts.files.iter()).collect();

        for candidate in &candidates {
            ctx.check_cancelled()?;
            for path in search_paths(ctx, candidate, &opts.paths) {
                trace!(path = %path.display(), "Probing candidate");
                if path.exists() {
                    debug!(path = %path.display(), "Found first existing candidate");
                    return Ok(vec![Value::String(path.display().to_string())]);
                }
            }
        }

        if opts.skip {
            debug!(candidates = candidates.len(), "No candidate exists, skipping");
            return Ok(Vec::new());
        }

        Err(LookupError::NoMatch(candidates.into_iter().cloned().collect()))
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["vars/RedHat.yml vars/default.yml"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![
            LookupOptionInfo::new("files", "Extra candidate files", "list"),
            LookupOptionInfo::new("paths", "Directories to search candidates in", "list"),
            LookupOptionInfo::new("skip", "Return nothing instead of failing", "bool")
                .with_default("false"),
        ]
    }
}
