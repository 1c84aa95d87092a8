//! Environment Variable Lookup Plugin
//!
//! Reads environment variables. Similar to Ansible's `env` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! # Read a single environment variable
//! home: "{{ lookup('env', 'HOME') }}"
//!
//! # Read multiple environment variables
//! vars: "{{ lookup('env', 'HOME', 'USER', 'SHELL') }}"
//!
//! # With default value
//! value: "{{ lookup('env', 'MY_VAR', default='fallback') }}"
//! ```
//!
//! # Options
//!
//! - `default` (any): Returned, stringified, when a variable is unset or empty
//!
//! This lookup never fails: a missing variable without a default is `""`.

use super::{
    value_to_string, FromLookupOptions, LookupContext, LookupOptionInfo, LookupOptions,
    LookupPlugin, LookupResult, PluginDescriptor, Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use std::env;
use tracing::trace;

/// Typed options for [`EnvLookup`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOptions {
    /// Fallback for unset or empty variables
    pub default: Option<String>,
}

impl FromLookupOptions for EnvOptions {
    fn from_options(options: &LookupOptions, _ctx: &LookupContext) -> Self {
        Self {
            default: options.get("default").map(value_to_string),
        }
    }
}

/// Environment variable lookup plugin
#[derive(Debug, Clone)]
pub struct EnvLookup {
    descriptor: PluginDescriptor,
}

impl EnvLookup {
    /// Create a new EnvLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin("env", "Reads environment variables"),
        }
    }
}

impl Default for EnvLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for EnvLookup {
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
        let opts = EnvOptions::from_options(options, ctx);
        let mut results = Vec::with_capacity(terms.len());

        for term in terms {
            ctx.check_cancelled()?;

            let lookup_name = !term.is_empty() && !term.contains(['=', '\0']);
            let value = match lookup_name.then(|| env::var_os(term)).flatten() {
                Some(value) if !value.is_empty() => value.to_string_lossy().into_owned(),
                _ => {
                    trace!(variable = %term, "Environment variable unset or empty");
                    opts.default.clone().unwrap_or_default()
                }
            };
            results.push(Value::String(value));
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["HOME", "MY_VAR default=fallback"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![LookupOptionInfo::new(
            "default",
            "Value used when the variable is unset or empty",
            "any",
        )]
    }
}
