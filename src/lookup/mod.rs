//! Lookup Plugin System for Rustible
//!
//! Lookup plugins retrieve data from external sources (files, environment
//! variables, commands, HTTP endpoints, CSV tables, generated sequences and
//! stored passwords) and hand it back to the engine as an ordered list of
//! values.
//!
//! # Architecture
//!
//! The lookup system consists of several key components:
//!
//! 1. **[`LookupPlugin`]** trait: the uniform `run` contract every lookup implements
//! 2. **[`LookupRegistry`]**: name-keyed factory table producing fresh plugin instances
//! 3. **[`LookupContext`]**: configuration, working directory and cancellation
//! 4. **[`LookupOptions`]**: the loosely typed option bag, decoded leniently
//!    into per-plugin option structs through [`FromLookupOptions`]
//! 5. **[`terms`]**: the `key=value` / range sub-grammar shared by the
//!    sequence, csvfile and password lookups
//!
//! # Available Plugins
//!
//! - [`FileLookup`] - Read file contents
//! - [`EnvLookup`] - Read environment variables
//! - [`PipeLookup`] - Run commands and capture their output
//! - [`FileGlobLookup`] - Expand glob patterns
//! - [`FirstFoundLookup`] - Return the first existing path
//! - [`LinesLookup`] - Read files line by line
//! - [`UrlLookup`] - Fetch content over HTTP(S)
//! - [`PasswordLookup`] - Generate and store random passwords
//! - [`SequenceLookup`] - Generate numeric sequences
//! - [`CsvFileLookup`] - Look values up in CSV tables
//!
//! # Example
//!
//! ```rust,ignore
//! use rustible_lookup::lookup::prelude::*;
//!
//! let registry = LookupRegistry::with_builtins();
//! let context = LookupContext::new();
//!
//! let request = LookupRequest::new(["start=1 end=5 stride=2"]);
//! let values = registry.run("sequence", &context, &request).await?;
//! assert_eq!(values, vec![json!(1), json!(3), json!(5)]);
//! ```
//!
//! # Creating Custom Lookups
//!
//! ```rust,ignore
//! use rustible_lookup::lookup::prelude::*;
//!
//! #[derive(Debug)]
//! struct UpperLookup {
//!     descriptor: PluginDescriptor,
//! }
//!
//! #[async_trait]
//! impl LookupPlugin for UpperLookup {
//!     fn descriptor(&self) -> &PluginDescriptor {
//!         &self.descriptor
//!     }
//!
//!     async fn run(
//!         &self,
//!         ctx: &LookupContext,
//!         terms: &[String],
//!         _variables: &Variables,
//!         _options: &LookupOptions,
//!     ) -> LookupResult<Vec<Value>> {
//!         ctx.check_cancelled()?;
//!         Ok(terms.iter().map(|t| json!(t.to_uppercase())).collect())
//!     }
//! }
//!
//! registry.register("upper", || {
//!     Box::new(UpperLookup {
//!         descriptor: PluginDescriptor::new("upper", "Upper-cases terms"),
//!     })
//! });
//! ```

pub mod csvfile;
pub mod env;
pub mod file;
pub mod fileglob;
pub mod first_found;
pub mod lines;
pub mod password;
pub mod pipe;
pub mod registry;
pub mod sequence;
pub mod terms;
pub mod url;

pub use csvfile::CsvFileLookup;
pub use env::EnvLookup;
pub use file::FileLookup;
pub use fileglob::FileGlobLookup;
pub use first_found::FirstFoundLookup;
pub use lines::LinesLookup;
pub use password::PasswordLookup;
pub use pipe::{CommandOutput, CommandRunner, PipeLookup, ShellRunner};
pub use registry::{LookupFactory, LookupRegistry, BUILTIN_LOOKUPS};
pub use sequence::SequenceLookup;
pub use url::UrlLookup;

pub use crate::error::{LookupError, LookupErrorKind, LookupResult};

use crate::config::LookupConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The plugin type every lookup reports.
pub const PLUGIN_TYPE: &str = "lookup";

/// Read-only variables visible to a lookup.
pub type Variables = HashMap<String, Value>;

// ============================================================================
// Lookup Options
// ============================================================================

/// Options that can be passed to lookup plugins
///
/// Getters are lenient: a missing key or a value of the wrong shape yields
/// `None`, never an error, so plugins fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupOptions {
    /// Key-value options passed to the lookup
    pub options: HashMap<String, Value>,
}

impl LookupOptions {
    /// Create new empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Get the raw value of an option
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Get a string option; scalars are stringified
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.options.get(key).and_then(|v| match v {
            Value::Null | Value::Array(_) | Value::Object(_) => None,
            other => Some(value_to_string(other)),
        })
    }

    /// Get a boolean option
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::String(s) => parse_bool(s),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        })
    }

    /// Get a boolean option with default
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Get an integer option
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => terms::parse_int(s),
            _ => None,
        })
    }

    /// Get an unsigned integer option
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get_i64(key).and_then(|n| u64::try_from(n).ok())
    }

    /// Get a list of strings.
    ///
    /// Arrays keep their scalar elements; a plain string is split on `,` and `;`.
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(|v| match v {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter(|item| !matches!(item, Value::Null | Value::Array(_) | Value::Object(_)))
                    .map(value_to_string)
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split([',', ';'])
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        })
    }

    /// Get a string-to-string map.
    ///
    /// Objects keep their scalar values; a plain string is read as
    /// comma-separated `Key:Value` pairs, skipping malformed entries.
    pub fn get_string_map(&self, key: &str) -> Option<Vec<(String, String)>> {
        self.options.get(key).and_then(|v| match v {
            Value::Object(map) => Some(
                map.iter()
                    .filter(|(_, value)| !matches!(value, Value::Null | Value::Array(_) | Value::Object(_)))
                    .map(|(k, value)| (k.clone(), value_to_string(value)))
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .filter_map(|pair| pair.split_once(':'))
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                    .filter(|(k, _)| !k.is_empty())
                    .collect(),
            ),
            _ => None,
        })
    }

    /// Check if option exists
    pub fn has(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Number of options
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Whether no options were given
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl From<HashMap<String, Value>> for LookupOptions {
    fn from(options: HashMap<String, Value>) -> Self {
        Self { options }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for LookupOptions {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Decode the loose option bag into a plugin's typed options.
///
/// Implementations must not fail: unknown keys are ignored and values of the
/// wrong shape leave the field at its default.
pub trait FromLookupOptions: Sized {
    /// Build typed options from the bag and the context defaults
    fn from_options(options: &LookupOptions, ctx: &LookupContext) -> Self;
}

/// Behavior when a lookup encounters an unreadable source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBehavior {
    /// Raise an error (default)
    #[default]
    Strict,
    /// Skip the term silently
    Ignore,
    /// Log a warning and skip the term
    Warn,
}

impl ErrorBehavior {
    /// Parse leniently; anything unrecognised is `Strict`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "ignore" => ErrorBehavior::Ignore,
            "warn" => ErrorBehavior::Warn,
            _ => ErrorBehavior::Strict,
        }
    }
}

impl fmt::Display for ErrorBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorBehavior::Strict => write!(f, "strict"),
            ErrorBehavior::Ignore => write!(f, "ignore"),
            ErrorBehavior::Warn => write!(f, "warn"),
        }
    }
}

/// Stringify a JSON value the way a template would print it
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse the boolean spellings accepted in options and terms
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Lookup Context
// ============================================================================

/// Context for lookup execution
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    /// Working directory relative paths are resolved against
    pub work_dir: Option<PathBuf>,

    /// Lookup configuration
    pub config: Arc<LookupConfig>,

    /// Cancels in-flight lookups when triggered
    pub cancellation: CancellationToken,
}

impl LookupContext {
    /// Create a new context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set working directory
    pub fn with_work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(path.into());
        self
    }

    /// Set configuration
    pub fn with_config(mut self, config: impl Into<Arc<LookupConfig>>) -> Self {
        self.config = config.into();
        self
    }

    /// Use the given cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Whether the caller has cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail with [`LookupError::Cancelled`] if the caller has cancelled
    pub fn check_cancelled(&self) -> LookupResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(LookupError::Cancelled);
        }
        Ok(())
    }

    /// Expand a leading `~` against the configured home directory
    pub fn expand_home(&self, path: &str) -> PathBuf {
        let home = self.config.home_dir();
        let expanded = shellexpand::tilde_with_context(path, || {
            home.as_ref().map(|h| h.to_string_lossy().into_owned())
        });
        PathBuf::from(expanded.as_ref())
    }

    /// Resolve a term to a path: `~` expansion, then relative paths are
    /// joined to the working directory
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = self.expand_home(path);
        self.join_work_dir(&path)
    }

    fn join_work_dir(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.work_dir {
            Some(ref work_dir) => work_dir.join(path),
            None => path.to_path_buf(),
        }
    }
}

// ============================================================================
// Lookup Request
// ============================================================================

/// One lookup invocation: terms, variables and options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Terms, already rendered by the template engine
    pub terms: Vec<String>,

    /// Variables visible to the lookup
    #[serde(default)]
    pub variables: Variables,

    /// Plugin-specific options
    #[serde(default)]
    pub options: LookupOptions,
}

impl LookupRequest {
    /// Create a request for the given terms
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a variable
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Add an option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.options.insert(key.into(), value.into());
        self
    }

    /// Replace all options
    pub fn with_options(mut self, options: LookupOptions) -> Self {
        self.options = options;
        self
    }
}

// ============================================================================
// Plugin Metadata
// ============================================================================

/// Static identity of a lookup plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Canonical lookup name
    pub name: String,
    /// One-line description
    pub description: String,
    /// Plugin version
    pub version: String,
    /// Plugin authors
    pub authors: BTreeSet<String>,
}

impl PluginDescriptor {
    /// Create a descriptor with the crate version and no authors
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            authors: BTreeSet::new(),
        }
    }

    /// Descriptor for a lookup shipped with this crate
    pub fn builtin(name: &str, description: &str) -> Self {
        Self::new(name, description).with_author(env!("CARGO_PKG_AUTHORS"))
    }

    /// Set the version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add an author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.insert(author.into());
        self
    }
}

/// Introspection view of a plugin, as reported to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Lookup name
    pub name: String,
    /// Always `"lookup"`
    #[serde(rename = "type")]
    pub plugin_type: String,
    /// Identity metadata
    pub descriptor: PluginDescriptor,
}

/// Information about a lookup option
#[derive(Debug, Clone)]
pub struct LookupOptionInfo {
    /// Option name
    pub name: &'static str,
    /// Option description
    pub description: &'static str,
    /// Option type
    pub option_type: &'static str,
    /// Default value as string
    pub default: Option<&'static str>,
    /// Whether the option is required
    pub required: bool,
}

impl LookupOptionInfo {
    /// Create a new option info
    pub fn new(name: &'static str, description: &'static str, option_type: &'static str) -> Self {
        Self {
            name,
            description,
            option_type,
            default: None,
            required: false,
        }
    }

    /// Set default value
    pub fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

// ============================================================================
// Lookup Plugin Trait
// ============================================================================

/// Trait that all lookup plugins must implement
///
/// Plugins embed a [`PluginDescriptor`]; name, type and introspection are
/// derived from it.
#[async_trait]
pub trait LookupPlugin: Send + Sync + fmt::Debug {
    /// Static identity of this plugin
    fn descriptor(&self) -> &PluginDescriptor;

    /// Returns the name of the lookup plugin
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Returns a description of what the lookup does
    fn description(&self) -> &str {
        &self.descriptor().description
    }

    /// Returns the plugin type
    fn plugin_type(&self) -> &'static str {
        PLUGIN_TYPE
    }

    /// Introspection record for discovery
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name().to_string(),
            plugin_type: self.plugin_type().to_string(),
            descriptor: self.descriptor().clone(),
        }
    }

    /// Execute the lookup
    ///
    /// # Arguments
    ///
    /// * `ctx` - Configuration, working directory and cancellation
    /// * `terms` - The lookup terms, in order
    /// * `variables` - Read-only variables
    /// * `options` - Options passed to the lookup
    ///
    /// # Returns
    ///
    /// One value per term, or a flattened expansion for list-returning lookups.
    async fn run(
        &self,
        ctx: &LookupContext,
        terms: &[String],
        variables: &Variables,
        options: &LookupOptions,
    ) -> LookupResult<Vec<Value>>;

    /// Validate options before execution
    fn validate_options(&self, _options: &LookupOptions) -> LookupResult<()> {
        Ok(())
    }

    /// Returns example usage for documentation
    fn examples(&self) -> Vec<&'static str> {
        vec![]
    }

    /// Returns a list of available options with descriptions
    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![]
    }
}

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for lookup development and usage.
pub mod prelude {
    pub use super::{
        ErrorBehavior, FromLookupOptions, LookupContext, LookupError, LookupErrorKind,
        LookupOptionInfo, LookupOptions, LookupPlugin, LookupRegistry, LookupRequest,
        LookupResult, PluginDescriptor, PluginInfo, Variables,
    };
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};
}

// ============================================================================
// Unit Tests
// ============================================================================
