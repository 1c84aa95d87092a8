//! Lookup Plugin Registry
//!
//! A name-keyed table of plugin factories. `get` builds a fresh plugin on
//! every call, so two lookups never share plugin state. The table is
//! read-mostly and guarded by a reader/writer lock, which lets third-party
//! plugins be registered at any time through a shared reference.

use super::{
    CsvFileLookup, EnvLookup, FileGlobLookup, FileLookup, FirstFoundLookup, LinesLookup,
    LookupContext, LookupError, LookupOptions, LookupPlugin, LookupRequest, LookupResult,
    PasswordLookup, PipeLookup, PluginInfo, SequenceLookup, UrlLookup, Variables,
};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Constructor for a lookup plugin
pub type LookupFactory = Arc<dyn Fn() -> Box<dyn LookupPlugin> + Send + Sync>;

/// Names of the lookups every registry starts with
pub const BUILTIN_LOOKUPS: [&str; 10] = [
    "file",
    "env",
    "pipe",
    "fileglob",
    "first_found",
    "lines",
    "url",
    "password",
    "sequence",
    "csvfile",
];

static GLOBAL_REGISTRY: Lazy<LookupRegistry> = Lazy::new(LookupRegistry::with_builtins);

/// Registry for lookup plugins
pub struct LookupRegistry {
    factories: RwLock<HashMap<String, LookupFactory>>,
}

impl LookupRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with all built-in plugins
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_plugin::<FileLookup>("file");
        registry.register_plugin::<EnvLookup>("env");
        registry.register_plugin::<PipeLookup>("pipe");
        registry.register_plugin::<FileGlobLookup>("fileglob");
        registry.register_plugin::<FirstFoundLookup>("first_found");
        registry.register_plugin::<LinesLookup>("lines");
        registry.register_plugin::<UrlLookup>("url");
        registry.register_plugin::<PasswordLookup>("password");
        registry.register_plugin::<SequenceLookup>("sequence");
        registry.register_plugin::<CsvFileLookup>("csvfile");
        registry
    }

    /// Process-wide registry holding the built-ins
    pub fn global() -> &'static LookupRegistry {
        &GLOBAL_REGISTRY
    }

    /// Install a factory under `name`, replacing any previous one
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn LookupPlugin> + Send + Sync + 'static,
    {
        let name = name.into();
        if self
            .factories
            .write()
            .insert(name.clone(), Arc::new(factory))
            .is_some()
        {
            debug!(name = %name, "Replaced lookup plugin factory");
        } else {
            debug!(name = %name, "Registered lookup plugin");
        }
    }

    /// Install a factory only if `name` is free
    pub fn try_register<F>(&self, name: impl Into<String>, factory: F) -> LookupResult<()>
    where
        F: Fn() -> Box<dyn LookupPlugin> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut factories = self.factories.write();
        if factories.contains_key(&name) {
            return Err(LookupError::AlreadyRegistered(name));
        }
        debug!(name = %name, "Registered lookup plugin");
        factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Register a plugin type through its `Default` constructor
    pub fn register_plugin<P>(&self, name: impl Into<String>)
    where
        P: LookupPlugin + Default + 'static,
    {
        self.register(name, || Box::new(P::default()) as Box<dyn LookupPlugin>);
    }

    /// Remove a plugin; returns whether it was registered
    pub fn unregister(&self, name: &str) -> bool {
        self.factories.write().remove(name).is_some()
    }

    /// Build a fresh instance of the named plugin
    pub fn get(&self, name: &str) -> LookupResult<Box<dyn LookupPlugin>> {
        // The lock is released before the factory runs.
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(name.to_string()))?;
        Ok(factory())
    }

    /// Whether a plugin is registered under `name`
    pub fn exists(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// All registered names, in no particular order
    pub fn list(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    /// Introspection records for every registered plugin, sorted by name
    pub fn describe(&self) -> Vec<PluginInfo> {
        let mut names = self.list();
        names.sort();
        names
            .iter()
            .filter_map(|name| self.get(name).ok())
            .map(|plugin| plugin.info())
            .collect()
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Instantiate the named plugin, validate the options and run it
    #[instrument(level = "debug", skip(self, ctx, request), fields(terms = request.terms.len()))]
    pub async fn run(
        &self,
        name: &str,
        ctx: &LookupContext,
        request: &LookupRequest,
    ) -> LookupResult<Vec<Value>> {
        let plugin = self.get(name)?;
        plugin.validate_options(&request.options)?;
        let values = plugin
            .run(ctx, &request.terms, &request.variables, &request.options)
            .await?;
        debug!(values = values.len(), "Lookup completed");
        Ok(values)
    }

    /// Run a lookup with no variables or options
    pub async fn lookup(
        &self,
        name: &str,
        terms: &[&str],
        ctx: &LookupContext,
    ) -> LookupResult<Vec<Value>> {
        self.lookup_with_options(name, terms, &LookupOptions::default(), ctx)
            .await
    }

    /// Run a lookup with options and no variables
    pub async fn lookup_with_options(
        &self,
        name: &str,
        terms: &[&str],
        options: &LookupOptions,
        ctx: &LookupContext,
    ) -> LookupResult<Vec<Value>> {
        let request = LookupRequest {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            variables: Variables::new(),
            options: options.clone(),
        };
        self.run(name, ctx, &request).await
    }
}

impl Default for LookupRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for LookupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.list();
        names.sort();
        f.debug_struct("LookupRegistry")
            .field("plugins", &names)
            .finish()
    }
}
