//! Lookup registry integration tests
//!
//! Covers:
//! - Built-in registration, existence and enumeration
//! - Fresh instances per `get`
//! - Registering third-party plugins, replacement and strict registration
//! - Concurrent registration and lookups
//! - Plugin metadata and introspection

use pretty_assertions::assert_eq;
use rustible_lookup::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Test Plugins
// ============================================================================

/// Reverses each term
#[derive(Debug)]
struct ReverseLookup {
    descriptor: PluginDescriptor,
}

impl Default for ReverseLookup {
    fn default() -> Self {
        Self {
            descriptor: PluginDescriptor::new("reverse", "Reverses terms")
                .with_version("0.3.0")
                .with_author("platform team"),
        }
    }
}

#[async_trait]
impl LookupPlugin for ReverseLookup {
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
            results.push(json!(term.chars().rev().collect::<String>()));
        }
        Ok(results)
    }
}

/// Reads a variable named by each term
#[derive(Debug)]
struct VarLookup {
    descriptor: PluginDescriptor,
}

#[async_trait]
impl LookupPlugin for VarLookup {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    async fn run(
        &self,
        _ctx: &LookupContext,
        terms: &[String],
        variables: &Variables,
        _options: &LookupOptions,
    ) -> LookupResult<Vec<Value>> {
        Ok(terms
            .iter()
            .map(|term| variables.get(term).cloned().unwrap_or(Value::Null))
            .collect())
    }
}

// ============================================================================
// Built-in Registry Tests
// ============================================================================

#[test]
fn test_registry_all_builtins_exist_and_instantiate() {
    let registry = LookupRegistry::with_builtins();

    for name in rustible_lookup::lookup::BUILTIN_LOOKUPS {
        assert!(registry.exists(name), "{} should exist", name);
        let plugin = registry.get(name).unwrap();
        assert_eq!(plugin.name(), name);
        assert_eq!(plugin.plugin_type(), "lookup");
    }
}

#[test]
fn test_registry_list_matches_builtins() {
    let registry = LookupRegistry::default();
    let listed: HashSet<String> = registry.list().into_iter().collect();
    let expected: HashSet<String> = rustible_lookup::lookup::BUILTIN_LOOKUPS
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(listed, expected);
}

#[test]
fn test_registry_unknown_name_not_found() {
    let registry = LookupRegistry::with_builtins();

    for name in ["", "template", "FILE", "file ", "vault"] {
        assert!(!registry.exists(name));
        let err = registry.get(name).unwrap_err();
        assert_eq!(err.kind(), LookupErrorKind::NotFound);
        assert!(err.to_string().contains(name));
    }
}

#[test]
fn test_registry_global_is_shared() {
    assert!(std::ptr::eq(LookupRegistry::global(), LookupRegistry::global()));
    assert!(LookupRegistry::global().exists("sequence"));
}

// ============================================================================
// Custom Plugin Tests
// ============================================================================

#[tokio::test]
async fn test_registry_custom_plugin_runs() {
    let registry = LookupRegistry::with_builtins();
    registry.register_plugin::<ReverseLookup>("reverse");

    let values = registry
        .lookup("reverse", &["abc", "rust"], &LookupContext::new())
        .await
        .unwrap();
    assert_eq!(values, vec![json!("cba"), json!("tsur")]);
}

#[tokio::test]
async fn test_registry_passes_variables() {
    let registry = LookupRegistry::new();
    registry.register("var", || {
        Box::new(VarLookup {
            descriptor: PluginDescriptor::new("var", "Reads variables"),
        }) as Box<dyn LookupPlugin>
    });

    let request = LookupRequest::new(["inventory_hostname", "missing"])
        .with_variable("inventory_hostname", "web1");
    let values = registry
        .run("var", &LookupContext::new(), &request)
        .await
        .unwrap();
    assert_eq!(values, vec![json!("web1"), Value::Null]);
}

#[test]
fn test_registry_last_registration_wins() {
    let registry = LookupRegistry::new();
    let built = Arc::new(AtomicUsize::new(0));

    registry.register_plugin::<ReverseLookup>("custom");
    let counter = Arc::clone(&built);
    registry.register("custom", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(VarLookup {
            descriptor: PluginDescriptor::new("var", "Reads variables"),
        }) as Box<dyn LookupPlugin>
    });

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("custom").unwrap().name(), "var");
    registry.get("custom").unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_registry_try_register_keeps_existing() {
    let registry = LookupRegistry::with_builtins();
    let err = registry
        .try_register("env", || Box::new(ReverseLookup::default()) as Box<dyn LookupPlugin>)
        .unwrap_err();

    assert_eq!(err.kind(), LookupErrorKind::AlreadyRegistered);
    assert_eq!(registry.get("env").unwrap().name(), "env");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registry_concurrent_register_and_lookup() {
    let registry = Arc::new(LookupRegistry::with_builtins());

    let mut handles = Vec::new();
    for i in 0..32 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            if i % 4 == 0 {
                registry.register_plugin::<ReverseLookup>(format!("reverse_{}", i));
                return Vec::new();
            }
            registry
                .lookup("sequence", &["1-3"], &LookupContext::new())
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        let values = handle.await.unwrap();
        assert!(values.is_empty() || values == vec![json!(1), json!(2), json!(3)]);
    }
    assert_eq!(registry.len(), 10 + 8);
}

// ============================================================================
// Metadata Tests
// ============================================================================

#[test]
fn test_plugin_info_serializes_with_type() {
    let registry = LookupRegistry::new();
    registry.register_plugin::<ReverseLookup>("reverse");

    let info = registry.get("reverse").unwrap().info();
    let value = serde_json::to_value(&info).unwrap();

    assert_eq!(value["name"], json!("reverse"));
    assert_eq!(value["type"], json!("lookup"));
    assert_eq!(value["descriptor"]["version"], json!("0.3.0"));
    assert_eq!(value["descriptor"]["authors"], json!(["platform team"]));
}

#[test]
fn test_builtin_descriptors_are_complete() {
    for info in LookupRegistry::with_builtins().describe() {
        assert!(!info.descriptor.description.is_empty(), "{}", info.name);
        assert_eq!(info.descriptor.version, env!("CARGO_PKG_VERSION"));
        assert!(!info.descriptor.authors.is_empty());
    }
}

#[test]
fn test_builtin_option_docs() {
    let registry = LookupRegistry::with_builtins();

    let csv = registry.get("csvfile").unwrap();
    let file_option = csv
        .available_options()
        .into_iter()
        .find(|o| o.name == "file")
        .unwrap();
    assert!(file_option.required);

    let url = registry.get("url").unwrap();
    assert!(url.available_options().iter().any(|o| o.name == "validate_certs"));
    assert!(!url.examples().is_empty());
}
