//! # Rustible Lookup - Pluggable Lookup Resolution
//!
//! Lookups pull values into a play from outside the inventory: files,
//! environment variables, command output, HTTP endpoints, CSV tables,
//! generated sequences and stored passwords. Each lookup is a plugin behind
//! the [`LookupPlugin`](lookup::LookupPlugin) trait and is resolved by name
//! through a [`LookupRegistry`](lookup::LookupRegistry).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Template engine / rustible-lookup CLI                   │
//! │              (terms already rendered, options decoded)               │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Lookup Registry                              │
//! │            (name -> factory, fresh plugin per lookup)                │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!          ┌─────────────────────────┼─────────────────────────┐
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │  Local sources  │   │   External I/O      │   │     Generators      │
//! │ file, lines,    │   │  pipe, url          │   │ sequence, password  │
//! │ fileglob, env,  │   │  (cancellable)      │   │                     │
//! │ first_found,    │   │                     │   │                     │
//! │ csvfile         │   │                     │   │                     │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rustible_lookup::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = LookupRegistry::with_builtins();
//!     let ctx = LookupContext::new().with_config(LookupConfig::load(None)?);
//!
//!     let hosts = registry.lookup("sequence", &["1-3:web%02d"], &ctx).await?;
//!     println!("{:?}", hosts); // ["web01", "web02", "web03"]
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.
    pub use crate::config::LookupConfig;
    pub use crate::error::{LookupError, LookupErrorKind, LookupResult};
    pub use crate::lookup::prelude::*;
}

/// Configuration loading and environment overrides.
pub mod config;

/// Error types and result aliases for lookup resolution.
///
/// [`LookupError`](error::LookupError) names the failing term, path or plugin
/// and chains the underlying cause.
pub mod error;

/// Lookup plugins, the registry and the term grammar.
pub mod lookup;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
