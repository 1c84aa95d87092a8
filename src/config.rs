//! Configuration for lookup resolution
//!
//! Loads lookup configuration from the first file found, checked in order:
//! - Explicit path or `RUSTIBLE_LOOKUP_CONFIG`
//! - Project configuration (./lookup.toml)
//! - User configuration (~/.rustible/lookup.toml)
//! - System configuration (/etc/rustible/lookup.toml)
//!
//! Missing files leave the defaults in place. Environment variables are
//! applied last.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main lookup configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// HTTP settings for the url lookup
    pub http: HttpConfig,

    /// Defaults for the password lookup
    pub password: PasswordConfig,

    /// Settings for the pipe lookup
    pub pipe: PipeConfig,

    /// Path resolution settings
    pub paths: PathsConfig,
}

/// HTTP settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Validate TLS certificates unless a lookup says otherwise
    pub validate_certs: bool,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            validate_certs: true,
            user_agent: format!("rustible-lookup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Password generation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Generated password length
    pub length: usize,

    /// Comma-separated character set names or literal characters
    pub chars: String,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            length: 20,
            chars: "ascii_letters,digits,.:-_".to_string(),
        }
    }
}

/// Pipe lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Shell used to run commands
    pub shell: String,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            #[cfg(unix)]
            shell: "/bin/sh".to_string(),
            #[cfg(windows)]
            shell: "cmd.exe".to_string(),
        }
    }
}

/// Path resolution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory used for `~/` expansion; the OS home directory when unset
    pub home: Option<PathBuf>,
}

impl LookupConfig {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = LookupConfig::default();

        // The first existing file wins
        if let Some(path) = Self::get_config_paths(config_path)
            .into_iter()
            .find(|p| p.exists())
        {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check, highest priority first
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        if let Ok(env_config) = std::env::var("RUSTIBLE_LOOKUP_CONFIG") {
            return vec![PathBuf::from(env_config)];
        }

        let mut paths = vec![PathBuf::from("lookup.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rustible/lookup.toml"));
        }

        paths.push(PathBuf::from("/etc/rustible/lookup.toml"));

        paths
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: LookupConfig = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // RUSTIBLE_LOOKUP_HTTP_TIMEOUT
        if let Ok(timeout) = std::env::var("RUSTIBLE_LOOKUP_HTTP_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.http.timeout_secs = t;
            }
        }

        // RUSTIBLE_LOOKUP_VALIDATE_CERTS
        if let Ok(validate) = std::env::var("RUSTIBLE_LOOKUP_VALIDATE_CERTS") {
            match validate.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => self.http.validate_certs = true,
                "false" | "no" | "0" | "off" => self.http.validate_certs = false,
                _ => {}
            }
        }

        // RUSTIBLE_LOOKUP_PASSWORD_LENGTH
        if let Ok(length) = std::env::var("RUSTIBLE_LOOKUP_PASSWORD_LENGTH") {
            if let Ok(l) = length.parse() {
                self.password.length = l;
            }
        }

        // RUSTIBLE_LOOKUP_SHELL
        if let Ok(shell) = std::env::var("RUSTIBLE_LOOKUP_SHELL") {
            self.pipe.shell = shell;
        }

        // RUSTIBLE_LOOKUP_HOME
        if let Ok(home) = std::env::var("RUSTIBLE_LOOKUP_HOME") {
            self.paths.home = Some(PathBuf::from(home));
        }
    }

    /// Directory used for `~/` expansion
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.paths.home.clone().or_else(dirs::home_dir)
    }
}
