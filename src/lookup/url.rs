//! URL Lookup Plugin
//!
//! Fetches content from HTTP/HTTPS URLs. Similar to Ansible's `url` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! # Fetch a URL
//! content: "{{ lookup('url', 'https://example.com/api/data') }}"
//!
//! # With headers
//! content: "{{ lookup('url', 'https://api.example.com/endpoint', headers={'Authorization': 'Bearer token'}) }}"
//!
//! # Self-signed endpoint, one value per line
//! hosts: "{{ lookup('url', 'https://10.0.0.5/hosts', validate_certs=false, split_lines=true) }}"
//! ```
//!
//! # Options
//!
//! - `headers` (map or string): Request headers; a string is read as `Key:Value` pairs separated by commas
//! - `validate_certs` (bool): Whether to validate TLS certificates (default: from config, `true`)
//! - `timeout` (int): Request timeout in seconds (default: from config, 30)
//! - `username` (string): Username for basic auth
//! - `password` (string): Password for basic auth
//! - `split_lines` (bool): Return each line as a separate result (default: false)

use super::{
    FromLookupOptions, LookupContext, LookupError, LookupOptionInfo, LookupOptions, LookupPlugin,
    LookupResult, PluginDescriptor, Variables,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Typed options for [`UrlLookup`]
#[derive(Debug, Clone, PartialEq)]
pub struct UrlOptions {
    /// Verify TLS certificates
    pub validate_certs: bool,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// Request timeout
    pub timeout: Duration,
    /// Basic auth user
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// One result per body line
    pub split_lines: bool,
}

impl FromLookupOptions for UrlOptions {
    fn from_options(options: &LookupOptions, ctx: &LookupContext) -> Self {
        let http = &ctx.config.http;
        Self {
            validate_certs: options.get_bool_or("validate_certs", http.validate_certs),
            headers: options.get_string_map("headers").unwrap_or_default(),
            timeout: Duration::from_secs(options.get_u64("timeout").unwrap_or(http.timeout_secs)),
            username: options.get_string("username"),
            password: options.get_string("password"),
            split_lines: options.get_bool_or("split_lines", false),
        }
    }
}

impl UrlOptions {
    fn header_map(&self) -> LookupResult<HeaderMap> {
        let mut map = HeaderMap::new();
        for (key, value) in &self.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                LookupError::invalid_option("headers", format!("bad header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                LookupError::invalid_option("headers", format!("bad value for '{}': {}", key, e))
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

/// Parse and check an http(s) URL
fn parse_url(term: &str) -> LookupResult<url::Url> {
    let parsed = url::Url::parse(term)
        .map_err(|e| LookupError::invalid_term(term, format!("invalid URL: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(LookupError::invalid_term(
            term,
            format!("unsupported URL scheme '{}'", other),
        )),
    }
}

/// URL lookup plugin for fetching HTTP content
#[derive(Debug, Clone)]
pub struct UrlLookup {
    descriptor: PluginDescriptor,
}

impl UrlLookup {
    /// Create a new UrlLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin("url", "Fetches content from HTTP/HTTPS URLs"),
        }
    }

    fn build_client(&self, ctx: &LookupContext, opts: &UrlOptions) -> LookupResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(opts.timeout)
            .danger_accept_invalid_certs(!opts.validate_certs)
            .user_agent(ctx.config.http.user_agent.as_str())
            .default_headers(opts.header_map()?)
            .build()
            .map_err(|e| LookupError::source_unavailable("HTTP client", e))
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        url: url::Url,
        opts: &UrlOptions,
    ) -> LookupResult<String> {
        let source = url.to_string();
        let mut request = client.get(url);
        if let Some(ref username) = opts.username {
            request = request.basic_auth(username, opts.password.as_ref());
        }

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| LookupError::source_unavailable(source.as_str(), e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LookupError::source_unavailable(source.as_str(), e))?;

        debug!(url = %source, status = %status, bytes = body.len(), "Fetched URL");
        Ok(body)
    }
}

impl Default for UrlLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for UrlLookup {
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
        let opts = UrlOptions::from_options(options, ctx);
        let client = self.build_client(ctx, &opts)?;
        let mut results = Vec::with_capacity(terms.len());

        for term in terms {
            ctx.check_cancelled()?;
            let url = parse_url(term)?;

            let body = tokio::select! {
                body = self.fetch(&client, url, &opts) => body?,
                _ = ctx.cancellation.cancelled() => return Err(LookupError::Cancelled),
            };

            if opts.split_lines {
                results.extend(body.lines().map(|line| Value::String(line.to_string())));
            } else {
                results.push(Value::String(body));
            }
        }

        Ok(results)
    }

    fn validate_options(&self, options: &LookupOptions) -> LookupResult<()> {
        if options.has("headers") && options.get_string_map("headers").is_none() {
            return Err(LookupError::invalid_option(
                "headers",
                "expected a map or a 'Key:Value,Key:Value' string",
            ));
        }
        if options.has("timeout") && options.get_u64("timeout").is_none() {
            return Err(LookupError::invalid_option(
                "timeout",
                "expected a non-negative number of seconds",
            ));
        }
        Ok(())
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["https://example.com/api/data", "https://10.0.0.5/hosts validate_certs=false"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![
            LookupOptionInfo::new("headers", "Request headers", "dict"),
            LookupOptionInfo::new("validate_certs", "Validate TLS certificates", "bool").with_default("true"),
            LookupOptionInfo::new("timeout", "Request timeout in seconds", "int").with_default("30"),
            LookupOptionInfo::new("username", "Basic auth username", "string"),
            LookupOptionInfo::new("password", "Basic auth password", "string"),
            LookupOptionInfo::new("split_lines", "One result per line", "bool").with_default("false"),
        ]
    }
}
