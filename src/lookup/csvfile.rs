//! CSV File Lookup Plugin
//!
//! Looks a key up in the first column of a CSV file and returns another
//! column of the first matching row. Similar to Ansible's `csvfile` lookup.
//!
//! # Usage
//!
//! ```yaml
//! age: "{{ lookup('csvfile', 'alice file=users.csv col=1') }}"
//! city: "{{ lookup('csvfile', 'alice file=users.tsv delimiter=TAB col=2') }}"
//! ```
//!
//! # Term keys
//!
//! Each key may also be given as a lookup option; a key in the term wins.
//!
//! - `file` (string): CSV file to read (required)
//! - `col` (int): Zero-based column to return (default: 1)
//! - `delimiter` (char): Field delimiter, `TAB` or `\t` for tabs (default: `,`)
//! - `default` (string): Value returned when no row matches

use super::terms::TermArgs;
use super::{
    value_to_string, LookupContext, LookupError, LookupOptionInfo, LookupOptions, LookupPlugin,
    LookupResult, PluginDescriptor, Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Default delimiter
const DEFAULT_DELIMITER: char = ',';

/// Default column
const DEFAULT_COLUMN: usize = 1;

/// A parsed csvfile term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLookupSpec {
    /// Value to match in the first column
    pub key: String,
    /// CSV file path, as written in the term
    pub file: String,
    /// Zero-based column to return
    pub column: usize,
    /// Field delimiter
    pub delimiter: char,
    /// Fallback when no row matches
    pub default: Option<String>,
}

impl CsvLookupSpec {
    /// Parse a term, filling gaps from the option bag
    pub fn parse(term: &str, options: &LookupOptions) -> LookupResult<Self> {
        let args = TermArgs::parse(term);

        let key = args
            .positional
            .clone()
            .ok_or_else(|| LookupError::invalid_term(term, "a key to search for is required"))?;

        let file = args
            .get("file")
            .map(str::to_string)
            .or_else(|| options.get_string("file"))
            .ok_or_else(|| LookupError::invalid_term(term, "a file=<path> value is required"))?;

        let column = args
            .get_usize("col")
            .or_else(|| options.get_u64("col").and_then(|c| usize::try_from(c).ok()))
            .unwrap_or(DEFAULT_COLUMN);

        let delimiter = args
            .get("delimiter")
            .map(str::to_string)
            .or_else(|| options.get_string("delimiter"))
            .map(|raw| {
                parse_delimiter(&raw).unwrap_or_else(|| {
                    warn!(term = %term, delimiter = %raw, "Unusable CSV delimiter, using ','");
                    DEFAULT_DELIMITER
                })
            })
            .unwrap_or(DEFAULT_DELIMITER);

        let default = args
            .get("default")
            .map(str::to_string)
            .or_else(|| options.get("default").map(value_to_string));

        Ok(Self {
            key,
            file,
            column,
            delimiter,
            default,
        })
    }
}

/// A single ASCII character, or `TAB` / `\t`
fn parse_delimiter(raw: &str) -> Option<char> {
    match raw {
        "TAB" | "tab" | "\\t" | "\t" => return Some('\t'),
        _ => {}
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Some(c),
        _ => None,
    }
}

/// Return column `column` of the first row whose first field is `key`.
///
/// A matching row that is too short yields `None`, like a missing row.
fn find_in_csv(path: &Path, key: &str, column: usize, delimiter: char) -> Result<Option<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_path(path)?;

    for record in reader.records() {
        let record = record?;
        if record.get(0) == Some(key) {
            return Ok(record.get(column).map(str::to_string));
        }
    }

    Ok(None)
}

/// CSV file lookup plugin
#[derive(Debug, Clone)]
pub struct CsvFileLookup {
    descriptor: PluginDescriptor,
}

impl CsvFileLookup {
    /// Create a new CsvFileLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin(
                "csvfile",
                "Looks values up in the first column of a CSV file",
            ),
        }
    }
}

impl Default for CsvFileLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for CsvFileLookup {
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
        let mut results = Vec::new();

        for term in terms {
            ctx.check_cancelled()?;
            let spec = CsvLookupSpec::parse(term, options)?;
            let path = ctx.resolve_path(&spec.file);

            let found = find_in_csv(&path, &spec.key, spec.column, spec.delimiter)
                .map_err(|e| LookupError::source_unavailable(path.display().to_string(), e))?;

            match found.or_else(|| spec.default.clone()) {
                Some(value) => results.push(Value::String(value)),
                None => {
                    debug!(key = %spec.key, path = %path.display(), column = spec.column, "No CSV value for key");
                }
            }
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["alice file=users.csv col=2", "bob file=users.tsv delimiter=TAB"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![
            LookupOptionInfo::new("file", "CSV file to read", "path").required(),
            LookupOptionInfo::new("col", "Zero-based column to return", "int").with_default("1"),
            LookupOptionInfo::new("delimiter", "Field delimiter", "string").with_default(","),
            LookupOptionInfo::new("default", "Value when no row matches", "string"),
        ]
    }
}
