//! Password Lookup Plugin
//!
//! Generates random passwords and stores them so later runs get the same
//! value. Similar to Ansible's `password` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! # Generated once, then read back from the file
//! db_password: "{{ lookup('password', 'credentials/db length=32') }}"
//!
//! # Restricted character set
//! pin: "{{ lookup('password', '/dev/null length=6 chars=digits') }}"
//! ```
//!
//! # Term
//!
//! `<path> [length=N] [chars=set[,set...]]`. Without a path, or with
//! `/dev/null`, a fresh password is returned and nothing is stored.
//!
//! # Options
//!
//! `length` and `chars` may also be given as lookup options; term keys win,
//! and the `[password]` config section supplies the defaults.
//!
//! - `length` (int): Number of characters (default: 20)
//! - `chars` (string or list): Comma-separated character set names or literal characters:
//!   - `ascii_letters`: a-zA-Z
//!   - `ascii_lowercase`: a-z
//!   - `ascii_uppercase`: A-Z
//!   - `digits`: 0-9
//!   - `hexdigits`: 0-9a-f
//!   - `punctuation`: special characters
//!   - `alphanumeric`: a-zA-Z0-9
//!
//! Stored files hold the password plus a trailing newline and are readable
//! by the owner only. New files are published atomically without replacing
//! an existing one, so concurrent first-time lookups agree on one value.

use super::terms::TermArgs;
use super::{
    LookupContext, LookupError, LookupOptionInfo, LookupOptions, LookupPlugin, LookupResult,
    PluginDescriptor, Variables,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const ASCII_LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const ASCII_UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const HEXDIGITS: &str = "0123456789abcdef";
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Path that means "do not store"
const NULL_DEVICE: &str = "/dev/null";

/// Expand a single character set name
fn named_charset(name: &str) -> Option<String> {
    match name.trim().to_lowercase().as_str() {
        "ascii_letters" => Some(format!("{}{}", ASCII_LOWERCASE, ASCII_UPPERCASE)),
        "ascii_lowercase" => Some(ASCII_LOWERCASE.to_string()),
        "ascii_uppercase" => Some(ASCII_UPPERCASE.to_string()),
        "digits" => Some(DIGITS.to_string()),
        "hexdigits" => Some(HEXDIGITS.to_string()),
        "punctuation" => Some(PUNCTUATION.to_string()),
        "alphanumeric" => Some(format!("{}{}{}", ASCII_LOWERCASE, ASCII_UPPERCASE, DIGITS)),
        _ => None,
    }
}

/// Build the alphabet from a comma-separated list of set names and literals.
///
/// Duplicates are removed keeping first occurrence, so each character is
/// equally likely.
pub fn build_charset(spec: &str) -> String {
    let mut seen = HashSet::new();
    spec.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| named_charset(part).unwrap_or_else(|| part.to_string()))
        .collect::<String>()
        .chars()
        .filter(|c| seen.insert(*c))
        .collect()
}

/// Generate `length` characters from `charset` using the OS random source.
///
/// Returns `None` when `charset` is empty.
pub fn generate_password(length: usize, charset: &str) -> Option<String> {
    let chars: Vec<char> = charset.chars().collect();
    if chars.is_empty() {
        return None;
    }
    let mut rng = OsRng;
    Some(
        (0..length)
            .map(|_| chars[rng.gen_range(0..chars.len())])
            .collect(),
    )
}

/// A parsed password term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordSpec {
    /// Storage path as written in the term
    pub path: Option<String>,
    /// Number of characters
    pub length: usize,
    /// Alphabet to draw from
    pub charset: String,
}

impl PasswordSpec {
    /// Parse a term, filling gaps from the options and then the config
    pub fn parse(term: &str, options: &LookupOptions, ctx: &LookupContext) -> LookupResult<Self> {
        let args = TermArgs::parse(term);
        let defaults = &ctx.config.password;

        let length = args
            .get_usize("length")
            .or_else(|| options.get_u64("length").and_then(|l| usize::try_from(l).ok()))
            .unwrap_or(defaults.length);
        if length == 0 {
            return Err(LookupError::invalid_term(term, "password length must be greater than 0"));
        }

        let chars = args
            .get("chars")
            .map(str::to_string)
            .or_else(|| match options.get("chars") {
                Some(Value::Array(_)) => options.get_string_list("chars").map(|sets| sets.join(",")),
                _ => options.get_string("chars"),
            })
            .unwrap_or_else(|| defaults.chars.clone());
        let charset = build_charset(&chars);
        if charset.is_empty() {
            return Err(LookupError::invalid_term(term, "character set is empty"));
        }

        Ok(Self {
            path: args.positional,
            length,
            charset,
        })
    }

    /// Generate a fresh password for this spec
    pub fn generate(&self) -> LookupResult<String> {
        generate_password(self.length, &self.charset).ok_or_else(|| {
            LookupError::invalid_term(self.path.as_deref().unwrap_or_default(), "character set is empty")
        })
    }
}

/// Read a stored password; `None` when the file does not exist
fn read_stored(path: &Path) -> LookupResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound || !path.exists() => Ok(None),
        Err(e) => Err(LookupError::source_unavailable(path.display().to_string(), e)),
    }
}

/// Create missing parent directories, owner-only on unix
fn create_parent(dir: &Path) -> LookupResult<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .map_err(|e| LookupError::persistence(dir, e))
}

/// Store `password` at `path` unless another writer got there first.
///
/// Returns the password that ended up on disk.
fn store(path: &Path, password: String) -> LookupResult<String> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    create_parent(&parent)?;

    // Temp files are created 0600.
    let mut temp = NamedTempFile::new_in(&parent).map_err(|e| LookupError::persistence(&parent, e))?;
    writeln!(temp, "{}", password)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| LookupError::persistence(temp.path(), e))?;

    match temp.persist_noclobber(path) {
        Ok(_) => {
            info!(path = %path.display(), "Stored new password");
            Ok(password)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Password stored concurrently, reading it back");
            read_stored(path)?.ok_or_else(|| {
                LookupError::persistence(path, io::Error::from(io::ErrorKind::NotFound))
            })
        }
        Err(e) => Err(LookupError::persistence(path, e.error)),
    }
}

/// Password lookup plugin
#[derive(Debug, Clone)]
pub struct PasswordLookup {
    descriptor: PluginDescriptor,
}

impl PasswordLookup {
    /// Create a new PasswordLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin(
                "password",
                "Generates random passwords and stores them for reuse",
            ),
        }
    }

    fn resolve(&self, ctx: &LookupContext, spec: PasswordSpec) -> LookupResult<String> {
        let path = match spec.path.as_deref() {
            None | Some(NULL_DEVICE) => return spec.generate(),
            Some(raw) => ctx.resolve_path(raw),
        };

        if let Some(existing) = read_stored(&path)? {
            debug!(path = %path.display(), "Using stored password");
            return Ok(existing);
        }

        store(&path, spec.generate()?)
    }
}

impl Default for PasswordLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for PasswordLookup {
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
        let mut results = Vec::with_capacity(terms.len());

        for term in terms {
            ctx.check_cancelled()?;
            let spec = PasswordSpec::parse(term, options, ctx)?;
            results.push(Value::String(self.resolve(ctx, spec)?));
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec![
            "credentials/db length=32",
            "/dev/null length=6 chars=digits",
            "~/.secrets/api chars=ascii_letters,digits,punctuation",
        ]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![
            LookupOptionInfo::new("length", "Password length", "int").with_default("20"),
            LookupOptionInfo::new("chars", "Character sets or literal characters", "list")
                .with_default("ascii_letters,digits,.:-_"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LookupConfig;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn run_one(ctx: &LookupContext, term: &str, options: &LookupOptions) -> LookupResult<String> {
        let values = PasswordLookup::new()
            .run(ctx, &[term.to_string()], &Variables::new(), options)
            .await?;
        Ok(values[0].as_str().unwrap().to_string())
    }

    #[test]
    fn test_build_charset() {
        assert_eq!(build_charset("digits"), DIGITS);
        assert_eq!(build_charset("digits,hexdigits"), HEXDIGITS);
        assert_eq!(build_charset("ascii_lowercase,xyz!"), format!("{}!", ASCII_LOWERCASE));
        assert_eq!(build_charset(".:-_"), ".:-_");
        assert_eq!(build_charset(""), "");
    }

    #[test]
    fn test_generate_password_uses_charset() {
        let password = generate_password(64, "ab").unwrap();
        assert_eq!(password.chars().count(), 64);
        assert!(password.chars().all(|c| c == 'a' || c == 'b'));
    }

    #[test]
    fn test_generate_password_empty_charset() {
        assert_eq!(generate_password(16, ""), None);
        assert_eq!(generate_password(0, "").as_deref(), None);
        assert_eq!(generate_password(0, "ab").as_deref(), Some(""));

        let spec = PasswordSpec {
            path: Some("/dev/null".to_string()),
            length: 8,
            charset: String::new(),
        };
        let err = spec.generate().unwrap_err();
        assert!(matches!(err, LookupError::InvalidTerm { .. }));
    }

    #[test]
    fn test_spec_precedence() {
        let mut config = LookupConfig::default();
        config.password.length = 12;
        let ctx = LookupContext::new().with_config(config);
        let options = LookupOptions::new()
            .with_option("length", 16)
            .with_option("chars", json!(["digits", "ascii_uppercase"]));

        let from_config = PasswordSpec::parse("pw", &LookupOptions::new(), &ctx).unwrap();
        assert_eq!(from_config.length, 12);

        let from_options = PasswordSpec::parse("pw", &options, &ctx).unwrap();
        assert_eq!(from_options.length, 16);
        assert_eq!(from_options.charset, format!("{}{}", DIGITS, ASCII_UPPERCASE));

        let from_term = PasswordSpec::parse("pw length=8 chars=hexdigits", &options, &ctx).unwrap();
        assert_eq!(from_term.path.as_deref(), Some("pw"));
        assert_eq!(from_term.length, 8);
        assert_eq!(from_term.charset, HEXDIGITS);
    }

    #[test]
    fn test_spec_rejects_zero_length() {
        let err = PasswordSpec::parse("pw length=0", &LookupOptions::new(), &LookupContext::new())
            .unwrap_err();
        assert!(matches!(err, LookupError::InvalidTerm { .. }));
    }

    #[tokio::test]
    async fn test_password_length_and_charset() {
        let password = run_one(
            &LookupContext::new(),
            "/dev/null length=40 chars=ascii_lowercase",
            &LookupOptions::new(),
        )
        .await
        .unwrap();
        assert_eq!(password.len(), 40);
        assert!(password.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn test_password_without_path_is_not_stored() {
        let first = run_one(&LookupContext::new(), "length=24", &LookupOptions::new())
            .await
            .unwrap();
        let second = run_one(&LookupContext::new(), "length=24", &LookupOptions::new())
            .await
            .unwrap();
        assert_eq!(first.len(), 24);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_password_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("db");
        let term = format!("{} length=18", path.display());

        let first = run_one(&LookupContext::new(), &term, &LookupOptions::new())
            .await
            .unwrap();
        let second = run_one(&LookupContext::new(), &term, &LookupOptions::new())
            .await
            .unwrap();

        assert_eq!(first.len(), 18);
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{}\n", first));
    }

    #[tokio::test]
    async fn test_password_reads_existing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("api"), "  existing-secret \n").unwrap();
        let ctx = LookupContext::new().with_work_dir(dir.path());

        let password = run_one(&ctx, "api length=64", &LookupOptions::new())
            .await
            .unwrap();
        assert_eq!(password, "existing-secret");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_password_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("private").join("pw");
        run_one(&LookupContext::new(), &path.display().to_string(), &LookupOptions::new())
            .await
            .unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode & 0o077, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_password_concurrent_first_calls_agree() {
        let dir = tempdir().unwrap();
        let term = Arc::new(format!("{} length=30", dir.path().join("shared").display()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let term = Arc::clone(&term);
                tokio::spawn(async move {
                    run_one(&LookupContext::new(), &term, &LookupOptions::new()).await
                })
            })
            .collect();

        let mut passwords = HashSet::new();
        for handle in handles {
            passwords.insert(handle.await.unwrap().unwrap());
        }
        assert_eq!(passwords.len(), 1);
    }

    #[tokio::test]
    async fn test_password_unwritable_directory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();
        let term = format!("{}", blocker.join("pw").display());

        let err = run_one(&LookupContext::new(), &term, &LookupOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::PersistenceFailure { .. }));
    }
}
