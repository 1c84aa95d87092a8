//! Lookup plugin integration tests
//!
//! Exercises every built-in lookup through the registry, the way the engine
//! calls them:
//! - file, lines, fileglob, first_found against temporary directories
//! - env with and without defaults
//! - pipe through the shell and through an injected runner
//! - url against a mock HTTP server
//! - password persistence and concurrency
//! - sequence and csvfile term grammar
//! - cancellation and error reporting

use pretty_assertions::assert_eq;
use rustible_lookup::lookup::{CommandOutput, CommandRunner, PipeLookup};
use rustible_lookup::prelude::*;
use serial_test::serial;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry() -> LookupRegistry {
    LookupRegistry::with_builtins()
}

async fn lookup(name: &str, terms: &[&str]) -> LookupResult<Vec<Value>> {
    registry().lookup(name, terms, &LookupContext::new()).await
}

async fn lookup_in(ctx: &LookupContext, name: &str, request: LookupRequest) -> LookupResult<Vec<Value>> {
    registry().run(name, ctx, &request).await
}

/// A directory with `a.txt`, `b.txt`, `c.txt` and a `sub/` directory
fn fixture_dir() -> TempDir {
    let dir = tempdir().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(dir.path().join(name), format!("content of {}\n", name)).unwrap();
    }
    fs::create_dir(dir.path().join("sub")).unwrap();
    dir
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// file / lines / fileglob / first_found
// ============================================================================

#[tokio::test]
async fn test_file_lookup_one_value_per_term() {
    let dir = fixture_dir();
    let ctx = LookupContext::new().with_work_dir(dir.path());

    let values = lookup_in(&ctx, "file", LookupRequest::new(["b.txt", "a.txt"]).with_option("rstrip", true))
        .await
        .unwrap();
    assert_eq!(values, vec![json!("content of b.txt"), json!("content of a.txt")]);
}

#[tokio::test]
async fn test_file_lookup_error_aborts_whole_call() {
    let dir = fixture_dir();
    let ctx = LookupContext::new().with_work_dir(dir.path());

    let err = lookup_in(&ctx, "file", LookupRequest::new(["a.txt", "missing.txt"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::SourceUnavailable);
    assert!(err.to_string().contains("missing.txt"));
}

#[tokio::test]
async fn test_lines_lookup_expands_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("hosts"), "web1\nweb2\n\ndb1\n").unwrap();
    let ctx = LookupContext::new().with_work_dir(dir.path());

    let values = lookup_in(&ctx, "lines", LookupRequest::new(["hosts"])).await.unwrap();
    assert_eq!(values, vec![json!("web1"), json!("web2"), json!(""), json!("db1")]);
}

#[tokio::test]
async fn test_fileglob_three_matches() {
    let dir = fixture_dir();
    let pattern = path_str(&dir.path().join("*.txt"));

    let values = lookup("fileglob", &[pattern.as_str()]).await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(
        values,
        ["a.txt", "b.txt", "c.txt"]
            .iter()
            .map(|name| json!(path_str(&dir.path().join(name))))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_fileglob_zero_matches_is_empty() {
    let dir = fixture_dir();
    let pattern = path_str(&dir.path().join("*.nothing"));
    assert_eq!(lookup("fileglob", &[pattern.as_str()]).await.unwrap(), Vec::<Value>::new());
}

#[tokio::test]
async fn test_fileglob_bad_pattern_names_pattern() {
    let err = lookup("fileglob", &["/tmp/***"]).await.unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::InvalidTerm);
    assert!(err.to_string().contains("/tmp/***"));
}

#[tokio::test]
async fn test_first_found_only_third_exists() {
    let dir = fixture_dir();
    let third = path_str(&dir.path().join("c.txt"));

    let values = lookup("first_found", &["/missing/a", "/missing/b", third.as_str()])
        .await
        .unwrap();
    assert_eq!(values, vec![json!(third)]);
}

#[tokio::test]
async fn test_first_found_skip_and_failure() {
    let request = LookupRequest::new(["/missing/a", "/missing/b"]);

    let skipped = lookup_in(
        &LookupContext::new(),
        "first_found",
        request.clone().with_option("skip", true),
    )
    .await
    .unwrap();
    assert!(skipped.is_empty());

    let err = lookup_in(&LookupContext::new(), "first_found", request)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::NoMatch);
    assert!(err.to_string().contains("/missing/a"));
}

// ============================================================================
// env
// ============================================================================

#[tokio::test]
#[serial]
async fn test_env_lookup_unset_and_default() {
    std::env::remove_var("RUSTIBLE_LOOKUP_IT_UNSET");

    let plain = lookup("env", &["RUSTIBLE_LOOKUP_IT_UNSET"]).await.unwrap();
    assert_eq!(plain, vec![json!("")]);

    let defaulted = lookup_in(
        &LookupContext::new(),
        "env",
        LookupRequest::new(["RUSTIBLE_LOOKUP_IT_UNSET"]).with_option("default", true),
    )
    .await
    .unwrap();
    assert_eq!(defaulted, vec![json!("true")]);
}

#[tokio::test]
#[serial]
async fn test_env_lookup_set() {
    std::env::set_var("RUSTIBLE_LOOKUP_IT_SET", "deploy");
    let values = lookup("env", &["RUSTIBLE_LOOKUP_IT_SET"]).await.unwrap();
    std::env::remove_var("RUSTIBLE_LOOKUP_IT_SET");

    assert_eq!(values, vec![json!("deploy")]);
}

// ============================================================================
// pipe
// ============================================================================

/// Answers every command with its own upper-cased text
#[derive(Debug)]
struct EchoRunner;

#[async_trait]
impl CommandRunner for EchoRunner {
    async fn run(
        &self,
        command: &str,
        _cwd: Option<&Path>,
        _cancel: &CancellationToken,
    ) -> LookupResult<CommandOutput> {
        Ok(CommandOutput {
            exit_code: 0,
            stdout: format!("{}\n", command.to_uppercase()),
            stderr: String::new(),
        })
    }
}

#[tokio::test]
async fn test_pipe_lookup_with_injected_runner() {
    let registry = registry();
    registry.register("pipe", || {
        Box::new(PipeLookup::new().with_runner(Arc::new(EchoRunner))) as Box<dyn LookupPlugin>
    });

    let values = registry
        .lookup("pipe", &["hostname", "whoami"], &LookupContext::new())
        .await
        .unwrap();
    assert_eq!(values, vec![json!("HOSTNAME"), json!("WHOAMI")]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_pipe_lookup_shell_failure_names_command() {
    let err = lookup("pipe", &["echo oops >&2; exit 7"]).await.unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::SourceUnavailable);
    let message = err.to_string();
    assert!(message.contains("exit 7"));
    assert!(message.contains("oops"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_pipe_lookup_cancelled_before_start() {
    let ctx = LookupContext::new();
    ctx.cancellation.cancel();

    let err = registry().lookup("pipe", &["echo never"], &ctx).await.unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::Cancelled);
}

// ============================================================================
// url
// ============================================================================

#[tokio::test]
async fn test_url_lookup_one_client_many_terms() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alpha"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string("beta"))
        .expect(1)
        .mount(&server)
        .await;

    let a = format!("{}/a", server.uri());
    let b = format!("{}/b", server.uri());
    let values = lookup("url", &[a.as_str(), b.as_str()]).await.unwrap();
    assert_eq!(values, vec![json!("alpha"), json!("beta")]);
}

#[tokio::test]
async fn test_url_lookup_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = lookup("url", &[format!("{}/boom", server.uri()).as_str()]).await.unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::SourceUnavailable);
}

#[tokio::test]
async fn test_url_lookup_rejects_bad_timeout_option() {
    let err = lookup_in(
        &LookupContext::new(),
        "url",
        LookupRequest::new(["http://localhost/"]).with_option("timeout", "later"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LookupError::InvalidOption { .. }));
}

// ============================================================================
// password
// ============================================================================

#[tokio::test]
async fn test_password_idempotent_through_registry() {
    let dir = tempdir().unwrap();
    let ctx = LookupContext::new().with_work_dir(dir.path());
    let request = LookupRequest::new(["secrets/app length=25 chars=digits"]);

    let first = lookup_in(&ctx, "password", request.clone()).await.unwrap();
    let second = lookup_in(&ctx, "password", request).await.unwrap();

    assert_eq!(first, second);
    let password = first[0].as_str().unwrap();
    assert_eq!(password.len(), 25);
    assert!(password.chars().all(|c| c.is_ascii_digit()));
    assert!(dir.path().join("secrets").join("app").is_file());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_password_concurrent_first_calls_agree() {
    let dir = tempdir().unwrap();
    let term = path_str(&dir.path().join("race").join("pw"));
    let registry = Arc::new(registry());

    let mut handles = Vec::new();
    for _ in 0..32 {
        let registry = Arc::clone(&registry);
        let term = term.clone();
        handles.push(tokio::spawn(async move {
            registry
                .lookup("password", &[term.as_str()], &LookupContext::new())
                .await
                .unwrap()
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        seen.insert(handle.await.unwrap()[0].as_str().unwrap().to_string());
    }
    assert_eq!(seen.len(), 1);
}

#[tokio::test]
async fn test_password_length_from_config() {
    let mut config = LookupConfig::default();
    config.password.length = 9;
    let ctx = LookupContext::new().with_config(config);

    let values = lookup_in(&ctx, "password", LookupRequest::new(["/dev/null"]))
        .await
        .unwrap();
    assert_eq!(values[0].as_str().unwrap().len(), 9);
}

// ============================================================================
// sequence / csvfile
// ============================================================================

#[tokio::test]
async fn test_sequence_documented_forms() {
    assert_eq!(
        lookup("sequence", &["start=1 end=5 stride=2"]).await.unwrap(),
        vec![json!(1), json!(3), json!(5)]
    );
    assert_eq!(
        lookup("sequence", &["1-3"]).await.unwrap(),
        vec![json!(1), json!(2), json!(3)]
    );
    assert_eq!(
        lookup("sequence", &["1-2", "count=2 start=8 format=n%d"]).await.unwrap(),
        vec![json!(1), json!(2), json!("n8"), json!("n9")]
    );
}

#[tokio::test]
async fn test_sequence_zero_stride_is_rejected_quickly() {
    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        lookup("sequence", &["start=1 end=10 stride=0"]),
    )
    .await
    .expect("zero stride must not hang");

    assert_eq!(result.unwrap_err().kind(), LookupErrorKind::InvalidTerm);
}

#[tokio::test]
async fn test_csvfile_documented_forms() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("people.csv"), "alice,30,NYC\nbob,25,LA\n").unwrap();
    let ctx = LookupContext::new().with_work_dir(dir.path());

    let values = lookup_in(
        &ctx,
        "csvfile",
        LookupRequest::new(["alice file=people.csv col=2", "nobody file=people.csv"]),
    )
    .await
    .unwrap();
    assert_eq!(values, vec![json!("NYC")]);
}

#[tokio::test]
async fn test_csvfile_without_file_is_invalid() {
    let err = lookup("csvfile", &["alice col=2"]).await.unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::InvalidTerm);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_every_builtin_honours_prior_cancellation() {
    let ctx = LookupContext::new();
    ctx.cancellation.cancel();
    let registry = registry();

    for name in rustible_lookup::lookup::BUILTIN_LOOKUPS {
        let err = registry.lookup(name, &["1-3"], &ctx).await.unwrap_err();
        assert_eq!(err.kind(), LookupErrorKind::Cancelled, "{} ignored cancellation", name);
    }
}
