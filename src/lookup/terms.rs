//! Term grammar shared by the sequence, csvfile and password lookups.
//!
//! A term is split on whitespace. The first token is the positional value
//! unless it is itself a `key=value` pair; every token holding exactly one
//! `=` is an option; anything else is noise and is ignored. Parsing never
//! fails: callers read fields leniently and keep their defaults when a value
//! is missing or unparsable.
//!
//! ```text
//! "alice file=users.csv col=2"   -> positional "alice", {file, col}
//! "start=1 end=5 stride=2"       -> no positional, {start, end, stride}
//! "4-16/2:host%02d"              -> positional range shorthand
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `[start-]end[/stride][:format]`, numbers in decimal, `0x` hex or `0o` octal
static RANGE_SHORTCUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<start>(?:0[xXoO])?[0-9a-fA-F]+)-)?(?P<end>(?:0[xXoO])?[0-9a-fA-F]+)(?:/(?P<stride>-?(?:0[xXoO])?[0-9a-fA-F]+))?(?::(?P<format>.+))?$",
    )
    .expect("Invalid range shortcut regex")
});

/// A tokenized lookup term
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermArgs {
    /// Leading token when it is not a `key=value` pair
    pub positional: Option<String>,

    /// `key=value` pairs; a repeated key keeps its last value
    pub options: HashMap<String, String>,
}

impl TermArgs {
    /// Tokenize a term
    pub fn parse(term: &str) -> Self {
        let mut args = TermArgs::default();

        for (index, token) in term.split_whitespace().enumerate() {
            match split_pair(token) {
                Some((key, value)) => {
                    args.options.insert(key.to_string(), value.to_string());
                }
                None if index == 0 => args.positional = Some(token.to_string()),
                None => {}
            }
        }

        args
    }

    /// Raw option value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Whether the option was given
    pub fn has(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// Integer option; `None` when missing or unparsable
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(parse_int)
    }

    /// Non-negative integer option; `None` when missing, negative or unparsable
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get_i64(key).and_then(|n| usize::try_from(n).ok())
    }

    /// The positional token read as a range shorthand.
    ///
    /// Only consulted when neither `start=` nor `end=` was given.
    pub fn range(&self) -> Option<RangeShortcut> {
        if self.has("start") || self.has("end") {
            return None;
        }
        self.positional.as_deref().and_then(RangeShortcut::parse)
    }
}

/// Split a token holding exactly one `=` into its key and value
fn split_pair(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    if key.is_empty() || value.contains('=') {
        return None;
    }
    Some((key, value))
}

/// Fields of a `[start-]end[/stride][:format]` shorthand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeShortcut {
    /// Start, when given
    pub start: Option<i64>,
    /// Inclusive end
    pub end: i64,
    /// Stride, when given
    pub stride: Option<i64>,
    /// Format template, when given
    pub format: Option<String>,
}

impl RangeShortcut {
    /// Parse the shorthand; `None` when the token is not one
    pub fn parse(token: &str) -> Option<Self> {
        let caps = RANGE_SHORTCUT.captures(token)?;
        let end = parse_int(caps.name("end")?.as_str())?;

        let start = match caps.name("start") {
            Some(m) => Some(parse_int(m.as_str())?),
            None => None,
        };
        let stride = match caps.name("stride") {
            Some(m) => Some(parse_int(m.as_str())?),
            None => None,
        };

        Some(Self {
            start,
            end,
            stride,
            format: caps.name("format").map(|m| m.as_str().to_string()),
        })
    }
}

/// Parse an integer in decimal, `0x` hexadecimal or `0o` octal form
pub fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
    {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok()?
    };

    Some(if negative { -magnitude } else { magnitude })
}
