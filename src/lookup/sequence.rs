//! Sequence Lookup Plugin
//!
//! Generates numeric sequences. Similar to Ansible's `sequence` lookup plugin.
//!
//! # Usage
//!
//! ```yaml
//! # key=value form
//! ports: "{{ lookup('sequence', 'start=8000 end=8010 stride=2') }}"
//!
//! # shorthand form: [start-]end[/stride][:format]
//! hosts: "{{ lookup('sequence', '1-4:web%02d') }}"
//!
//! # count instead of end
//! ids: "{{ lookup('sequence', 'start=10 count=3') }}"
//! ```
//!
//! # Term keys
//!
//! - `start` (int): First value (default: 1)
//! - `end` (int): Last value, inclusive (default: 1)
//! - `count` (int): Number of values; cannot be combined with `end`
//! - `stride` (int): Step, negative to count down (default: 1, never 0)
//! - `format` (string): printf-style template such as `%02d` or `host%x`
//!
//! Without a format the values are integers; with one they are strings.

use super::terms::TermArgs;
use super::{
    LookupContext, LookupError, LookupOptionInfo, LookupOptions, LookupPlugin, LookupResult,
    PluginDescriptor, Variables,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Values generated between two cancellation checks
const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Widest field a format directive may request
const MAX_FORMAT_WIDTH: usize = 1024;

/// Most values one lookup call may produce, across all of its terms
pub const MAX_SEQUENCE_VALUES: u64 = 1_000_000;

/// A parsed sequence term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSpec {
    /// First value
    pub start: i64,
    /// Last value, inclusive
    pub end: i64,
    /// Step between values
    pub stride: i64,
    /// printf-style template
    pub format: Option<String>,
}

impl Default for SequenceSpec {
    fn default() -> Self {
        Self {
            start: 1,
            end: 1,
            stride: 1,
            format: None,
        }
    }
}

impl SequenceSpec {
    /// Parse a term. Unparsable numbers keep their defaults; only specs that
    /// could never terminate or contradict themselves are rejected.
    pub fn parse(term: &str) -> LookupResult<Self> {
        let args = TermArgs::parse(term);
        let mut spec = SequenceSpec::default();

        if let Some(range) = args.range() {
            if let Some(start) = range.start {
                spec.start = start;
            }
            spec.end = range.end;
            if let Some(stride) = range.stride {
                spec.stride = stride;
            }
            spec.format = range.format;
        }

        if let Some(start) = args.get_i64("start") {
            spec.start = start;
        }
        if let Some(end) = args.get_i64("end") {
            spec.end = end;
        }
        if let Some(stride) = args.get_i64("stride") {
            spec.stride = stride;
        }
        if let Some(format) = args.get("format") {
            spec.format = Some(format.to_string());
        }

        if spec.stride == 0 {
            return Err(LookupError::invalid_term(term, "stride must not be zero"));
        }

        if let Some(count) = args.get_i64("count") {
            if args.has("end") {
                return Err(LookupError::invalid_term(
                    term,
                    "can't specify both count and end",
                ));
            }
            if count < 0 {
                return Err(LookupError::invalid_term(term, "count must not be negative"));
            }
            if count == 0 {
                // An end one step before start yields nothing
                return Ok(SequenceSpec {
                    end: spec.start.saturating_sub(spec.stride.signum()),
                    ..spec
                });
            }
            spec.end = (count - 1)
                .checked_mul(spec.stride)
                .and_then(|offset| spec.start.checked_add(offset))
                .ok_or_else(|| LookupError::invalid_term(term, "count overflows the range"))?;
        }

        if spec.stride > 0 && spec.end < spec.start {
            return Err(LookupError::invalid_term(
                term,
                "to count backwards make stride negative",
            ));
        }
        if spec.stride < 0 && spec.end > spec.start {
            return Err(LookupError::invalid_term(
                term,
                "to count forward don't make stride negative",
            ));
        }

        let count = spec.value_count();
        if count > MAX_SEQUENCE_VALUES {
            return Err(LookupError::invalid_term(
                term,
                format!(
                    "sequence has {} values, more than the limit of {}",
                    count, MAX_SEQUENCE_VALUES
                ),
            ));
        }

        Ok(spec)
    }

    /// Number of values the sequence yields
    pub fn value_count(&self) -> u64 {
        let span = i128::from(self.end) - i128::from(self.start);
        let stride = i128::from(self.stride);
        if stride == 0 || (span != 0 && span.signum() != stride.signum()) {
            return 0;
        }
        u64::try_from(span / stride + 1).unwrap_or(u64::MAX)
    }

    /// Iterate the values of the sequence
    pub fn values(&self) -> SequenceIter {
        SequenceIter {
            next: Some(self.start),
            end: self.end,
            stride: self.stride,
        }
    }
}

/// Iterator over a [`SequenceSpec`]
#[derive(Debug, Clone)]
pub struct SequenceIter {
    next: Option<i64>,
    end: i64,
    stride: i64,
}

impl Iterator for SequenceIter {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.next?;
        let in_range = if self.stride > 0 {
            current <= self.end
        } else {
            current >= self.end
        };
        if !in_range {
            self.next = None;
            return None;
        }
        self.next = current.checked_add(self.stride);
        Some(current)
    }
}

/// Render `value` through a printf-style template.
///
/// Supports `%d %i %u %x %X %o %s` with the `-`, `0`, `+`, space and `#`
/// flags and a width; `%%` is a literal percent. Exactly one conversion must
/// be present.
pub fn format_value(template: &str, value: i64) -> Result<String, String> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut chars = template.chars().peekable();
    let mut conversions = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut left = false;
        let mut zero = false;
        let mut plus = false;
        let mut space = false;
        let mut alternate = false;
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left = true,
                '0' => zero = true,
                '+' => plus = true,
                ' ' => space = true,
                '#' => alternate = true,
                _ => break,
            }
            chars.next();
        }

        let mut width = 0usize;
        while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width.saturating_mul(10).saturating_add(digit as usize);
            chars.next();
        }
        if width > MAX_FORMAT_WIDTH {
            return Err(format!("field width {} too large in '{}'", width, template));
        }

        let conversion = chars
            .next()
            .ok_or_else(|| format!("incomplete format directive in '{}'", template))?;
        let magnitude = value.unsigned_abs();
        let (prefix, digits) = match conversion {
            'd' | 'i' | 'u' | 's' => ("", magnitude.to_string()),
            'x' => (if alternate { "0x" } else { "" }, format!("{:x}", magnitude)),
            'X' => (if alternate { "0X" } else { "" }, format!("{:X}", magnitude)),
            'o' => (if alternate { "0o" } else { "" }, format!("{:o}", magnitude)),
            other => {
                return Err(format!(
                    "unsupported conversion '%{}' in '{}'",
                    other, template
                ))
            }
        };
        conversions += 1;

        let sign = if value < 0 {
            "-"
        } else if plus {
            "+"
        } else if space {
            " "
        } else {
            ""
        };

        let body_len = sign.len() + prefix.len() + digits.len();
        let pad = width.saturating_sub(body_len);
        if left {
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(&digits);
            out.extend(std::iter::repeat(' ').take(pad));
        } else if zero && conversion != 's' {
            out.push_str(sign);
            out.push_str(prefix);
            out.extend(std::iter::repeat('0').take(pad));
            out.push_str(&digits);
        } else {
            out.extend(std::iter::repeat(' ').take(pad));
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(&digits);
        }
    }

    match conversions {
        1 => Ok(out),
        0 => Err(format!("format '{}' has no conversion for the value", template)),
        _ => Err(format!("format '{}' has more than one conversion", template)),
    }
}

/// Sequence lookup plugin for generating numeric ranges
#[derive(Debug, Clone)]
pub struct SequenceLookup {
    descriptor: PluginDescriptor,
}

impl SequenceLookup {
    /// Create a new SequenceLookup instance
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::builtin("sequence", "Generates numeric sequences"),
        }
    }
}

impl Default for SequenceLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LookupPlugin for SequenceLookup {
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
        let mut total: u64 = 0;

        for term in terms {
            ctx.check_cancelled()?;
            let spec = SequenceSpec::parse(term)?;
            total = total.saturating_add(spec.value_count());
            if total > MAX_SEQUENCE_VALUES {
                return Err(LookupError::invalid_term(
                    term,
                    format!("terms produce more than {} values", MAX_SEQUENCE_VALUES),
                ));
            }
            debug!(term = %term, start = spec.start, end = spec.end, stride = spec.stride, "Expanding sequence");

            for (index, value) in spec.values().enumerate() {
                if index > 0 && index % CANCEL_CHECK_INTERVAL == 0 {
                    ctx.check_cancelled()?;
                }
                match spec.format {
                    Some(ref template) => {
                        let formatted = format_value(template, value)
                            .map_err(|message| LookupError::invalid_term(term, message))?;
                        results.push(Value::String(formatted));
                    }
                    None => results.push(Value::from(value)),
                }
            }
        }

        Ok(results)
    }

    fn examples(&self) -> Vec<&'static str> {
        vec!["start=1 end=5 stride=2", "1-3", "4-16/2:host%02d", "start=10 count=3"]
    }

    fn available_options(&self) -> Vec<LookupOptionInfo> {
        vec![
            LookupOptionInfo::new("start", "First value", "int").with_default("1"),
            LookupOptionInfo::new("end", "Last value, inclusive", "int").with_default("1"),
            LookupOptionInfo::new("count", "Number of values, instead of end", "int"),
            LookupOptionInfo::new("stride", "Step between values", "int").with_default("1"),
            LookupOptionInfo::new("format", "printf-style template", "string"),
        ]
    }
}
