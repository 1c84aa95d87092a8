//! Fuzz target for the lookup term grammar.
//!
//! Term parsing must never panic, and the sequence and csvfile parsers built
//! on it must either reject a term or produce a spec that terminates.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use rustible_lookup::lookup::csvfile::CsvLookupSpec;
use rustible_lookup::lookup::sequence::{SequenceSpec, MAX_SEQUENCE_VALUES};
use rustible_lookup::lookup::terms::{parse_int, RangeShortcut, TermArgs};
use rustible_lookup::lookup::LookupOptions;

/// Keys the lookups actually read, to steer the fuzzer toward them
const KNOWN_KEYS: &[&str] = &[
    "start", "end", "stride", "count", "format", "file", "col", "delimiter", "default", "length",
    "chars",
];

#[derive(Debug, Arbitrary)]
struct FuzzTerm {
    head: String,
    pairs: Vec<(u8, String)>,
    noise: Vec<String>,
}

impl FuzzTerm {
    fn render(&self) -> String {
        let mut term = self.head.clone();
        for (key, value) in &self.pairs {
            let key = KNOWN_KEYS[*key as usize % KNOWN_KEYS.len()];
            term.push_str(&format!(" {}={}", key, value));
        }
        for token in &self.noise {
            term.push(' ');
            term.push_str(token);
        }
        term
    }
}

fuzz_target!(|data: &[u8]| {
    // Raw bytes as a term
    if let Ok(raw) = std::str::from_utf8(data) {
        let args = TermArgs::parse(raw);
        let _ = args.range();
        let _ = RangeShortcut::parse(raw);
        let _ = parse_int(raw);
    }

    let mut unstructured = Unstructured::new(data);
    if let Ok(term) = FuzzTerm::arbitrary(&mut unstructured) {
        let term = term.render();

        if let Ok(spec) = SequenceSpec::parse(&term) {
            assert_ne!(spec.stride, 0);
            assert!(spec.value_count() <= MAX_SEQUENCE_VALUES);
            // Bounded walk: the iterator must make progress toward `end`
            let mut previous = None;
            for value in spec.values().take(1024) {
                if let Some(prev) = previous {
                    assert!(if spec.stride > 0 { value > prev } else { value < prev });
                }
                previous = Some(value);
            }
        }

        let _ = CsvLookupSpec::parse(&term, &LookupOptions::new());
    }
});
