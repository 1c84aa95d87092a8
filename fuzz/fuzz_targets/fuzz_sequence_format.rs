//! Fuzz target for printf-style sequence formatting.
//!
//! Arbitrary templates must either render or be rejected, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rustible_lookup::lookup::sequence::format_value;

fuzz_target!(|input: (String, i64)| {
    let (template, value) = input;
    if format_value(&template, value).is_ok() {
        assert!(template.contains('%'), "a template without a conversion must be rejected");
    }
});
