#![no_main]

use libfuzzer_sys::fuzz_target;
use imtrace::analysis::{parse_latency_file_name, parse_latency_samples, parse_summary};

fuzz_target!(|data: &[u8]| {
    // Dump readers must reject garbage with an error, never panic
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = parse_summary(input);
        let _ = parse_latency_samples(input);
        let _ = parse_latency_file_name(input);
    }
});
