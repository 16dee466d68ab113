#![no_main]
use libfuzzer_sys::fuzz_target;
use vod_dl::playlist;

fuzz_target!(|data: &str| {
    // parse() should never panic on arbitrary UTF-8 strings
    if let Ok(parsed) = playlist::parse(data) {
        assert!(!parsed.is_empty());
    }
});
