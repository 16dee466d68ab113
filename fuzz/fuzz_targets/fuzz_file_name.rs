#![no_main]
use libfuzzer_sys::fuzz_target;
use vod_dl::filename::output_file_name;

fuzz_target!(|data: (&str, &str)| {
    let (title, url) = data;
    let name = output_file_name(title, url, "mp4");
    assert!(name.is_ascii());
    assert!(!name.contains('/'));
});
