#![no_main]

use libfuzzer_sys::fuzz_target;

use scoop::extractor::{ExtractionRules, analyze_amp, analyze_page, cleaner};

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);
    let rules = ExtractionRules::default();

    // No input may panic the analysis or the cleaner
    let _ = analyze_page(&html, &rules);
    let _ = analyze_amp(&html, &rules);
    let _ = cleaner::sanitize(&html, &rules);
});
