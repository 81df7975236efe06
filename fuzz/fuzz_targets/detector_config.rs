#![no_main]

use kf_resolution::DetectorConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // File-backed specs fail to read; inline ones build.
    if let Ok(config) = DetectorConfig::from_json_str(text) {
        if let DetectorConfig::Custom { .. } = config {
            let _ = config.build(std::path::Path::new("/nonexistent"));
        }
    }
});
