#![no_main]

use libfuzzer_sys::fuzz_target;
use mockup_compositor::{process_request, ComposeConfig};
use std::time::Duration;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let config = ComposeConfig::default().with_timeout(Duration::from_secs(5));
    let response = process_request(input, config);
    assert!(!response.to_json().contains('\n'));
});
