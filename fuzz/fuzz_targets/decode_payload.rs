#![no_main]

use libfuzzer_sys::fuzz_target;
use mockup_compositor::engine::{decode_image, decode_payload};

fuzz_target!(|data: &[u8]| {
    // Raw bytes straight into the decoders
    let _ = decode_image(data);

    // And the same bytes as a base64 / data-URI field
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(bytes) = decode_payload("mockup", text) {
            let _ = decode_image(&bytes);
        }
    }
});
