#![no_main]

use libfuzzer_sys::fuzz_target;
use mockup_compositor::engine::{inspect, layer_listing, read_layer_records, PsdFormat};

fuzz_target!(|data: &[u8]| {
    if let Ok(records) = read_layer_records(data) {
        let count = records.len();
        assert!(layer_listing(records).len() <= count);
    }

    if let Some((base, region)) = inspect(&PsdFormat, data) {
        assert!(region.width > 0 && region.height > 0);
        assert!(base.width() > 0 && base.height() > 0);
    }
});
