#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Catalog dumps come from outside; parsing must never panic
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(source) = serde_json::from_str::<qab_types::CatalogSource>(s)
    {
        let _ = source.slot_count();
    }
});
