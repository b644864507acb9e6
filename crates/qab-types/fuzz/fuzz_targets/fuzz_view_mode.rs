#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(mode) = s.parse::<qab_types::ViewMode>()
    {
        assert_eq!(qab_types::ViewMode::try_from(mode.index()), Ok(mode));
    }
});
