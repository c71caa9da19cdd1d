#![no_main]

use libfuzzer_sys::fuzz_target;
use weft_events::EventKey;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };
    let Ok(key) = EventKey::parse(text) else { return };
    // Parser postconditions for every accepted key.
    assert!(!key.kind.is_empty());
    for modifier in &key.modifiers {
        assert!(!modifier.name.is_empty());
    }
});
