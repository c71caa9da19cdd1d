#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weft_events::EventKey;

#[derive(Arbitrary, Debug)]
enum ModifierSpec {
    Once,
    Defer,
    Throttle(u16),
    Debounce(u16),
    After(u8),
}

impl ModifierSpec {
    fn render(&self, colon: bool) -> String {
        let body = match self {
            Self::Once => "once".to_string(),
            Self::Defer => "defer".to_string(),
            Self::Throttle(ms) => format!("throttle({ms})"),
            Self::Debounce(ms) => format!("debounce({ms})"),
            Self::After(n) => format!("after({n})"),
        };
        let sep = if colon { ":" } else { "->" };
        format!("*{body}{sep}")
    }
}

#[derive(Arbitrary, Debug)]
struct KeyInput {
    modifiers: Vec<(ModifierSpec, bool)>,
    kind: u8,
    segments: u8,
}

const KINDS: [&str; 6] = ["self", "bus", "attr", "ref", "interval", "model[main]"];

// Assembled well-formed keys must always parse, with the modifier count
// and the kind/path split preserved.
fuzz_target!(|input: KeyInput| {
    let kind = KINDS[input.kind as usize % KINDS.len()];
    let path = vec!["seg"; usize::from(input.segments % 3) + 1].join(":");
    let mut key = String::new();
    for (modifier, colon) in &input.modifiers {
        key.push_str(&modifier.render(*colon));
    }
    key.push_str(kind);
    key.push(':');
    key.push_str(&path);

    let parsed = EventKey::parse(&key).unwrap();
    assert_eq!(parsed.modifiers.len(), input.modifiers.len());
    assert_eq!(parsed.kind, kind);
    assert_eq!(parsed.path, path);
});
