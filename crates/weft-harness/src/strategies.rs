//! proptest generators for the two string grammars: descriptor keys
//! (`[*modifier(args)->]{kind}:{path}`) and trait references
//! (`name(args)`).
//!
//! Generated text is always structurally valid; properties over it assert
//! what the parsers produce, not whether they accept.

use proptest::prelude::*;

/// Lowercase identifier of the shape trait and event names take.
pub fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,7}"
}

/// Event path: one to three `:`-joined segments.
pub fn event_path() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,6}(:[a-z][a-z0-9]{0,6}){0,2}"
}

/// A routable descriptor kind, bracketed slot forms included.
pub fn kind() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("self".to_string()),
        Just("bus".to_string()),
        Just("attr".to_string()),
        Just("ref".to_string()),
        Just("model".to_string()),
        Just("collection".to_string()),
        "[a-z]{1,6}".prop_map(|slot| format!("model[{slot}]")),
        "[a-z]{1,6}".prop_map(|slot| format!("collection[{slot}]")),
    ]
}

/// One rendered modifier application from the built-in set, trailing
/// separator included (both `->` and `:` are legal).
pub fn modifier_prefix() -> impl Strategy<Value = String> {
    let body = prop_oneof![
        Just("once".to_string()),
        Just("defer".to_string()),
        (1u32..5_000).prop_map(|ms| format!("throttle({ms})")),
        (1u32..5_000).prop_map(|ms| format!("debounce({ms})")),
        (1u32..5_000).prop_map(|ms| format!("delay({ms})")),
        (1u32..20).prop_map(|n| format!("after({n})")),
        (1u32..20).prop_map(|n| format!("before({n})")),
    ];
    (body, prop::bool::ANY).prop_map(|(body, arrow)| {
        let sep = if arrow { "->" } else { ":" };
        format!("*{body}{sep}")
    })
}

/// A complete descriptor key: zero to two modifiers, a kind, a path.
pub fn event_key() -> impl Strategy<Value = String> {
    (prop::collection::vec(modifier_prefix(), 0..3), kind(), event_path())
        .prop_map(|(modifiers, kind, path)| format!("{}{kind}:{path}", modifiers.concat()))
}

fn arg_literal() -> impl Strategy<Value = String> {
    // No floats: `5.0` renders back as `5` and re-coerces to an integer,
    // which is exactly the normalization the round-trip property checks.
    prop_oneof![
        (0i64..10_000).prop_map(|n| n.to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        // `nan` and `inf` coerce to floats; NaN would break Arg equality.
        "[a-z]{1,6}".prop_filter("word must not be a float literal", |w| {
            w.parse::<f64>().is_err()
        }),
    ]
}

/// A trait reference in request syntax: `name`, `ns.name`, or either
/// with a parenthesized argument list.
pub fn trait_ref_text() -> impl Strategy<Value = String> {
    let named = prop_oneof![
        ident(),
        (ident(), ident()).prop_map(|(ns, name)| format!("{ns}.{name}")),
    ];
    (named, prop::collection::vec(arg_literal(), 0..3)).prop_map(|(name, args)| {
        if args.is_empty() { name } else { format!("{name}({})", args.join(",")) }
    })
}
