use proptest::prelude::*;
use spielzettel::functions::compile_function;
use spielzettel::types::{CustomFunctionSource, RuleSet};
use spielzettel::validate::validate;
use spielzettel::{Element, ElementType, Position, Size, SpielZettelFileInfo, Version};
use std::collections::BTreeMap;

fn sheet_with_rule(rule: &str) -> SpielZettelFileInfo {
    let mut rules = BTreeMap::new();
    rules.insert("default".to_string(), rule.to_string());
    SpielZettelFileInfo {
        name: "fuzz".to_string(),
        version: Version::default(),
        rule_sets: Some(vec![RuleSet {
            name: "default".to_string(),
            ..RuleSet::default()
        }]),
        elements: vec![Element {
            id: "a".to_string(),
            element_type: ElementType::Number,
            position: Position::default(),
            size: Size::default(),
            options: None,
            rules,
        }],
        res: None,
    }
}

/// Fragments of the rule language, glued together at random.
fn rule_text() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        Just("("), Just(")"), Just("{"), Just("}"), Just("["), Just("]"),
        Just("value"), Just(":"), Just(","), Just("..."), Just("?"), Just("??"),
        Just("sum('a')"), Just("elements"), Just("."), Just("length"),
        Just("+"), Just("-"), Just("!"), Just("==="), Just("&&"), Just("1"),
        Just("'x'"), Just("\""), Just("/*"), Just("*/"), Just("//"), Just("\n"),
    ];
    proptest::collection::vec(fragment, 0..24).prop_map(|parts| parts.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // Any input either compiles or yields a diagnostic; nothing panics.
    #[test]
    fn arbitrary_rule_text_never_panics(rule in "\\PC{0,64}") {
        let _ = validate(&sheet_with_rule(&rule));
    }

    #[test]
    fn rule_fragments_never_panic(rule in rule_text()) {
        let _ = validate(&sheet_with_rule(&rule));
    }

    #[test]
    fn arbitrary_functions_never_panic(args in "\\PC{0,24}", body in "\\PC{0,64}") {
        let _ = compile_function("f", &CustomFunctionSource(args, body));
    }

    #[test]
    fn deep_nesting_is_rejected_not_overflowed(depth in 1usize..400) {
        let rule = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        let result = validate(&sheet_with_rule(&rule));
        prop_assert_eq!(result.is_valid(), depth < 64);
    }
}
