#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use spielzettel::{
    CustomFunctionSource, Element, ElementState, ElementType, Position, RuleSet, Size, StateStore,
    StateValue, evaluate, evaluate_conditions,
};
use std::collections::BTreeMap;

const IDS: [&str; 4] = ["a", "b", "c", "d"];

fn arbitrary_type(u: &mut Unstructured<'_>) -> arbitrary::Result<ElementType> {
    Ok(match u.int_in_range(0..=3)? {
        0 => ElementType::Number,
        1 => ElementType::Checkbox,
        2 => ElementType::String,
        _ => ElementType::Options,
    })
}

fn arbitrary_value(u: &mut Unstructured<'_>) -> arbitrary::Result<StateValue> {
    Ok(match u.int_in_range(0..=2)? {
        0 => StateValue::Bool(bool::arbitrary(u)?),
        1 => StateValue::Number(f64::from(i16::arbitrary(u)?)),
        _ => StateValue::String(String::arbitrary(u)?),
    })
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(function_body) = String::arbitrary(&mut u) else {
        return;
    };

    let mut elements = Vec::new();
    let mut states = Vec::new();
    for id in IDS {
        let (Ok(element_type), Ok(rule), Ok(value)) = (
            arbitrary_type(&mut u),
            Option::<String>::arbitrary(&mut u),
            arbitrary_value(&mut u),
        ) else {
            return;
        };
        let mut rules = BTreeMap::new();
        if let Some(rule) = rule {
            rules.insert("default".to_string(), rule);
        }
        elements.push(Element {
            id: id.to_string(),
            element_type,
            position: Position::default(),
            size: Size::default(),
            options: None,
            rules,
        });
        states.push(ElementState::new(id).with_value(value));
    }

    let mut ruleset = RuleSet {
        name: "default".to_string(),
        win_condition: Some("f(1)".to_string()),
        ..RuleSet::default()
    };
    ruleset
        .custom_functions
        .insert("f".to_string(), CustomFunctionSource("x, ...rest".to_string(), function_body));

    let mut store = StateStore::from_states(states);
    let _ = evaluate(&ruleset, &elements, &mut store);
    let _ = evaluate_conditions(&ruleset, &elements, &store);
});
