use proptest::prelude::*;
use spielzettel::enums::ElementType;
use spielzettel::evaluate::evaluate;
use spielzettel::state::{StateStore, states_differ};
use spielzettel::types::{Element, ElementState, Position, RuleSet, Size};
use std::collections::BTreeMap;

fn element(id: &str, element_type: ElementType, rule: Option<&str>) -> Element {
    let mut rules = BTreeMap::new();
    if let Some(rule) = rule {
        rules.insert("default".to_string(), rule.to_string());
    }
    Element {
        id: id.to_string(),
        element_type,
        position: Position::default(),
        size: Size::default(),
        options: None,
        rules,
    }
}

/// A small score-sheet: five dice rows, a bonus, a total and a gate.
fn sheet() -> Vec<Element> {
    vec![
        element("r1", ElementType::Number, None),
        element("r2", ElementType::Number, None),
        element("r3", ElementType::Number, None),
        element("c1", ElementType::Checkbox, None),
        element("c2", ElementType::Checkbox, None),
        element(
            "bonus",
            ElementType::Number,
            Some("({ value: sum('r1', 'r2', 'r3') >= 10 ? 35 : 0, disabled: true })"),
        ),
        element(
            "total",
            ElementType::Number,
            Some("({ value: sum('r1', 'r2', 'r3', 'bonus'), disabled: true })"),
        ),
        element(
            "gate",
            ElementType::Checkbox,
            Some("({ disabled: !allAreChecked('c1', 'c2'), value: nAreChecked(2, 'c1', 'c2') })"),
        ),
    ]
}

fn ruleset() -> RuleSet {
    RuleSet {
        name: "default".to_string(),
        ..RuleSet::default()
    }
}

fn inputs() -> impl Strategy<Value = Vec<ElementState>> {
    (
        proptest::option::of(0i32..7),
        proptest::option::of(0i32..7),
        proptest::option::of(0i32..7),
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(r1, r2, r3, c1, c2)| {
            let mut states = Vec::new();
            for (id, n) in [("r1", r1), ("r2", r2), ("r3", r3)] {
                if let Some(n) = n {
                    states.push(ElementState::new(id).with_value(n));
                }
            }
            for (id, b) in [("c1", c1), ("c2", c2)] {
                if let Some(b) = b {
                    states.push(ElementState::new(id).with_value(b));
                }
            }
            states
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // Evaluating an already-settled store changes nothing.
    #[test]
    fn evaluation_is_idempotent_at_the_fixed_point(states in inputs()) {
        let elements = sheet();
        let mut store = StateStore::from_states(states);
        let first = evaluate(&ruleset(), &elements, &mut store).unwrap();
        prop_assert!(!first.stats.depth_exhausted);

        let settled = store.states().to_vec();
        let second = evaluate(&ruleset(), &elements, &mut store).unwrap();
        prop_assert!(!second.changed);
        prop_assert_eq!(second.stats.passes, 1);
        prop_assert!(!states_differ(&settled, store.states()));
    }

    #[test]
    fn total_is_the_sum_of_rows_and_bonus(states in inputs()) {
        let elements = sheet();
        let mut store = StateStore::from_states(states);
        evaluate(&ruleset(), &elements, &mut store).unwrap();

        let row = |id: &str| store.value(id).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let rows = row("r1") + row("r2") + row("r3");
        let bonus = if rows >= 10.0 { 35.0 } else { 0.0 };
        prop_assert_eq!(row("bonus"), bonus);
        prop_assert_eq!(row("total"), rows + bonus);
    }
}
