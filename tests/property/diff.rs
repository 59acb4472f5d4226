use proptest::prelude::*;
use spielzettel::state::states_differ;
use spielzettel::types::{ElementState, StateValue};

fn state_value() -> impl Strategy<Value = StateValue> {
    prop_oneof![
        any::<bool>().prop_map(StateValue::Bool),
        (-1000i32..1000).prop_map(|n| StateValue::Number(n as f64)),
        "[a-z]{0,4}".prop_map(StateValue::String),
    ]
}

fn element_state() -> impl Strategy<Value = ElementState> {
    (
        "[a-e]",
        proptest::option::of(state_value()),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(id, value, disabled)| ElementState { id, value, disabled })
}

/// Lists with at most one entry per id, as the store keeps them.
fn state_list() -> impl Strategy<Value = Vec<ElementState>> {
    proptest::collection::vec(element_state(), 0..6).prop_map(|mut states| {
        let mut seen = std::collections::HashSet::new();
        states.retain(|s| seen.insert(s.id.clone()));
        states
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn diff_is_irreflexive(states in state_list()) {
        prop_assert!(!states_differ(&states, &states));
    }

    #[test]
    fn diff_is_symmetric(a in state_list(), b in state_list()) {
        prop_assert_eq!(states_differ(&a, &b), states_differ(&b, &a));
    }

    #[test]
    fn diff_ignores_order(states in state_list()) {
        let mut reversed = states.clone();
        reversed.reverse();
        prop_assert!(!states_differ(&states, &reversed));
    }

    // An explicit `disabled: false` reads the same as an absent flag.
    #[test]
    fn diff_reads_absent_disabled_as_false(states in state_list()) {
        let normalized: Vec<ElementState> = states
            .iter()
            .map(|s| ElementState {
                disabled: s.disabled.filter(|d| *d),
                ..s.clone()
            })
            .collect();
        prop_assert!(!states_differ(&states, &normalized));
    }
}
