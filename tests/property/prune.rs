use proptest::prelude::*;
use spielzettel::state::prune_states;
use spielzettel::types::{ElementState, StateValue};

fn element_state() -> impl Strategy<Value = ElementState> {
    let value = prop_oneof![
        any::<bool>().prop_map(StateValue::Bool),
        (-50i32..50).prop_map(|n| StateValue::Number(n as f64)),
        "[a-z]{0,3}".prop_map(StateValue::String),
    ];
    (
        "[a-z]{1,3}",
        proptest::option::of(value),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(id, value, disabled)| ElementState { id, value, disabled })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn pruning_is_idempotent(states in proptest::collection::vec(element_state(), 0..8)) {
        let once = prune_states(&states);
        let twice = prune_states(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn pruned_entries_carry_no_defaults(states in proptest::collection::vec(element_state(), 0..8)) {
        for state in prune_states(&states) {
            prop_assert!(state.value.is_some() || state.disabled == Some(true));
            prop_assert_ne!(state.disabled, Some(false));
            prop_assert_ne!(state.value.as_ref(), Some(&StateValue::Bool(false)));
            prop_assert_ne!(state.value.as_ref(), Some(&StateValue::String(String::new())));
        }
    }

    #[test]
    fn pruning_never_grows(states in proptest::collection::vec(element_state(), 0..8)) {
        prop_assert!(prune_states(&states).len() <= states.len());
    }
}
