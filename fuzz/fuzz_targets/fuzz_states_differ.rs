#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use spielzettel::{ElementState, StateValue, prune_states, states_differ};

fn arbitrary_state(u: &mut Unstructured<'_>) -> arbitrary::Result<ElementState> {
    let value = match u.int_in_range(0..=3)? {
        0 => None,
        1 => Some(StateValue::Bool(bool::arbitrary(u)?)),
        2 => Some(StateValue::Number(f64::from(i32::arbitrary(u)?))),
        _ => Some(StateValue::String(String::arbitrary(u)?)),
    };
    Ok(ElementState {
        id: format!("e{}", u.int_in_range(0..=5)?),
        value,
        disabled: Option::<bool>::arbitrary(u)?,
    })
}

fn arbitrary_list(u: &mut Unstructured<'_>) -> arbitrary::Result<Vec<ElementState>> {
    let len = u.int_in_range(0..=6)?;
    let mut states: Vec<ElementState> = Vec::with_capacity(len);
    for _ in 0..len {
        let state = arbitrary_state(u)?;
        if states.iter().all(|s| s.id != state.id) {
            states.push(state);
        }
    }
    Ok(states)
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let (Ok(a), Ok(b)) = (arbitrary_list(&mut u), arbitrary_list(&mut u)) else {
        return;
    };

    assert!(!states_differ(&a, &a));
    assert_eq!(states_differ(&a, &b), states_differ(&b, &a));

    let pruned = prune_states(&a);
    assert_eq!(prune_states(&pruned), pruned);
});
