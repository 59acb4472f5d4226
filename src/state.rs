//! The mutable state store, pass snapshots, diffing and persistence pruning.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::enums::ElementType;
use crate::types::{Element, ElementState, StateValue};
use crate::value::Value;

// ─── Store ──────────────────────────────────────────────────────────────────

/// Partial update as issued by `updateState` or an input edit.
///
/// `value: Some(None)` clears the value; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatePatch {
    pub value: Option<Option<StateValue>>,
    pub disabled: Option<bool>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.disabled.is_none()
    }
}

/// Per-element state overrides, at most one entry per id, kept in insertion
/// order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ElementState>", into = "Vec<ElementState>")]
pub struct StateStore {
    entries: Vec<ElementState>,
    index: HashMap<String, usize>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a saved list; a later entry for an id replaces an
    /// earlier one.
    pub fn from_states(states: impl IntoIterator<Item = ElementState>) -> Self {
        let mut store = StateStore::new();
        for state in states {
            match store.index.get(&state.id) {
                Some(&i) => store.entries[i] = state,
                None => {
                    store.index.insert(state.id.clone(), store.entries.len());
                    store.entries.push(state);
                }
            }
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<&ElementState> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn value(&self, id: &str) -> Option<&StateValue> {
        self.get(id).and_then(|s| s.value.as_ref())
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.get(id).is_some_and(ElementState::is_disabled)
    }

    pub fn states(&self) -> &[ElementState] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Applies `patch` to the entry for `id` and reports whether anything
    /// changed.
    ///
    /// Without an entry, one is created holding only the provided fields
    /// (nothing is created when the patch sets no value and no `disabled`,
    /// since clearing an absent value changes nothing). With an entry, only
    /// provided fields that differ are overwritten.
    pub fn apply(&mut self, id: &str, patch: StatePatch) -> bool {
        let Some(&i) = self.index.get(id) else {
            if patch.value.as_ref().is_none_or(Option::is_none) && patch.disabled.is_none() {
                return false;
            }
            self.index.insert(id.to_string(), self.entries.len());
            self.entries.push(ElementState {
                id: id.to_string(),
                value: patch.value.flatten(),
                disabled: patch.disabled,
            });
            return true;
        };

        let entry = &mut self.entries[i];
        let mut changed = false;
        if let Some(value) = patch.value {
            if entry.value != value {
                entry.value = value;
                changed = true;
            }
        }
        if let Some(disabled) = patch.disabled {
            if entry.disabled != Some(disabled) {
                entry.disabled = Some(disabled);
                changed = true;
            }
        }
        changed
    }

    /// Sets or clears the value of `id`.
    pub fn set_value(&mut self, id: &str, value: Option<StateValue>) -> bool {
        if value.is_none() && self.value(id).is_none() {
            return false;
        }
        self.apply(
            id,
            StatePatch {
                value: Some(value),
                disabled: None,
            },
        )
    }
}

impl From<Vec<ElementState>> for StateStore {
    fn from(states: Vec<ElementState>) -> Self {
        StateStore::from_states(states)
    }
}

impl From<StateStore> for Vec<ElementState> {
    fn from(store: StateStore) -> Self {
        store.entries
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// Read-only view of one element during a pass: definition merged with its
/// state entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSnapshot {
    pub id: String,
    pub element_type: ElementType,
    pub value: Option<StateValue>,
    pub disabled: bool,
}

impl ElementSnapshot {
    /// `{ id, type, value, disabled }` as rules see it.
    pub fn to_value(&self) -> Value {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        fields.insert(
            "type".to_string(),
            Value::String(self.element_type.as_str().to_string()),
        );
        fields.insert("value".to_string(), Value::from_state(self.value.as_ref()));
        fields.insert("disabled".to_string(), Value::Bool(self.disabled));
        Value::Object(fields)
    }
}

/// Materializes every element, in definition order.
pub fn snapshot(elements: &[Element], store: &StateStore) -> Vec<ElementSnapshot> {
    elements
        .iter()
        .map(|e| {
            let state = store.get(&e.id);
            ElementSnapshot {
                id: e.id.clone(),
                element_type: e.element_type,
                value: state.and_then(|s| s.value.clone()),
                disabled: state.is_some_and(ElementState::is_disabled),
            }
        })
        .collect()
}

// ─── Diffing and pruning ────────────────────────────────────────────────────

/// Whether two state lists would render or persist differently.
///
/// True if the sets of ids with an entry differ, or if any id has a
/// different value (presence included) or a different effective
/// `disabled`.
pub fn states_differ(a: &[ElementState], b: &[ElementState]) -> bool {
    fn by_id(states: &[ElementState]) -> HashMap<&str, &ElementState> {
        states.iter().map(|s| (s.id.as_str(), s)).collect()
    }
    let (a, b) = (by_id(a), by_id(b));

    if a.len() != b.len() {
        return true;
    }
    a.iter().any(|(id, left)| match b.get(id) {
        None => true,
        Some(right) => left.value != right.value || left.is_disabled() != right.is_disabled(),
    })
}

/// Drops everything that equals the defaults, for compact saved snapshots.
///
/// `disabled` survives only when `true`; `value` only when it is a
/// non-empty string, any number or `true`. Entries left empty are dropped.
pub fn prune_states(states: &[ElementState]) -> Vec<ElementState> {
    states
        .iter()
        .filter_map(|s| {
            let value = s.value.clone().filter(|v| match v {
                StateValue::String(text) => !text.is_empty(),
                StateValue::Number(_) => true,
                StateValue::Bool(b) => *b,
            });
            let disabled = s.disabled.filter(|d| *d);
            if value.is_none() && disabled.is_none() {
                None
            } else {
                Some(ElementState {
                    id: s.id.clone(),
                    value,
                    disabled,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_creates_only_provided_fields() {
        let mut store = StateStore::new();
        assert!(!store.apply("x", StatePatch::default()));
        assert!(store.is_empty());

        assert!(store.apply(
            "x",
            StatePatch {
                value: None,
                disabled: Some(true),
            }
        ));
        assert_eq!(store.get("x"), Some(&ElementState::new("x").with_disabled(true)));
    }

    #[test]
    fn clearing_a_missing_entry_creates_nothing() {
        let mut store = StateStore::new();
        let clear = StatePatch {
            value: Some(None),
            disabled: None,
        };
        assert!(!store.apply("x", clear));
        assert!(store.is_empty());

        let clear_and_disable = StatePatch {
            value: Some(None),
            disabled: Some(false),
        };
        assert!(store.apply("x", clear_and_disable));
        assert_eq!(store.get("x"), Some(&ElementState::new("x").with_disabled(false)));
    }

    #[test]
    fn apply_overwrites_only_differences() {
        let mut store = StateStore::from_states(vec![ElementState::new("x").with_value(3)]);
        let same = StatePatch {
            value: Some(Some(StateValue::Number(3.0))),
            disabled: None,
        };
        assert!(!store.apply("x", same));

        let clear = StatePatch {
            value: Some(None),
            disabled: None,
        };
        assert!(store.apply("x", clear));
        assert_eq!(store.value("x"), None);
    }

    #[test]
    fn from_states_keeps_one_entry_per_id() {
        let store = StateStore::from_states(vec![
            ElementState::new("x").with_value(1),
            ElementState::new("y").with_value(2),
            ElementState::new("x").with_value(3),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.value("x"), Some(&StateValue::Number(3.0)));
        assert_eq!(store.states()[0].id, "x");
    }

    #[test]
    fn set_value_none_on_missing_entry_is_noop() {
        let mut store = StateStore::new();
        assert!(!store.set_value("x", None));
        assert!(store.is_empty());
    }

    #[test]
    fn diff_treats_absent_disabled_as_false() {
        let a = vec![ElementState::new("x").with_value(1)];
        let b = vec![ElementState::new("x").with_value(1).with_disabled(false)];
        assert!(!states_differ(&a, &b));
        assert!(states_differ(&a, &[]));
        assert!(states_differ(&[ElementState::new("x")], &[ElementState::new("y")]));
    }

    #[test]
    fn pruning() {
        let states = vec![
            ElementState::new("a").with_value("").with_disabled(false),
            ElementState::new("b").with_value(0),
            ElementState::new("c").with_value(""),
            ElementState::new("d").with_value(false).with_disabled(true),
            ElementState::new("e").with_value(true),
        ];
        let pruned = prune_states(&states);
        assert_eq!(
            pruned,
            vec![
                ElementState::new("b").with_value(0),
                ElementState::new("d").with_disabled(true),
                ElementState::new("e").with_value(true),
            ]
        );
    }
}
