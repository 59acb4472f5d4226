//! Aggregate functions every rule can call.
//!
//! All of them read the snapshot of the current pass, take element ids as
//! arguments and skip elements of the wrong type without complaint.

use crate::enums::ElementType;
use crate::error::RuleEvaluationError;
use crate::state::ElementSnapshot;
use crate::types::StateValue;
use crate::value::Value;

/// Names resolvable as built-in calls.
pub const BUILTIN_NAMES: &[&str] = &[
    "countChecked",
    "nAreChecked",
    "nOrMoreAreChecked",
    "nOrLessAreChecked",
    "allAreChecked",
    "sum",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Elements named in `ids`, in definition order, each at most once.
fn selected<'a, S: AsRef<str>>(
    snapshot: &'a [ElementSnapshot],
    ids: &'a [S],
) -> impl Iterator<Item = &'a ElementSnapshot> + 'a {
    snapshot
        .iter()
        .filter(move |e| ids.iter().any(|id| id.as_ref() == e.id))
}

fn is_checked(e: &ElementSnapshot) -> bool {
    e.value == Some(StateValue::Bool(true))
}

/// Number of checked checkboxes among `ids`.
pub fn count_checked<S: AsRef<str>>(snapshot: &[ElementSnapshot], ids: &[S]) -> usize {
    selected(snapshot, ids)
        .filter(|e| e.element_type == ElementType::Checkbox && is_checked(e))
        .count()
}

/// Whether every checkbox among `ids` is checked; true when there are none.
pub fn all_are_checked<S: AsRef<str>>(snapshot: &[ElementSnapshot], ids: &[S]) -> bool {
    let relevant = selected(snapshot, ids)
        .filter(|e| e.element_type == ElementType::Checkbox)
        .count();
    count_checked(snapshot, ids) == relevant
}

/// Sum of the numeric values among `ids`.
///
/// Counts `number` and `options` elements holding a number. An option
/// stored as text never counts, even when it looks numeric.
pub fn sum<S: AsRef<str>>(snapshot: &[ElementSnapshot], ids: &[S]) -> f64 {
    selected(snapshot, ids)
        .filter_map(|e| match (e.element_type, &e.value) {
            (ElementType::Number | ElementType::Options, Some(StateValue::Number(n))) => Some(*n),
            _ => None,
        })
        .sum()
}

/// Invokes the built-in `name`, or returns `None` if there is no such
/// built-in.
pub(crate) fn call(
    name: &str,
    snapshot: &[ElementSnapshot],
    args: &[Value],
) -> Option<Result<Value, RuleEvaluationError>> {
    let result = match name {
        "countChecked" => Ok(Value::Number(count_checked(snapshot, &ids(args)) as f64)),
        "allAreChecked" => Ok(Value::Bool(all_are_checked(snapshot, &ids(args)))),
        "sum" => Ok(Value::Number(sum(snapshot, &ids(args)))),
        "nAreChecked" => threshold(name, snapshot, args, |count, n| count == n),
        "nOrMoreAreChecked" => threshold(name, snapshot, args, |count, n| count >= n),
        "nOrLessAreChecked" => threshold(name, snapshot, args, |count, n| count <= n),
        _ => return None,
    };
    Some(result)
}

/// String arguments; anything else cannot name an element.
fn ids(args: &[Value]) -> Vec<&str> {
    args.iter()
        .filter_map(|a| match a {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

fn threshold(
    name: &str,
    snapshot: &[ElementSnapshot],
    args: &[Value],
    compare: impl Fn(f64, f64) -> bool,
) -> Result<Value, RuleEvaluationError> {
    let (n, rest) = args.split_first().ok_or_else(|| {
        RuleEvaluationError::type_error(format!("{} expects a count as first argument", name))
    })?;
    let count = count_checked(snapshot, &ids(rest)) as f64;
    Ok(Value::Bool(compare(count, n.to_number())))
}
