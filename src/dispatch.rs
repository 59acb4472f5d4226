//! Pointer input: hit-testing and the raw mutation an edit performs before
//! the rules run.

use tracing::{debug, warn};

use crate::enums::ElementType;
use crate::error::RuleError;
use crate::evaluate::{EvaluationOptions, EvaluationOutcome, evaluate_with};
use crate::state::{StateStore, states_differ};
use crate::types::{Element, RuleSet, StateValue};
use crate::value::string_to_number;

/// A point in canvas coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Extension point for asking the user to type a value.
///
/// Implemented by the host UI. Returning `None` means the prompt was
/// cancelled.
pub trait InputPrompt {
    fn prompt(&mut self, element: &Element, current: Option<&StateValue>) -> Option<String>;
}

impl<F> InputPrompt for F
where
    F: FnMut(&Element, Option<&StateValue>) -> Option<String>,
{
    fn prompt(&mut self, element: &Element, current: Option<&StateValue>) -> Option<String> {
        self(element, current)
    }
}

/// What a pointer event did.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// No element under the point.
    Missed,
    /// The element is disabled; nothing was changed.
    Rejected { element_id: String },
    /// The prompt was dismissed; nothing was changed.
    Cancelled { element_id: String },
    Updated {
        element_id: String,
        /// The state list differs from before the event.
        rerender: bool,
        /// Present when a ruleset was active.
        evaluation: Option<EvaluationOutcome>,
    },
}

/// Everything an edit needs to touch.
pub struct DispatchContext<'a> {
    pub elements: &'a [Element],
    pub ruleset: Option<&'a RuleSet>,
    pub store: &'a mut StateStore,
    pub options: EvaluationOptions,
}

/// First element, in list order, whose box scaled by `scale` contains
/// `point`. Positions are box centers.
pub fn hit_test<'a>(elements: &'a [Element], point: Point, scale: f64) -> Option<&'a Element> {
    elements.iter().find(|e| {
        (point.x - e.position.x * scale).abs() <= e.size.width * scale / 2.0
            && (point.y - e.position.y * scale).abs() <= e.size.height * scale / 2.0
    })
}

/// Handles a click at `point`.
pub fn dispatch(
    ctx: DispatchContext<'_>,
    point: Point,
    scale: f64,
    prompt: &mut dyn InputPrompt,
) -> Result<DispatchOutcome, RuleError> {
    let Some(element) = hit_test(ctx.elements, point, scale) else {
        return Ok(DispatchOutcome::Missed);
    };
    debug!(element = %element.id, kind = %element.element_type, "element hit");

    if ctx.store.is_disabled(&element.id) {
        warn!(element = %element.id, "edit of disabled element rejected");
        return Ok(DispatchOutcome::Rejected {
            element_id: element.id.clone(),
        });
    }

    let current = ctx.store.value(&element.id);
    let edit = match element.element_type {
        ElementType::Checkbox => Edit::Set(StateValue::Bool(current != Some(&StateValue::Bool(true)))),
        _ => match prompt.prompt(element, current) {
            Some(answer) => parse_answer(element, &answer),
            None => {
                return Ok(DispatchOutcome::Cancelled {
                    element_id: element.id.clone(),
                });
            }
        },
    };
    apply_edit(ctx, element, edit)
}

/// Sets the value of `element` as if the user had edited it.
pub fn set_element_value(
    ctx: DispatchContext<'_>,
    element: &Element,
    value: Option<StateValue>,
) -> Result<DispatchOutcome, RuleError> {
    if ctx.store.is_disabled(&element.id) {
        warn!(element = %element.id, "edit of disabled element rejected");
        return Ok(DispatchOutcome::Rejected {
            element_id: element.id.clone(),
        });
    }
    let edit = match value {
        Some(value) => Edit::Set(value),
        None => Edit::Clear,
    };
    apply_edit(ctx, element, edit)
}

enum Edit {
    Set(StateValue),
    Clear,
}

fn apply_edit(
    ctx: DispatchContext<'_>,
    element: &Element,
    edit: Edit,
) -> Result<DispatchOutcome, RuleError> {
    let before = ctx.store.states().to_vec();
    match edit {
        Edit::Set(value) => ctx.store.set_value(&element.id, Some(value)),
        Edit::Clear => ctx.store.set_value(&element.id, None),
    };

    let evaluation = match ctx.ruleset {
        Some(ruleset) => Some(evaluate_with(ruleset, ctx.elements, ctx.store, &ctx.options)?),
        None => None,
    };
    let rerender = states_differ(&before, ctx.store.states());
    Ok(DispatchOutcome::Updated {
        element_id: element.id.clone(),
        rerender,
        evaluation,
    })
}

/// Interprets prompt text for the element's type.
fn parse_answer(element: &Element, answer: &str) -> Edit {
    match element.element_type {
        ElementType::Number => {
            let n = string_to_number(answer);
            if answer.trim().is_empty() || !n.is_finite() {
                Edit::Clear
            } else {
                Edit::Set(StateValue::Number(n))
            }
        }
        ElementType::String if answer.is_empty() => Edit::Clear,
        ElementType::String => Edit::Set(StateValue::String(answer.to_string())),
        ElementType::Options => element
            .options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|option| option.to_string() == answer)
            .map_or(Edit::Clear, |option| Edit::Set(option.clone())),
        ElementType::Checkbox => Edit::Set(StateValue::Bool(true)),
    }
}
