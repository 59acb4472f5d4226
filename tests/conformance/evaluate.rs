use spielzettel::evaluate::evaluate;
use spielzettel::state::{StateStore, states_differ};
use spielzettel::types::{ElementState, RuleSet};
use spielzettel::RuleError;

use super::common::{ElementDef, elements, kind_name, read_suite};

#[derive(Debug, serde::Deserialize)]
struct EvaluateCase {
    name: String,
    id: String,
    input: EvaluateInput,
    expected: EvaluateExpected,
}

#[derive(Debug, serde::Deserialize)]
struct EvaluateInput {
    #[serde(rename = "ruleSet")]
    rule_set: RuleSet,
    elements: Vec<ElementDef>,
    #[serde(default)]
    state: Vec<ElementState>,
}

#[derive(Debug, serde::Deserialize)]
struct EvaluateExpected {
    #[serde(default)]
    state: Option<Vec<ElementState>>,
    #[serde(default)]
    changed: Option<bool>,
    #[serde(default)]
    passes: Option<usize>,
    /// `compile` or the snake-case evaluation error kind.
    #[serde(default)]
    error: Option<String>,
    /// Element id the evaluation error is attributed to.
    #[serde(default)]
    element: Option<String>,
}

fn check(case: &EvaluateCase) -> Result<(), String> {
    let elements = elements(&case.input.elements);
    let mut store = StateStore::from_states(case.input.state.clone());
    let result = evaluate(&case.input.rule_set, &elements, &mut store);

    match (&result, &case.expected.error) {
        (Ok(outcome), None) => {
            if let Some(changed) = case.expected.changed
                && outcome.changed != changed
            {
                return Err(format!("changed: expected {}, got {}", changed, outcome.changed));
            }
            if let Some(passes) = case.expected.passes
                && outcome.stats.passes != passes
            {
                return Err(format!("passes: expected {}, got {}", passes, outcome.stats.passes));
            }
        }
        (Ok(_), Some(kind)) => return Err(format!("expected {} error, evaluation succeeded", kind)),
        (Err(e), None) => return Err(format!("unexpected error: {}", e)),
        (Err(e), Some(kind)) => {
            let (actual, element) = match e {
                RuleError::Compilation(_) => ("compile".to_string(), None),
                RuleError::Evaluation(e) => (kind_name(&e.kind), e.element_id.clone()),
            };
            if &actual != kind {
                return Err(format!("error kind: expected {}, got {} ({})", kind, actual, e));
            }
            if case.expected.element.is_some() && case.expected.element != element {
                return Err(format!(
                    "error element: expected {:?}, got {:?}",
                    case.expected.element, element
                ));
            }
        }
    }

    if let Some(expected) = &case.expected.state
        && states_differ(store.states(), expected)
    {
        return Err(format!("state: expected {:?}, got {:?}", expected, store.states()));
    }
    Ok(())
}

#[test]
fn evaluate_rules_suite() {
    let Some(content) = read_suite("evaluate/rules.yaml") else {
        return;
    };
    let cases: Vec<EvaluateCase> = serde_saphyr::from_str(&content).unwrap();

    let mut passed = 0;
    let mut failed = 0;
    for case in &cases {
        match check(case) {
            Ok(()) => passed += 1,
            Err(reason) => {
                eprintln!("  FAIL [{}] {}: {}", case.id, case.name, reason);
                failed += 1;
            }
        }
    }

    eprintln!(
        "\nevaluate_rules: {} passed, {} failed out of {} total",
        passed,
        failed,
        cases.len()
    );
    assert_eq!(failed, 0, "{} evaluate_rules conformance tests failed", failed);
}
