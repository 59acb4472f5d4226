use spielzettel::evaluate::evaluate;
use spielzettel::state::StateStore;
use spielzettel::types::{ElementState, RuleSet, StateValue};

use super::common::{ElementDef, elements, read_suite};

#[derive(Debug, serde::Deserialize)]
struct BuiltinCase {
    name: String,
    id: String,
    expression: String,
    expected: StateValue,
}

#[derive(Debug, serde::Deserialize)]
struct BuiltinSuite {
    elements: Vec<ElementDef>,
    state: Vec<ElementState>,
    cases: Vec<BuiltinCase>,
}

/// Evaluates `expression` as the value rule of an extra `out` element.
fn run(suite: &BuiltinSuite, expression: &str) -> Result<Option<StateValue>, String> {
    let mut defs = elements(&suite.elements);
    let mut out = ElementDef {
        id: "out".to_string(),
        element_type: spielzettel::ElementType::String,
        options: None,
        rules: Default::default(),
    }
    .to_element();
    out.rules
        .insert("default".to_string(), format!("({{ value: {} }})", expression));
    defs.push(out);

    let ruleset = RuleSet {
        name: "default".to_string(),
        ..RuleSet::default()
    };
    let mut store = StateStore::from_states(suite.state.clone());
    evaluate(&ruleset, &defs, &mut store).map_err(|e| e.to_string())?;
    Ok(store.value("out").cloned())
}

#[test]
fn builtins_suite() {
    let Some(content) = read_suite("builtins/builtins.yaml") else {
        return;
    };
    let suite: BuiltinSuite = serde_saphyr::from_str(&content).unwrap();

    let mut passed = 0;
    let mut failed = 0;
    for case in &suite.cases {
        match run(&suite, &case.expression) {
            Ok(Some(actual)) if actual == case.expected => passed += 1,
            other => {
                eprintln!(
                    "  FAIL [{}] {}: `{}` expected {:?}, got {:?}",
                    case.id, case.name, case.expression, case.expected, other
                );
                failed += 1;
            }
        }
    }

    eprintln!(
        "\nbuiltins: {} passed, {} failed out of {} total",
        passed,
        failed,
        suite.cases.len()
    );
    assert_eq!(failed, 0, "{} builtins conformance tests failed", failed);
}
