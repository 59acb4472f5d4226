use spielzettel::types::SpielZettelFileInfo;
use spielzettel::validate::validate;

use super::common::read_suite;

#[derive(Debug, serde::Deserialize)]
struct ValidateCase {
    name: String,
    id: String,
    input: SpielZettelFileInfo,
    /// Rule codes of the expected errors, in report order.
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[test]
fn validate_suite() {
    let Some(content) = read_suite("validate/validate.yaml") else {
        return;
    };
    let cases: Vec<ValidateCase> = serde_saphyr::from_str(&content).unwrap();

    let mut passed = 0;
    let mut failed = 0;
    for case in &cases {
        let result = validate(&case.input);
        let errors: Vec<&str> = result.errors.iter().map(|e| e.rule.as_str()).collect();
        let warnings: Vec<&str> = result.warnings.iter().map(|w| w.code.as_str()).collect();

        if errors == case.errors && warnings == case.warnings {
            passed += 1;
        } else {
            eprintln!(
                "  FAIL [{}] {}: expected errors {:?} warnings {:?}, got {:?} {:?}",
                case.id, case.name, case.errors, case.warnings, result.errors, result.warnings
            );
            failed += 1;
        }
    }

    eprintln!(
        "\nvalidate: {} passed, {} failed out of {} total",
        passed,
        failed,
        cases.len()
    );
    assert_eq!(failed, 0, "{} validate conformance tests failed", failed);
}
