//! Sheet validation against conformance rules V-001 through V-008.
//!
//! Returns **all** errors and warnings, not just the first. Validation does not
//! modify the sheet.

use std::collections::HashSet;

use crate::builtins::is_builtin;
use crate::enums::ElementType;
use crate::error::*;
use crate::evaluate::{compile_condition, compile_rule};
use crate::functions::compile_function;
use crate::types::*;

/// Validate a parsed sheet. Compiles every rule, custom function and
/// condition without running any of them.
pub fn validate(sheet: &SpielZettelFileInfo) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    v001_unique_element_ids(sheet, &mut errors);
    v002_unique_ruleset_names(sheet, &mut errors);
    v003_options_present(sheet, &mut errors, &mut warnings);
    v004_v005_custom_functions(sheet, &mut errors, &mut warnings);
    v006_rules_compile(sheet, &mut errors, &mut warnings);
    v007_conditions_compile(sheet, &mut errors);
    v008_element_size(sheet, &mut errors);

    ValidationResult { errors, warnings }
}

fn rulesets(sheet: &SpielZettelFileInfo) -> &[RuleSet] {
    sheet.rule_sets.as_deref().unwrap_or_default()
}

fn error(rule: &str, path: String, message: impl Into<String>) -> ValidationError {
    ValidationError {
        rule: rule.to_string(),
        path,
        message: message.into(),
    }
}

// ─── V-001 ──────────────────────────────────────────────────────────────────

fn v001_unique_element_ids(sheet: &SpielZettelFileInfo, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for (i, element) in sheet.elements.iter().enumerate() {
        if element.id.is_empty() {
            errors.push(error("V-001", format!("elements[{}].id", i), "element id must not be empty"));
        } else if !seen.insert(element.id.as_str()) {
            errors.push(error(
                "V-001",
                format!("elements[{}].id", i),
                format!("duplicate element id: {}", element.id),
            ));
        }
    }
}

// ─── V-002 ──────────────────────────────────────────────────────────────────

fn v002_unique_ruleset_names(sheet: &SpielZettelFileInfo, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for (i, ruleset) in rulesets(sheet).iter().enumerate() {
        if ruleset.name.is_empty() {
            errors.push(error("V-002", format!("ruleSets[{}].name", i), "ruleset name must not be empty"));
        } else if !seen.insert(ruleset.name.as_str()) {
            errors.push(error(
                "V-002",
                format!("ruleSets[{}].name", i),
                format!("duplicate ruleset name: {}", ruleset.name),
            ));
        }
    }
}

// ─── V-003 / W-003 ──────────────────────────────────────────────────────────

fn v003_options_present(
    sheet: &SpielZettelFileInfo,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<Diagnostic>,
) {
    for (i, element) in sheet.elements.iter().enumerate() {
        let has_options = element.options.as_ref().is_some_and(|o| !o.is_empty());
        match element.element_type {
            ElementType::Options if !has_options => errors.push(error(
                "V-003",
                format!("elements[{}].options", i),
                format!("options element '{}' must declare at least one option", element.id),
            )),
            ElementType::Options => {}
            other if element.options.is_some() => warnings.push(Diagnostic::warning(
                "W-003",
                Some(format!("elements[{}].options", i)),
                format!("options are ignored on {} element '{}'", other, element.id),
            )),
            _ => {}
        }
    }
}

// ─── V-004 / V-005 / W-002 ──────────────────────────────────────────────────

fn v004_v005_custom_functions(
    sheet: &SpielZettelFileInfo,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<Diagnostic>,
) {
    for (i, ruleset) in rulesets(sheet).iter().enumerate() {
        for (name, source) in &ruleset.custom_functions {
            let path = format!("ruleSets[{}].customFunctions.{}", i, name);
            if let Err(e) = compile_function(name, source) {
                let rule = match e.kind {
                    CompilationErrorKind::InvalidName | CompilationErrorKind::ReservedName => "V-004",
                    _ => "V-005",
                };
                errors.push(error(rule, path, e.to_string()));
            } else if is_builtin(name) {
                warnings.push(Diagnostic::warning(
                    "W-002",
                    Some(path),
                    format!("custom function '{}' shadows the built-in of the same name", name),
                ));
            }
        }
    }
}

// ─── V-006 / W-001 ──────────────────────────────────────────────────────────

fn v006_rules_compile(
    sheet: &SpielZettelFileInfo,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<Diagnostic>,
) {
    let known: HashSet<&str> = rulesets(sheet).iter().map(|r| r.name.as_str()).collect();
    for (i, element) in sheet.elements.iter().enumerate() {
        for (ruleset, source) in &element.rules {
            let path = format!("elements[{}].rules.{}", i, ruleset);
            if !known.contains(ruleset.as_str()) {
                warnings.push(Diagnostic::warning(
                    "W-001",
                    Some(path.clone()),
                    format!("rule of element '{}' names unknown ruleset '{}'", element.id, ruleset),
                ));
            }
            if let Err(e) = compile_rule(&element.id, source) {
                errors.push(error("V-006", path, e.to_string()));
            }
        }
    }
}

// ─── V-007 ──────────────────────────────────────────────────────────────────

fn v007_conditions_compile(sheet: &SpielZettelFileInfo, errors: &mut Vec<ValidationError>) {
    for (i, ruleset) in rulesets(sheet).iter().enumerate() {
        let conditions = [
            ("winCondition", &ruleset.win_condition),
            ("loseCondition", &ruleset.lose_condition),
        ];
        for (name, source) in conditions {
            if let Err(e) = compile_condition(name, source.as_deref()) {
                errors.push(error("V-007", format!("ruleSets[{}].{}", i, name), e.to_string()));
            }
        }
    }
}

// ─── V-008 ──────────────────────────────────────────────────────────────────

fn v008_element_size(sheet: &SpielZettelFileInfo, errors: &mut Vec<ValidationError>) {
    for (i, element) in sheet.elements.iter().enumerate() {
        let dimensions = [("width", element.size.width), ("height", element.size.height)];
        for (name, value) in dimensions {
            if !value.is_finite() || value < 0.0 {
                errors.push(error(
                    "V-008",
                    format!("elements[{}].size.{}", i, name),
                    format!("{} must be a finite, non-negative number, got {}", name, value),
                ));
            }
        }
    }
}
