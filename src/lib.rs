//! Rule engine for digital game score-sheets ("SpielZettel").
//!
//! A sheet is a background image plus a JSON description of interactive
//! fields (checkboxes, numbers, strings, option lists). Every field may carry
//! a rule per ruleset, written in a small sandboxed expression language, that
//! derives its value or disabled flag from the other fields. After each edit
//! the rules are re-run until the state stops changing.
//!
//! ```text
//! parse(json) → SpielZettelFileInfo → validate(sheet) → ValidationResult
//!                                   → Session::open(sheet) → click / set_value → evaluate
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use spielzettel::{Session, StateValue};
//!
//! let json = r#"{
//!   "name": "Dice",
//!   "version": { "major": 1, "minor": 0, "patch": 0 },
//!   "ruleSets": [{ "name": "default" }],
//!   "elements": [
//!     { "id": "n1", "type": "number", "position": { "x": 10, "y": 10 }, "size": { "width": 10, "height": 10 } },
//!     { "id": "n2", "type": "number", "position": { "x": 30, "y": 10 }, "size": { "width": 10, "height": 10 } },
//!     { "id": "total", "type": "number", "position": { "x": 50, "y": 10 }, "size": { "width": 10, "height": 10 },
//!       "rules": { "default": "({ value: sum('n1', 'n2'), disabled: true })" } }
//!   ]
//! }"#;
//!
//! let result = spielzettel::load(json).expect("valid sheet");
//! let mut session = Session::open(result.sheet);
//! session.select_ruleset("default").expect("ruleset exists");
//! session.set_value("n1", Some(StateValue::Number(3.0))).unwrap();
//! session.set_value("n2", Some(StateValue::Number(4.0))).unwrap();
//! assert_eq!(session.store().value("total"), Some(&StateValue::Number(7.0)));
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `yaml`  | yes     | [`parse::parse_yaml`] and [`serialize::serialize_yaml`] via `serde-saphyr`. |
//!
//! # Logging
//!
//! The crate emits [`tracing`] events (`debug` per pass, `warn` when the
//! fixed point is not reached or a disabled field is edited) and never
//! installs a subscriber.

pub mod builtins;
pub mod dispatch;
pub mod enums;
pub mod error;
pub mod evaluate;
pub mod functions;
pub mod parse;
pub mod serialize;
pub mod session;
pub mod state;
pub mod types;
pub mod validate;
pub mod value;

pub(crate) mod ast;
pub(crate) mod interpreter;
pub(crate) mod lexer;
pub(crate) mod parser;

pub use enums::*;
pub use error::*;
pub use types::*;

// Re-export entry-point functions at the crate root for convenience.
pub use dispatch::{DispatchOutcome, InputPrompt, Point, hit_test};
pub use evaluate::{
    EvaluationOptions, EvaluationOutcome, EvaluationStats, evaluate, evaluate_conditions,
    evaluate_conditions_with, evaluate_with,
};
pub use parse::{parse, parse_states};
pub use serialize::{serialize, serialize_states};
pub use session::Session;
pub use state::{StatePatch, StateStore, prune_states, states_differ};
pub use validate::validate;

/// Result of the [`load`] convenience entry point.
pub struct LoadResult {
    /// The parsed sheet.
    pub sheet: SpielZettelFileInfo,
    /// Non-fatal warnings produced during validation.
    pub warnings: Vec<Diagnostic>,
}

/// Convenience entry point composing parse → validate.
///
/// Returns the sheet and any warnings on success, or all errors (parse or
/// validation) on failure.
///
/// # Errors
///
/// Returns `Err(Vec<LoadError>)` if parsing fails or validation finds errors.
pub fn load(input: &str) -> Result<LoadResult, Vec<LoadError>> {
    let sheet = parse::parse(input).map_err(|e| vec![LoadError::Parse(e)])?;

    let result = validate::validate(&sheet);
    if !result.errors.is_empty() {
        return Err(result
            .errors
            .into_iter()
            .map(LoadError::Validation)
            .collect());
    }

    Ok(LoadResult {
        sheet,
        warnings: result.warnings,
    })
}
