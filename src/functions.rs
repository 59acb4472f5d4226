//! Compilation of a ruleset's `customFunctions`.
//!
//! Each entry `name → [argList, body]` becomes a callable equivalent to
//! `function name(argList) { body }` written in the rule language.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::ast::Stmt;
use crate::error::{CompilationErrorKind, RuleCompilationError};
use crate::parser::{Params, parse_body, parse_params};
use crate::types::{CustomFunctionSource, RuleSet};

pub(crate) static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Names bound by the evaluation context itself.
pub const RESERVED_NAMES: &[&str] = &["updateState", "elements"];

/// A custom function ready to be called by rules.
#[derive(Clone, Debug)]
pub struct CompiledFunction {
    name: String,
    pub(crate) params: Params,
    pub(crate) body: Vec<Stmt>,
}

impl CompiledFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of named parameters, not counting a rest parameter.
    pub fn arity(&self) -> usize {
        self.params.names.len()
    }

    pub fn has_rest(&self) -> bool {
        self.params.rest.is_some()
    }
}

/// The compiled custom functions of one ruleset, by name.
#[derive(Clone, Debug, Default)]
pub struct CustomFunctions {
    functions: HashMap<String, CompiledFunction>,
}

impl CustomFunctions {
    pub fn get(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Compiles every custom function of `ruleset`; the first failure aborts.
pub fn compile_custom_functions(ruleset: &RuleSet) -> Result<CustomFunctions, RuleCompilationError> {
    let functions = ruleset
        .custom_functions
        .iter()
        .map(|(name, source)| compile_function(name, source).map(|f| (name.clone(), f)))
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(CustomFunctions { functions })
}

/// Compiles one `[argList, body]` pair under `name`.
pub fn compile_function(
    name: &str,
    source: &CustomFunctionSource,
) -> Result<CompiledFunction, RuleCompilationError> {
    if !IDENT_RE.is_match(name) {
        return Err(RuleCompilationError {
            kind: CompilationErrorKind::InvalidName,
            name: name.to_string(),
            message: "function name must be an identifier".to_string(),
            line: None,
            column: None,
        });
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(RuleCompilationError {
            kind: CompilationErrorKind::ReservedName,
            name: name.to_string(),
            message: format!("'{}' is reserved by the evaluation context", name),
            line: None,
            column: None,
        });
    }

    let params = parse_params(source.args()).map_err(|e| {
        RuleCompilationError::from_syntax(CompilationErrorKind::ArgumentList, name, e)
    })?;

    let mut seen = HashSet::new();
    for param in params.names.iter().chain(params.rest.iter()) {
        if !seen.insert(param.as_str()) {
            return Err(RuleCompilationError {
                kind: CompilationErrorKind::DuplicateParameter,
                name: name.to_string(),
                message: format!("parameter '{}' is declared twice", param),
                line: None,
                column: None,
            });
        }
    }

    let body = parse_body(source.body()).map_err(|e| {
        RuleCompilationError::from_syntax(CompilationErrorKind::FunctionBody, name, e)
    })?;

    Ok(CompiledFunction {
        name: name.to_string(),
        params,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(args: &str, body: &str) -> CustomFunctionSource {
        CustomFunctionSource(args.to_string(), body.to_string())
    }

    #[test]
    fn compiles_rest_parameters() {
        let f = compile_function("bonus", &source("n, ...ids", "return n;")).unwrap();
        assert_eq!(f.name(), "bonus");
        assert_eq!(f.arity(), 1);
        assert!(f.has_rest());
    }

    #[test]
    fn argument_list_errors_name_the_function() {
        let err = compile_function("bad", &source("a b", "return a;")).unwrap_err();
        assert_eq!(err.kind, CompilationErrorKind::ArgumentList);
        assert_eq!(err.name, "bad");
        assert!(err.line.is_some());
    }

    #[test]
    fn body_errors_name_the_function() {
        let err = compile_function("bad", &source("a", "return (a;")).unwrap_err();
        assert_eq!(err.kind, CompilationErrorKind::FunctionBody);
    }

    #[test]
    fn rejects_reserved_and_invalid_names() {
        let err = compile_function("updateState", &source("", "")).unwrap_err();
        assert_eq!(err.kind, CompilationErrorKind::ReservedName);
        let err = compile_function("two words", &source("", "")).unwrap_err();
        assert_eq!(err.kind, CompilationErrorKind::InvalidName);
    }

    #[test]
    fn rejects_duplicate_parameters() {
        let err = compile_function("f", &source("a, ...a", "")).unwrap_err();
        assert_eq!(err.kind, CompilationErrorKind::DuplicateParameter);
    }

    #[test]
    fn whole_ruleset_fails_on_one_bad_function() {
        let mut ruleset = RuleSet {
            name: "default".into(),
            ..RuleSet::default()
        };
        ruleset
            .custom_functions
            .insert("good".into(), source("a", "return a;"));
        ruleset
            .custom_functions
            .insert("worse".into(), source("a", "return +;"));
        assert!(compile_custom_functions(&ruleset).is_err());
    }
}
