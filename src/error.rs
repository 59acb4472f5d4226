use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A structured diagnostic message produced during validation or evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(code: &str, path: Option<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: DiagnosticSeverity::Warning,
            code: code.to_string(),
            path,
            message: message.into(),
        }
    }
}

/// Error kind for document parse failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    Syntax,
    TypeMismatch,
    UnknownVariant,
}

/// Produced by `parse` when sheet or saved-state deserialization fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "{}:{}: {}", line, col, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ParseError {}

/// Produced by `validate` when a sheet violates a conformance rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub rule: String,
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.rule, self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result of validation: errors and warnings.
#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// ─── Rule language ──────────────────────────────────────────────────────────

/// A lexical or grammatical error in rule or function source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// What failed to compile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationErrorKind {
    /// A custom function's parameter list.
    ArgumentList,
    /// A custom function's body.
    FunctionBody,
    /// A custom function whose name is not an identifier.
    InvalidName,
    /// A custom function named after a context binding.
    ReservedName,
    /// A custom function declaring the same parameter twice.
    DuplicateParameter,
    /// An element rule.
    Rule,
    /// A ruleset's win or lose condition.
    Condition,
}

/// Produced when custom functions, rules or conditions cannot be compiled.
///
/// Fatal to the whole evaluation call: no rule runs and the state store is
/// left untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCompilationError {
    pub kind: CompilationErrorKind,
    /// Function name, element id or condition name.
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl RuleCompilationError {
    pub(crate) fn from_syntax(kind: CompilationErrorKind, name: &str, err: SyntaxError) -> Self {
        RuleCompilationError {
            kind,
            name: name.to_string(),
            message: err.message,
            line: Some(err.line),
            column: Some(err.column),
        }
    }
}

impl fmt::Display for RuleCompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            CompilationErrorKind::ArgumentList => "argument list of function",
            CompilationErrorKind::FunctionBody => "body of function",
            CompilationErrorKind::InvalidName | CompilationErrorKind::ReservedName => "function",
            CompilationErrorKind::DuplicateParameter => "parameters of function",
            CompilationErrorKind::Rule => "rule of element",
            CompilationErrorKind::Condition => "condition",
        };
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(
                f,
                "cannot compile {} '{}' ({}:{}): {}",
                what, self.name, line, col, self.message
            ),
            _ => write!(f, "cannot compile {} '{}': {}", what, self.name, self.message),
        }
    }
}

impl std::error::Error for RuleCompilationError {}

/// Error kind for rule runtime failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationErrorKind {
    /// Unknown identifier or function.
    Reference,
    /// Operation applied to a value of the wrong shape.
    Type,
    /// Division by zero or call depth exceeded.
    Range,
    /// `updateState` addressed an id no element has.
    UnknownElement,
    /// `updateState` received a value that cannot be stored.
    InvalidValue,
}

/// Produced when a rule throws during execution.
///
/// Mutations applied by earlier `updateState` calls of the same pass are
/// not rolled back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEvaluationError {
    pub kind: EvaluationErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
}

impl RuleEvaluationError {
    pub(crate) fn new(kind: EvaluationErrorKind, message: impl Into<String>) -> Self {
        RuleEvaluationError {
            kind,
            message: message.into(),
            element_id: None,
        }
    }

    pub(crate) fn reference(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::Reference, message)
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::Type, message)
    }

    pub(crate) fn range(message: impl Into<String>) -> Self {
        Self::new(EvaluationErrorKind::Range, message)
    }

    /// Attach the id of the element whose rule was running, unless one is
    /// already set.
    pub fn with_element(mut self, element_id: &str) -> Self {
        if self.element_id.is_none() {
            self.element_id = Some(element_id.to_string());
        }
        self
    }
}

impl fmt::Display for RuleEvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element_id {
            Some(id) => write!(f, "rule of element '{}' failed: {}", id, self.message),
            None => write!(f, "rule failed: {}", self.message),
        }
    }
}

impl std::error::Error for RuleEvaluationError {}

/// Combined error type of the rule engine entry points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleError {
    Compilation(RuleCompilationError),
    Evaluation(RuleEvaluationError),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::Compilation(e) => write!(f, "Compilation error: {}", e),
            RuleError::Evaluation(e) => write!(f, "Evaluation error: {}", e),
        }
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuleError::Compilation(e) => Some(e),
            RuleError::Evaluation(e) => Some(e),
        }
    }
}

impl From<RuleCompilationError> for RuleError {
    fn from(e: RuleCompilationError) -> Self {
        RuleError::Compilation(e)
    }
}

impl From<RuleEvaluationError> for RuleError {
    fn from(e: RuleEvaluationError) -> Self {
        RuleError::Evaluation(e)
    }
}

// ─── Session and I/O ────────────────────────────────────────────────────────

/// Serialization error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializeError {
    pub message: String,
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SerializeError {}

/// Failures of [`crate::session::Session`] operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    UnknownRuleset(String),
    UnknownElement(String),
    Rule(RuleError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnknownRuleset(name) => write!(f, "unknown ruleset '{}'", name),
            SessionError::UnknownElement(id) => write!(f, "unknown element '{}'", id),
            SessionError::Rule(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RuleError> for SessionError {
    fn from(e: RuleError) -> Self {
        SessionError::Rule(e)
    }
}

/// Combined error type for the `load` entry point.
#[derive(Clone, Debug)]
pub enum LoadError {
    Parse(ParseError),
    Validation(ValidationError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Parse(e) => write!(f, "Parse error: {}", e),
            LoadError::Validation(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}
