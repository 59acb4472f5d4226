//! Tree-walking interpreter for compiled rules and custom functions.
//!
//! The only names a rule can reach are its function's locals, `elements`
//! (the pass snapshot), the built-ins, the ruleset's custom functions and
//! `updateState`. Nothing else of the host is reachable, and without loops
//! every evaluation terminates once the call-depth limit is enforced.

use std::collections::HashMap;
use tracing::trace;

use crate::ast::*;
use crate::builtins;
use crate::error::{EvaluationErrorKind, RuleEvaluationError};
use crate::functions::{CompiledFunction, CustomFunctions};
use crate::state::{ElementSnapshot, StatePatch, StateStore};
use crate::types::StateValue;
use crate::value::{Value, format_number};

type Scope = HashMap<String, Value>;

enum Flow {
    Normal,
    Return(Value),
}

/// Execution context of one pass.
pub(crate) struct Interpreter<'a> {
    snapshot: &'a [ElementSnapshot],
    elements: &'a Value,
    functions: &'a CustomFunctions,
    /// `None` while evaluating win/lose conditions, which must not write.
    store: Option<&'a mut StateStore>,
    max_call_depth: usize,
    call_depth: usize,
    changed: bool,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(
        snapshot: &'a [ElementSnapshot],
        elements: &'a Value,
        functions: &'a CustomFunctions,
        store: Option<&'a mut StateStore>,
        max_call_depth: usize,
    ) -> Self {
        Interpreter {
            snapshot,
            elements,
            functions,
            store,
            max_call_depth,
            call_depth: 0,
            changed: false,
        }
    }

    /// Whether any `updateState` call so far modified the store.
    pub(crate) fn changed(&self) -> bool {
        self.changed
    }

    /// Runs the rule of `element_id`. An object result is applied as
    /// `updateState(element_id, result)`.
    pub(crate) fn run_rule(&mut self, element_id: &str, rule: &Expr) -> Result<(), RuleEvaluationError> {
        match self.eval(rule, &mut Scope::new())? {
            Value::Object(fields) => self.update_state(element_id, &fields),
            Value::Undefined => Ok(()),
            other => Err(RuleEvaluationError::type_error(format!(
                "rule must produce an object like {{ value, disabled }}, got {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluates `condition` for truthiness.
    pub(crate) fn check_condition(&mut self, condition: &Expr) -> Result<bool, RuleEvaluationError> {
        Ok(self.eval(condition, &mut Scope::new())?.truthy())
    }

    // ─── updateState ────────────────────────────────────────────────────────

    fn update_state(
        &mut self,
        id: &str,
        partial: &std::collections::BTreeMap<String, Value>,
    ) -> Result<(), RuleEvaluationError> {
        if !self.snapshot.iter().any(|e| e.id == id) {
            return Err(RuleEvaluationError::new(
                EvaluationErrorKind::UnknownElement,
                format!("updateState: no element with id '{}'", id),
            ));
        }
        let patch = patch_from_object(partial)?;
        let Some(store) = self.store.as_deref_mut() else {
            return Err(RuleEvaluationError::type_error(
                "updateState is not available in conditions",
            ));
        };
        if store.apply(id, patch.clone()) {
            trace!(element = id, ?patch, "state updated");
            self.changed = true;
        }
        Ok(())
    }

    fn call_update_state(&mut self, args: &[Value]) -> Result<Value, RuleEvaluationError> {
        let id = match args.first() {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(RuleEvaluationError::type_error(format!(
                    "updateState: id must be a string, got {}",
                    other.type_name()
                )));
            }
            None => return Err(RuleEvaluationError::type_error("updateState: missing id")),
        };
        match args.get(1) {
            Some(Value::Object(fields)) => self.update_state(id, fields)?,
            other => {
                return Err(RuleEvaluationError::type_error(format!(
                    "updateState: state must be an object, got {}",
                    other.map_or("undefined", Value::type_name)
                )));
            }
        }
        Ok(Value::Undefined)
    }

    // ─── Statements ─────────────────────────────────────────────────────────

    fn exec_block(&mut self, body: &[Stmt], scope: &mut Scope) -> Result<Flow, RuleEvaluationError> {
        for stmt in body {
            if let Flow::Return(value) = self.exec(stmt, scope)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, scope: &mut Scope) -> Result<Flow, RuleEvaluationError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
            }
            Stmt::Let(name, expr) => {
                let value = self.eval(expr, scope)?;
                scope.insert(name.clone(), value);
            }
            Stmt::Assign(name, expr) => {
                let value = self.eval(expr, scope)?;
                match scope.get_mut(name) {
                    Some(slot) => *slot = value,
                    None => {
                        return Err(RuleEvaluationError::reference(format!(
                            "{} is not defined",
                            name
                        )));
                    }
                }
            }
            Stmt::If(cond, then, otherwise) => {
                if self.eval(cond, scope)?.truthy() {
                    return self.exec_block(then, scope);
                } else if let Some(otherwise) = otherwise {
                    return self.exec_block(otherwise, scope);
                }
            }
            Stmt::Block(body) => return self.exec_block(body, scope),
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    // ─── Expressions ────────────────────────────────────────────────────────

    fn eval(&mut self, expr: &Expr, scope: &mut Scope) -> Result<Value, RuleEvaluationError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::Array(items) => Ok(Value::Array(self.eval_args(items, scope)?)),
            Expr::Object(fields) => {
                let mut object = std::collections::BTreeMap::new();
                for (key, value) in fields {
                    object.insert(key.clone(), self.eval(value, scope)?);
                }
                Ok(Value::Object(object))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                binary(*op, &left, &right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional(cond, then, otherwise) => {
                if self.eval(cond, scope)?.truthy() {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            Expr::Call(name, args) => {
                let args = self.eval_args(args, scope)?;
                self.call(name, &args)
            }
            Expr::Member(object, name) => {
                let object = self.eval(object, scope)?;
                member(&object, name)
            }
            Expr::Index(object, index) => {
                let object = self.eval(object, scope)?;
                let index = self.eval(index, scope)?;
                match index {
                    Value::Number(n) => index_number(&object, n),
                    other => member(&object, &other.to_string()),
                }
            }
        }
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Result<Value, RuleEvaluationError> {
        if let Some(value) = scope.get(name) {
            return Ok(value.clone());
        }
        if name == "elements" {
            return Ok(self.elements.clone());
        }
        Err(RuleEvaluationError::reference(format!("{} is not defined", name)))
    }

    fn eval_args(&mut self, args: &[Arg], scope: &mut Scope) -> Result<Vec<Value>, RuleEvaluationError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Expr(expr) => values.push(self.eval(expr, scope)?),
                Arg::Spread(expr) => match self.eval(expr, scope)? {
                    Value::Array(items) => values.extend(items),
                    Value::String(s) => values.extend(s.chars().map(|c| Value::String(c.to_string()))),
                    other => {
                        return Err(RuleEvaluationError::type_error(format!(
                            "{} is not iterable",
                            other.type_name()
                        )));
                    }
                },
            }
        }
        Ok(values)
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, RuleEvaluationError> {
        if name == "updateState" {
            return self.call_update_state(args);
        }
        let functions = self.functions;
        if let Some(function) = functions.get(name) {
            return self.call_custom(function, args);
        }
        match builtins::call(name, self.snapshot, args) {
            Some(result) => result,
            None => Err(RuleEvaluationError::reference(format!("{} is not defined", name))),
        }
    }

    fn call_custom(&mut self, function: &CompiledFunction, args: &[Value]) -> Result<Value, RuleEvaluationError> {
        if self.call_depth >= self.max_call_depth {
            return Err(RuleEvaluationError::range(format!(
                "maximum call depth of {} exceeded in {}",
                self.max_call_depth,
                function.name()
            )));
        }

        let mut scope = Scope::new();
        for (i, param) in function.params.names.iter().enumerate() {
            scope.insert(param.clone(), args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        if let Some(rest) = &function.params.rest {
            let extra = args.get(function.params.names.len()..).unwrap_or_default();
            scope.insert(rest.clone(), Value::Array(extra.to_vec()));
        }

        self.call_depth += 1;
        let flow = self.exec_block(&function.body, &mut scope);
        self.call_depth -= 1;

        Ok(match flow? {
            Flow::Return(value) => value,
            Flow::Normal => Value::Undefined,
        })
    }
}

/// Turns the object handed to `updateState` into a patch.
fn patch_from_object(
    partial: &std::collections::BTreeMap<String, Value>,
) -> Result<StatePatch, RuleEvaluationError> {
    let value = match partial.get("value") {
        None | Some(Value::Undefined) => None,
        Some(Value::Null) => Some(None),
        Some(Value::Bool(b)) => Some(Some(StateValue::Bool(*b))),
        Some(Value::String(s)) => Some(Some(StateValue::String(s.clone()))),
        Some(Value::Number(n)) if n.is_finite() => Some(Some(StateValue::Number(*n))),
        Some(Value::Number(n)) => {
            return Err(RuleEvaluationError::new(
                EvaluationErrorKind::InvalidValue,
                format!("cannot store non-finite number {}", format_number(*n)),
            ));
        }
        Some(other) => {
            return Err(RuleEvaluationError::new(
                EvaluationErrorKind::InvalidValue,
                format!("cannot store a value of type {}", other.type_name()),
            ));
        }
    };
    let disabled = match partial.get("disabled") {
        None | Some(Value::Undefined) | Some(Value::Null) => None,
        Some(flag) => Some(flag.truthy()),
    };
    Ok(StatePatch { value, disabled })
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuleEvaluationError> {
    let concat = |l: &Value, r: &Value| {
        matches!(l, Value::String(_) | Value::Array(_) | Value::Object(_))
            || matches!(r, Value::String(_) | Value::Array(_) | Value::Object(_))
    };
    Ok(match op {
        BinaryOp::Add if concat(left, right) => Value::String(format!("{}{}", left, right)),
        BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div | BinaryOp::Rem => {
            let divisor = right.to_number();
            if divisor == 0.0 {
                return Err(RuleEvaluationError::range("division by zero"));
            }
            let dividend = left.to_number();
            Value::Number(if op == BinaryOp::Div {
                dividend / divisor
            } else {
                dividend % divisor
            })
        }
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(ordering.is_some_and(|o| match op {
                BinaryOp::Lt => o.is_lt(),
                BinaryOp::LtEq => o.is_le(),
                BinaryOp::Gt => o.is_gt(),
                _ => o.is_ge(),
            }))
        }
    })
}

fn member(object: &Value, name: &str) -> Result<Value, RuleEvaluationError> {
    match object {
        Value::Undefined | Value::Null => Err(RuleEvaluationError::type_error(format!(
            "cannot read properties of {} (reading '{}')",
            object.type_name(),
            name
        ))),
        Value::Object(fields) => Ok(fields.get(name).cloned().unwrap_or(Value::Undefined)),
        Value::Array(items) if name == "length" => Ok(Value::Number(items.len() as f64)),
        Value::String(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(_) | Value::String(_) => match name.parse::<f64>() {
            Ok(n) => index_number(object, n),
            Err(_) => Ok(Value::Undefined),
        },
        Value::Bool(_) | Value::Number(_) => Ok(Value::Undefined),
    }
}

fn index_number(object: &Value, n: f64) -> Result<Value, RuleEvaluationError> {
    let slot = (n >= 0.0 && n.fract() == 0.0).then_some(n as usize);
    match object {
        Value::Array(items) => Ok(slot
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Undefined)),
        Value::String(s) => Ok(slot
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Undefined)),
        other => member(other, &format_number(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ElementType;
    use crate::parser::parse_rule;

    fn eval_str(src: &str) -> Result<Value, RuleEvaluationError> {
        let snapshot = vec![ElementSnapshot {
            id: "a".into(),
            element_type: ElementType::Number,
            value: Some(StateValue::Number(2.0)),
            disabled: false,
        }];
        let elements = Value::Array(snapshot.iter().map(ElementSnapshot::to_value).collect());
        let functions = CustomFunctions::default();
        let mut interp = Interpreter::new(&snapshot, &elements, &functions, None, 8);
        let expr = parse_rule(src).unwrap().unwrap();
        interp.eval(&expr, &mut Scope::new())
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval_str("'a' + 1").unwrap(), Value::String("a1".into()));
        assert_eq!(eval_str("7 % 4").unwrap(), Value::Number(3.0));
        assert_eq!(eval_str("true + 1").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(eval_str("0 || 'x'").unwrap(), Value::String("x".into()));
        assert_eq!(eval_str("0 && 'x'").unwrap(), Value::Number(0.0));
        assert_eq!(eval_str("undefined ?? 4").unwrap(), Value::Number(4.0));
        assert_eq!(eval_str("0 ?? 4").unwrap(), Value::Number(0.0));
    }

    #[test]
    fn snapshot_is_reachable_through_elements() {
        assert_eq!(eval_str("elements[0].value").unwrap(), Value::Number(2.0));
        assert_eq!(eval_str("elements.length").unwrap(), Value::Number(1.0));
        assert_eq!(eval_str("elements[5]").unwrap(), Value::Undefined);
        assert_eq!(eval_str("elements[0]['type']").unwrap(), Value::String("number".into()));
    }

    #[test]
    fn division_by_zero_is_a_range_error() {
        let err = eval_str("1 / 0").unwrap_err();
        assert_eq!(err.kind, EvaluationErrorKind::Range);
    }

    #[test]
    fn unknown_names_are_reference_errors() {
        assert_eq!(eval_str("window").unwrap_err().kind, EvaluationErrorKind::Reference);
        assert_eq!(eval_str("fetch('x')").unwrap_err().kind, EvaluationErrorKind::Reference);
    }

    #[test]
    fn reading_through_undefined_is_a_type_error() {
        assert_eq!(eval_str("elements[3].value").unwrap_err().kind, EvaluationErrorKind::Type);
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval_str("'b' > 'a'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("'10' < 9").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("undefined < 1").unwrap(), Value::Bool(false));
        assert_eq!(eval_str("1 == '1'").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("1 === '1'").unwrap(), Value::Bool(false));
    }

    #[test]
    fn update_state_is_refused_without_a_store() {
        let err = eval_str("updateState('a', { value: 1 })").unwrap_err();
        assert_eq!(err.kind, EvaluationErrorKind::Type);
    }
}
