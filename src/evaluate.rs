//! Rule evaluation: compile a ruleset once, then run every element rule
//! against the state store until nothing changes any more.
//!
//! Each pass builds a fresh snapshot of all elements, runs the rules in
//! element definition order and applies their `updateState` effects to the
//! store immediately. Later rules of the same pass still read the snapshot
//! taken at the start of the pass, so changes propagate on the next pass.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::ast::Expr;
use crate::enums::GameOutcome;
use crate::error::*;
use crate::functions::{CustomFunctions, compile_custom_functions};
use crate::interpreter::Interpreter;
use crate::parser::parse_rule;
use crate::state::{ElementSnapshot, StateStore, snapshot};
use crate::types::{Element, RuleSet};
use crate::value::Value;

/// Diagnostic code attached when the fixed point was not reached.
pub const RECURSION_WARNING: &str = "W-RECURSION";

// ─── Options and results ────────────────────────────────────────────────────

/// Limits applied to one evaluation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluationOptions {
    /// Re-runs allowed after the initial pass.
    pub max_depth: usize,
    /// Nesting limit for custom function calls.
    pub max_call_depth: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        EvaluationOptions {
            max_depth: 50,
            max_call_depth: 64,
        }
    }
}

/// Timing and convergence information. Advisory only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationStats {
    pub passes: usize,
    pub context_time: Duration,
    pub compile_time: Duration,
    pub run_time: Duration,
    /// The last permitted pass still changed the store.
    pub depth_exhausted: bool,
    pub warnings: Vec<Diagnostic>,
}

/// Result of a successful evaluation call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationOutcome {
    /// Whether any pass modified the store.
    pub changed: bool,
    pub stats: EvaluationStats,
}

// ─── Compilation ────────────────────────────────────────────────────────────

/// A ruleset with its custom functions and the rules of every element
/// compiled, ready to run repeatedly.
#[derive(Clone, Debug)]
pub struct CompiledRuleset {
    name: String,
    functions: CustomFunctions,
    /// `(element id, rule)` in element definition order.
    rules: Vec<(String, Expr)>,
}

impl CompiledRuleset {
    /// Compiles the custom functions of `ruleset`, then the rule each element
    /// declares for it. Blank rules are skipped.
    pub fn compile(ruleset: &RuleSet, elements: &[Element]) -> Result<Self, RuleCompilationError> {
        let functions = compile_custom_functions(ruleset)?;
        let mut rules = Vec::new();
        for element in elements {
            let Some(source) = element.rule(&ruleset.name) else {
                continue;
            };
            if let Some(expr) = compile_rule(&element.id, source)? {
                rules.push((element.id.clone(), expr));
            }
        }
        Ok(CompiledRuleset {
            name: ruleset.name.clone(),
            functions,
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &CustomFunctions {
        &self.functions
    }

    /// Number of elements with a non-blank rule.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Runs passes until the store is stable or `options.max_depth` re-runs
    /// have happened.
    pub fn run(
        &self,
        elements: &[Element],
        store: &mut StateStore,
        options: &EvaluationOptions,
    ) -> Result<EvaluationOutcome, RuleEvaluationError> {
        let mut stats = EvaluationStats::default();

        let mut last_changed = self.run_pass(elements, store, options, &mut stats)?;
        let mut changed = last_changed;
        let mut reruns = 0;
        while last_changed && reruns < options.max_depth {
            last_changed = self.run_pass(elements, store, options, &mut stats)?;
            changed |= last_changed;
            reruns += 1;
        }

        if last_changed {
            warn!(ruleset = %self.name, passes = stats.passes, "unhandled (infinite) recursion");
            stats.depth_exhausted = true;
            stats.warnings.push(Diagnostic::warning(
                RECURSION_WARNING,
                Some(format!("ruleSets[{}]", self.name)),
                format!(
                    "rules still changed state after {} passes; stopped at the latest state",
                    stats.passes
                ),
            ));
        }

        Ok(EvaluationOutcome { changed, stats })
    }

    fn run_pass(
        &self,
        elements: &[Element],
        store: &mut StateStore,
        options: &EvaluationOptions,
        stats: &mut EvaluationStats,
    ) -> Result<bool, RuleEvaluationError> {
        let started = Instant::now();
        let snapshot = snapshot(elements, store);
        let elements_value = Value::Array(snapshot.iter().map(ElementSnapshot::to_value).collect());
        stats.context_time += started.elapsed();

        let started = Instant::now();
        let mut interpreter = Interpreter::new(
            &snapshot,
            &elements_value,
            &self.functions,
            Some(store),
            options.max_call_depth,
        );
        let result = self
            .rules
            .iter()
            .try_for_each(|(id, rule)| interpreter.run_rule(id, rule).map_err(|e| e.with_element(id)));
        let changed = interpreter.changed();
        stats.run_time += started.elapsed();
        stats.passes += 1;
        result?;

        debug!(ruleset = %self.name, pass = stats.passes, changed, "rule pass finished");
        Ok(changed)
    }
}

/// Compiles the rule of element `id`; `None` for blank rule text.
pub(crate) fn compile_rule(id: &str, source: &str) -> Result<Option<Expr>, RuleCompilationError> {
    parse_rule(source).map_err(|e| RuleCompilationError::from_syntax(CompilationErrorKind::Rule, id, e))
}

/// Compiles a win or lose condition; `None` when absent or blank.
pub(crate) fn compile_condition(
    name: &str,
    source: Option<&str>,
) -> Result<Option<Expr>, RuleCompilationError> {
    match source {
        Some(source) => parse_rule(source)
            .map_err(|e| RuleCompilationError::from_syntax(CompilationErrorKind::Condition, name, e)),
        None => Ok(None),
    }
}

// ─── Entry points ───────────────────────────────────────────────────────────

/// Evaluates `ruleset` against `store` with default options.
pub fn evaluate(
    ruleset: &RuleSet,
    elements: &[Element],
    store: &mut StateStore,
) -> Result<EvaluationOutcome, RuleError> {
    evaluate_with(ruleset, elements, store, &EvaluationOptions::default())
}

/// Evaluates `ruleset` against `store`.
///
/// Compilation failures leave the store untouched. A runtime failure aborts
/// the call; writes made before it stay applied.
pub fn evaluate_with(
    ruleset: &RuleSet,
    elements: &[Element],
    store: &mut StateStore,
    options: &EvaluationOptions,
) -> Result<EvaluationOutcome, RuleError> {
    let started = Instant::now();
    let compiled = CompiledRuleset::compile(ruleset, elements)?;
    let compile_time = started.elapsed();

    let mut outcome = compiled.run(elements, store, options)?;
    outcome.stats.compile_time = compile_time;

    debug!(
        ruleset = %ruleset.name,
        passes = outcome.stats.passes,
        changed = outcome.changed,
        compile_us = compile_time.as_micros() as u64,
        run_us = outcome.stats.run_time.as_micros() as u64,
        "evaluation finished"
    );
    Ok(outcome)
}

/// Decides the game outcome with default options.
pub fn evaluate_conditions(
    ruleset: &RuleSet,
    elements: &[Element],
    store: &StateStore,
) -> Result<GameOutcome, RuleError> {
    evaluate_conditions_with(ruleset, elements, store, &EvaluationOptions::default())
}

/// Decides the game outcome from the win and lose conditions of `ruleset`.
///
/// A holding lose condition wins over a holding win condition. Custom
/// functions called from a condition obey `options.max_call_depth`.
pub fn evaluate_conditions_with(
    ruleset: &RuleSet,
    elements: &[Element],
    store: &StateStore,
    options: &EvaluationOptions,
) -> Result<GameOutcome, RuleError> {
    let functions = compile_custom_functions(ruleset)?;
    let win = compile_condition("winCondition", ruleset.win_condition.as_deref())?;
    let lose = compile_condition("loseCondition", ruleset.lose_condition.as_deref())?;
    if win.is_none() && lose.is_none() {
        return Ok(GameOutcome::Undecided);
    }

    let snapshot = snapshot(elements, store);
    let elements_value = Value::Array(snapshot.iter().map(ElementSnapshot::to_value).collect());
    let mut interpreter = Interpreter::new(
        &snapshot,
        &elements_value,
        &functions,
        None,
        options.max_call_depth,
    );

    let mut holds = |condition: &Option<Expr>| -> Result<bool, RuleEvaluationError> {
        match condition {
            Some(expr) => interpreter.check_condition(expr),
            None => Ok(false),
        }
    };
    if holds(&lose)? {
        return Ok(GameOutcome::Lost);
    }
    if holds(&win)? {
        return Ok(GameOutcome::Won);
    }
    Ok(GameOutcome::Undecided)
}
