//! An opened sheet: its definition, the selected ruleset and the live state.

use tracing::debug;

use crate::dispatch::{
    DispatchContext, DispatchOutcome, InputPrompt, Point, dispatch, set_element_value,
};
use crate::enums::GameOutcome;
use crate::error::SessionError;
use crate::evaluate::{
    EvaluationOptions, EvaluationOutcome, evaluate_conditions_with, evaluate_with,
};
use crate::state::{StateStore, prune_states};
use crate::types::{ElementState, RuleSet, SpielZettelFileInfo, StateValue};

/// One sheet being filled in.
///
/// Every mutation takes `&mut self`, so edits and evaluations never
/// interleave.
#[derive(Clone, Debug)]
pub struct Session {
    sheet: SpielZettelFileInfo,
    ruleset: Option<String>,
    store: StateStore,
    options: EvaluationOptions,
}

impl Session {
    /// Opens `sheet` with empty state and no ruleset selected.
    pub fn open(sheet: SpielZettelFileInfo) -> Self {
        Self::restore(sheet, Vec::new())
    }

    /// Opens `sheet` with previously saved state.
    pub fn restore(sheet: SpielZettelFileInfo, saved: Vec<ElementState>) -> Self {
        Session {
            sheet,
            ruleset: None,
            store: StateStore::from_states(saved),
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sheet(&self) -> &SpielZettelFileInfo {
        &self.sheet
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn active_ruleset(&self) -> Option<&RuleSet> {
        self.ruleset.as_deref().and_then(|name| self.sheet.ruleset(name))
    }

    /// Activates the ruleset `name` and evaluates it.
    pub fn select_ruleset(&mut self, name: &str) -> Result<EvaluationOutcome, SessionError> {
        if self.sheet.ruleset(name).is_none() {
            return Err(SessionError::UnknownRuleset(name.to_string()));
        }
        self.ruleset = Some(name.to_string());
        debug!(ruleset = name, "ruleset selected");
        self.evaluate()
    }

    /// Deactivates rules; the state stays as it is.
    pub fn clear_ruleset(&mut self) {
        self.ruleset = None;
    }

    /// Re-evaluates the active ruleset. Without one nothing changes.
    pub fn evaluate(&mut self) -> Result<EvaluationOutcome, SessionError> {
        let Some(ruleset) = self.ruleset.as_deref().and_then(|name| self.sheet.ruleset(name)) else {
            return Ok(EvaluationOutcome::default());
        };
        Ok(evaluate_with(ruleset, &self.sheet.elements, &mut self.store, &self.options)?)
    }

    /// Handles a click at `point` on a canvas drawn at `scale`.
    pub fn click(
        &mut self,
        point: Point,
        scale: f64,
        prompt: &mut dyn InputPrompt,
    ) -> Result<DispatchOutcome, SessionError> {
        let ctx = self.context();
        Ok(dispatch(ctx, point, scale, prompt)?)
    }

    /// Sets or clears the value of element `id`, then evaluates.
    pub fn set_value(
        &mut self,
        id: &str,
        value: Option<StateValue>,
    ) -> Result<DispatchOutcome, SessionError> {
        let element = self
            .sheet
            .elements
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| SessionError::UnknownElement(id.to_string()))?;
        let ctx = DispatchContext {
            elements: &self.sheet.elements,
            ruleset: self.ruleset.as_deref().and_then(|name| self.sheet.ruleset(name)),
            store: &mut self.store,
            options: self.options,
        };
        Ok(set_element_value(ctx, element, value)?)
    }

    /// The pruned state list, ready to persist.
    pub fn saved_state(&self) -> Vec<ElementState> {
        prune_states(self.store.states())
    }

    /// Clears all state and re-evaluates.
    pub fn reset(&mut self) -> Result<EvaluationOutcome, SessionError> {
        self.store.clear();
        self.evaluate()
    }

    /// Win/lose verdict of the active ruleset.
    pub fn outcome(&self) -> Result<GameOutcome, SessionError> {
        match self.active_ruleset() {
            Some(ruleset) => Ok(evaluate_conditions_with(
                ruleset,
                &self.sheet.elements,
                &self.store,
                &self.options,
            )?),
            None => Ok(GameOutcome::Undecided),
        }
    }

    fn context(&mut self) -> DispatchContext<'_> {
        DispatchContext {
            elements: &self.sheet.elements,
            ruleset: self.ruleset.as_deref().and_then(|name| self.sheet.ruleset(name)),
            store: &mut self.store,
            options: self.options,
        }
    }
}
