use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::enums::*;
use crate::value::format_number;

// ─── Sheet file ─────────────────────────────────────────────────────────────

/// The JSON document bundled with a sheet's background image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpielZettelFileInfo {
    pub name: String,
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_sets: Option<Vec<RuleSet>>,
    pub elements: Vec<Element>,
    /// Additional resources; passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub res: Option<Vec<Value>>,
}

impl SpielZettelFileInfo {
    /// Looks up a ruleset by name.
    pub fn ruleset(&self, name: &str) -> Option<&RuleSet> {
        self.rule_sets
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|r| r.name == name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ─── Element ────────────────────────────────────────────────────────────────

/// One interactive field on a sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// Center point in image coordinates.
    pub position: Position,
    pub size: Size,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<StateValue>>,
    /// Ruleset name → rule source.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, String>,
}

impl Element {
    /// The rule source this element carries for `ruleset`, if any.
    pub fn rule(&self, ruleset: &str) -> Option<&str> {
        self.rules.get(ruleset).map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

// ─── Ruleset ────────────────────────────────────────────────────────────────

/// A named set of element rules plus the custom functions they may call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_functions: BTreeMap<String, CustomFunctionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lose_condition: Option<String>,
}

/// `[argListSource, bodySource]` as stored in sheet files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFunctionSource(pub String, pub String);

impl CustomFunctionSource {
    pub fn args(&self) -> &str {
        &self.0
    }

    pub fn body(&self) -> &str {
        &self.1
    }
}

// ─── Element state ──────────────────────────────────────────────────────────

/// A value an element can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum StateValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl StateValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StateValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(b) => write!(f, "{}", b),
            StateValue::Number(n) => f.write_str(&format_number(*n)),
            StateValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        StateValue::Bool(b)
    }
}

impl From<f64> for StateValue {
    fn from(n: f64) -> Self {
        StateValue::Number(n)
    }
}

impl From<i32> for StateValue {
    fn from(n: i32) -> Self {
        StateValue::Number(n as f64)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        StateValue::String(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        StateValue::String(s)
    }
}

/// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StateValue::Bool(b) => serializer.serialize_bool(*b),
            // Integral values are written without a fraction, as the web app writes them.
            StateValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            StateValue::Number(n) => serializer.serialize_f64(*n),
            StateValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Bool(b) => Ok(StateValue::Bool(b)),
            Value::Number(n) => n
                .as_f64()
                .map(StateValue::Number)
                .ok_or_else(|| serde::de::Error::custom(format!("number out of range: {}", n))),
            Value::String(s) => Ok(StateValue::String(s)),
            other => Err(serde::de::Error::custom(format!(
                "state value must be a string, number or boolean, got {}",
                other
            ))),
        }
    }
}

/// Mutable per-element override of the element's defaults.
///
/// An absent `value` means unset; an absent `disabled` means enabled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<StateValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl ElementState {
    pub fn new(id: impl Into<String>) -> Self {
        ElementState {
            id: id.into(),
            value: None,
            disabled: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<StateValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// `disabled` with absence read as enabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }
}
