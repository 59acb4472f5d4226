use spielzettel::enums::ElementType;
use spielzettel::types::{Element, Position, Size, StateValue};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn conformance_dir() -> PathBuf {
    std::env::var("SPIELZETTEL_CONFORMANCE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("conformance"))
}

/// Reads a suite file, or returns `None` (and says so) when it is missing.
pub fn read_suite(relative: &str) -> Option<String> {
    let path = conformance_dir().join(relative);
    if !path.exists() {
        eprintln!("Skipping {}: {:?} not found", relative, path);
        return None;
    }
    Some(std::fs::read_to_string(&path).unwrap())
}

/// Element as written in suites; geometry is irrelevant to rules.
#[derive(Debug, serde::Deserialize)]
pub struct ElementDef {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    #[serde(default)]
    pub options: Option<Vec<StateValue>>,
    #[serde(default)]
    pub rules: BTreeMap<String, String>,
}

impl ElementDef {
    pub fn to_element(&self) -> Element {
        Element {
            id: self.id.clone(),
            element_type: self.element_type,
            position: Position::default(),
            size: Size {
                width: 1.0,
                height: 1.0,
            },
            options: self.options.clone(),
            rules: self.rules.clone(),
        }
    }
}

pub fn elements(defs: &[ElementDef]) -> Vec<Element> {
    defs.iter().map(ElementDef::to_element).collect()
}

/// Snake-case name of a serde enum variant, as suites spell error kinds.
pub fn kind_name<T: serde::Serialize>(kind: &T) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
