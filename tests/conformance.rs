mod conformance {
    pub mod common;
    mod builtins;
    mod evaluate;
    mod validate;
}
