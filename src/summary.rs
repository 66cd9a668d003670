use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use svc_core::message::MessageMap;
use svc_core::{InvocationState, ServiceResult};

/// Resumen serializable de una invocación, sin la traza de eventos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub service: String,
    pub succeeded: bool,
    pub state: InvocationState,
    pub outputs: IndexMap<String, Value>,
    pub errors: MessageMap,
    pub warnings: MessageMap,
    pub rolled_back: bool,
}

impl From<&ServiceResult> for ResultSummary {
    fn from(r: &ServiceResult) -> Self {
        Self { service: r.service().to_string(),
               succeeded: r.succeeded(),
               state: r.state(),
               outputs: r.outputs().clone(),
               errors: r.errors().to_mapping(),
               warnings: r.warnings().to_mapping(),
               rolled_back: r.rolled_back() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use svc_adapters::services::word::build_word;

    #[test]
    fn summary_serializes_without_events() {
        let result = build_word().unwrap().run(json!({"letters": ["a"]})).unwrap();
        let v = serde_json::to_value(ResultSummary::from(&result)).unwrap();
        assert_eq!(v["succeeded"], json!(true));
        assert_eq!(v["state"], json!("succeeded"));
        assert_eq!(v["outputs"]["word"], json!("a"));
        assert!(v.get("events").is_none());
    }
}
