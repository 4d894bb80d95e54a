use serde::Serialize;
use serde_json::{Map, Value};

use super::as_integer;

/// Objects that may carry an event's `createdAt`, highest priority first.
const TIMESTAMP_CONTAINERS: [&str; 4] = ["entity", "withdrawal", "bet", "card"];

/// Creation time (Unix seconds) of an event document.
///
/// The first container in [`TIMESTAMP_CONTAINERS`] holding a numeric
/// `createdAt` wins; otherwise a top-level `createdAt` is used. Documents with
/// none of these resolve to 0.
pub fn extract_created_at(source: &Map<String, Value>) -> i64 {
    TIMESTAMP_CONTAINERS
        .iter()
        .find_map(|key| {
            source
                .get(*key)
                .and_then(Value::as_object)
                .and_then(|object| object.get("createdAt"))
                .and_then(as_integer)
        })
        .or_else(|| source.get("createdAt").and_then(as_integer))
        .unwrap_or(0)
}

/// One event document returned by an activity index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    index: String,
    created_at: i64,
    source: Map<String, Value>,
}

impl ActionRecord {
    pub fn new(index: impl Into<String>, source: Map<String, Value>) -> Self {
        let created_at = extract_created_at(&source);
        Self {
            index: index.into(),
            created_at,
            source,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn source(&self) -> &Map<String, Value> {
        &self.source
    }
}

pub fn created_at_of(action: Option<&ActionRecord>) -> i64 {
    action.map_or(0, ActionRecord::created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn nested_containers_follow_priority_order() {
        let source = doc(json!({
            "card": { "createdAt": 400 },
            "bet": { "createdAt": 300 },
            "withdrawal": { "createdAt": 200 },
            "createdAt": 100
        }));
        assert_eq!(extract_created_at(&source), 200);

        let source = doc(json!({
            "entity": { "createdAt": 500 },
            "withdrawal": { "createdAt": 200 }
        }));
        assert_eq!(extract_created_at(&source), 500);
    }

    #[test]
    fn container_without_timestamp_is_skipped() {
        let source = doc(json!({
            "entity": { "amount": 10 },
            "card": { "createdAt": 1_700_000_000 }
        }));
        assert_eq!(extract_created_at(&source), 1_700_000_000);
    }

    #[test]
    fn flat_timestamp_is_the_fallback() {
        let source = doc(json!({ "createdAt": 1_650_000_000.0, "bonus": "spins" }));
        assert_eq!(extract_created_at(&source), 1_650_000_000);
    }

    #[test]
    fn unrecognised_documents_resolve_to_zero() {
        assert_eq!(extract_created_at(&doc(json!({ "updatedAt": 5 }))), 0);
        assert_eq!(extract_created_at(&doc(json!({ "bet": "x" }))), 0);
        assert_eq!(extract_created_at(&doc(json!({ "createdAt": "2024-01-01" }))), 0);
    }

    #[test]
    fn record_keeps_source_and_timestamp() {
        let record = ActionRecord::new(
            "sport-bets",
            doc(json!({ "bet": { "createdAt": 42, "stake": 3.5 } })),
        );
        assert_eq!(record.index(), "sport-bets");
        assert_eq!(record.created_at(), 42);
        assert_eq!(record.source()["bet"]["stake"], json!(3.5));
        assert_eq!(created_at_of(Some(&record)), 42);
        assert_eq!(created_at_of(None), 0);
    }
}
