//! Cache key derivation.

use crate::types::Params;
use serde_json::{Map, Value};

/// Derive the cache key of one call: `endpoint_id:path_json:query_json`.
///
/// Object keys are sorted at every nesting level before serialization, so two
/// logically equal parameter sets produce the same key no matter how they
/// were constructed.
pub fn build_cache_key(endpoint_id: &str, path: &Params, query: &Params) -> String {
    format!(
        "{endpoint_id}:{}:{}",
        canonical_params(path),
        canonical_params(query)
    )
}

fn canonical_params(params: &Params) -> String {
    let object: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), canonical(v)))
        .collect();
    Value::Object(object).to_string()
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
