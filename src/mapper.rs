//! Payload mapping between application entities and the wire format.
//!
//! A mapper is supplied by the embedding application. The executor applies
//! it to JSON request bodies of POST/PUT/PATCH calls and to the final
//! response payload; arrays are mapped element by element.

use crate::error::ApiError;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Bidirectional entity <-> wire transform for one element.
pub trait PayloadMapper: Send + Sync {
    /// Entity shape -> wire shape.
    fn to_wire(&self, entity: Value) -> Result<Value, ApiError>;

    /// Wire shape -> entity shape.
    fn to_entity(&self, wire: Value) -> Result<Value, ApiError>;
}

/// Apply [`PayloadMapper::to_wire`], element-wise for arrays.
pub fn map_to_wire(mapper: &dyn PayloadMapper, value: Value) -> Result<Value, ApiError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| mapper.to_wire(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => mapper.to_wire(other),
    }
}

/// Apply [`PayloadMapper::to_entity`], element-wise for arrays.
pub fn map_to_entity(mapper: &dyn PayloadMapper, value: Value) -> Result<Value, ApiError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| mapper.to_entity(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => mapper.to_entity(other),
    }
}

/// Renames top-level object fields (entity name <-> wire name).
///
/// Fields without a mapping pass through unchanged; non-object values are
/// returned as is.
#[derive(Debug, Clone, Default)]
pub struct FieldRenameMapper {
    to_wire: HashMap<String, String>,
    to_entity: HashMap<String, String>,
}

impl FieldRenameMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, entity: impl Into<String>, wire: impl Into<String>) -> Self {
        let (entity, wire) = (entity.into(), wire.into());
        self.to_wire.insert(entity.clone(), wire.clone());
        self.to_entity.insert(wire, entity);
        self
    }

    fn rename(map: &HashMap<String, String>, value: Value) -> Value {
        match value {
            Value::Object(obj) => Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (map.get(&k).cloned().unwrap_or(k), v))
                    .collect::<Map<_, _>>(),
            ),
            other => other,
        }
    }
}

impl PayloadMapper for FieldRenameMapper {
    fn to_wire(&self, entity: Value) -> Result<Value, ApiError> {
        Ok(Self::rename(&self.to_wire, entity))
    }

    fn to_entity(&self, wire: Value) -> Result<Value, ApiError> {
        Ok(Self::rename(&self.to_entity, wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapper() -> FieldRenameMapper {
        FieldRenameMapper::new()
            .field("firstName", "first_name")
            .field("id", "user_id")
    }

    #[test]
    fn maps_single_object_both_ways() {
        let m = mapper();
        let wire = map_to_wire(&m, json!({"firstName": "Ada", "age": 36})).unwrap();
        assert_eq!(wire, json!({"first_name": "Ada", "age": 36}));
        assert_eq!(
            map_to_entity(&m, wire).unwrap(),
            json!({"firstName": "Ada", "age": 36})
        );
    }

    #[test]
    fn maps_lists_element_wise() {
        let out = map_to_entity(&mapper(), json!([{"user_id": 1}, {"user_id": 2}])).unwrap();
        assert_eq!(out, json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(map_to_wire(&mapper(), json!("x")).unwrap(), json!("x"));
    }

    struct Failing;
    impl PayloadMapper for Failing {
        fn to_wire(&self, _entity: Value) -> Result<Value, ApiError> {
            Err(ApiError::internal("cannot map"))
        }
        fn to_entity(&self, wire: Value) -> Result<Value, ApiError> {
            Ok(wire)
        }
    }

    #[test]
    fn element_failure_fails_the_list() {
        assert!(map_to_wire(&Failing, json!([1, 2])).is_err());
    }
}
