use std::collections::BTreeMap;

use serde_json::Value;

pub mod candidate;

pub use candidate::{Candidate, CandidateId, ValidationError};

/// A career record as stored by the storage collaborator. Opaque to this service.
pub type Career = Value;

/// A scored match produced by the scoring service. Persisted verbatim.
pub type Recommendation = Value;

/// Form metadata: field name → allowed values.
pub type DropdownOptions = BTreeMap<String, Vec<String>>;

/// Short JSON type label for contract-violation messages.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
