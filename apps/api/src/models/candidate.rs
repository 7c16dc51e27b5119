use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::mapping::{Field, FieldMapping, Namespace};
use crate::models::json_type;

/// Identity assigned by the storage collaborator on save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Candidate profile must be a JSON object")]
    NotAnObject,

    #[error("Request body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

/// A candidate profile.
///
/// Built from the inbound request under the resolved (external) attribute
/// names, so `name` and `sector` are guaranteed present and non-blank.
/// `id` stays `None` until the storage collaborator has saved the record.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: Option<CandidateId>,
    pub name: String,
    pub sector: String,
    pub skills: Vec<String>,
    /// Free text ("5 years") or a number of years.
    pub experience: Option<Value>,
    pub education: Option<Value>,
    pub preferences: Option<Value>,
    /// Attributes with no mapping, carried through verbatim.
    pub extra: Map<String, Value>,
}

impl Candidate {
    /// Parses and validates a request body. Every problem is reported using
    /// the externally-visible attribute names.
    pub fn from_request(body: &Value, mapping: &FieldMapping) -> Result<Self, ValidationError> {
        let object = body.as_object().ok_or(ValidationError::NotAnObject)?;

        let mut name = None;
        let mut sector = None;
        let mut skills = Vec::new();
        let mut experience = None;
        let mut education = None;
        let mut preferences = None;
        let mut extra = Map::new();

        for (key, value) in object {
            match mapping.internal_for(Namespace::Candidate, key) {
                Some(Field::Name) => name = optional_text(key, value)?,
                Some(Field::Sector) => sector = optional_text(key, value)?,
                Some(Field::Skills) => skills = parse_skills(key, value)?,
                Some(Field::Experience) => match value {
                    Value::Null => {}
                    Value::String(_) | Value::Number(_) => experience = Some(value.clone()),
                    _ => return Err(invalid(key, "a string or a number")),
                },
                Some(Field::Education) => education = non_null(value),
                Some(Field::Preferences) => preferences = non_null(value),
                Some(Field::CandidateId) => {
                    debug!("Ignoring client-supplied '{key}'; ids are assigned by storage");
                }
                _ => {
                    extra.insert(key.clone(), value.clone());
                }
            }
        }

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push(mapping.resolve(Field::Name).to_string());
        }
        if sector.is_none() {
            missing.push(mapping.resolve(Field::Sector).to_string());
        }

        match (name, sector) {
            (Some(name), Some(sector)) => Ok(Self {
                id: None,
                name,
                sector,
                skills,
                experience,
                education,
                preferences,
                extra,
            }),
            _ => Err(ValidationError::MissingFields(missing)),
        }
    }

    /// Renders the candidate under the resolved attribute names, for storage
    /// and for the AI payload.
    pub fn to_external(&self, mapping: &FieldMapping) -> Map<String, Value> {
        let mut out = Map::new();

        if let Some(id) = &self.id {
            out.insert(
                mapping.resolve(Field::CandidateId).to_string(),
                Value::String(id.to_string()),
            );
        }
        out.insert(
            mapping.resolve(Field::Name).to_string(),
            Value::String(self.name.clone()),
        );
        out.insert(
            mapping.resolve(Field::Sector).to_string(),
            Value::String(self.sector.clone()),
        );
        out.insert(
            mapping.resolve(Field::Skills).to_string(),
            Value::Array(self.skills.iter().cloned().map(Value::String).collect()),
        );

        let optional = [
            (Field::Experience, &self.experience),
            (Field::Education, &self.education),
            (Field::Preferences, &self.preferences),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                out.insert(mapping.resolve(field).to_string(), value.clone());
            }
        }

        for (key, value) in &self.extra {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }

        out
    }
}

fn invalid(field: &str, expected: &'static str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        expected,
    }
}

fn non_null(value: &Value) -> Option<Value> {
    (!value.is_null()).then(|| value.clone())
}

/// Blank strings count as absent.
fn optional_text(field: &str, value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        _ => Err(invalid(field, "a string")),
    }
}

/// Accepts a list of strings or a single comma-separated string.
fn parse_skills(field: &str, value: &Value) -> Result<Vec<String>, ValidationError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => {
                    debug!("Rejecting skills entry of type {}", json_type(other));
                    Err(invalid(field, "a list of strings"))
                }
            })
            .filter(|skill| !matches!(skill, Ok(s) if s.is_empty()))
            .collect(),
        _ => Err(invalid(field, "a list of strings")),
    }
}
