//! Field Mapping Table: translates the service's internal vocabulary into the
//! names agreed with the storage collaborator and the scoring service.
//!
//! Built once at startup (defaults + `FIELD_MAP_<SYMBOL>` overrides), validated
//! eagerly, then shared read-only as `Arc<FieldMapping>`. Nothing in the
//! pipeline hardcodes an external name; everything goes through `resolve()`.

use std::ffi::OsString;
use std::fmt;

use thiserror::Error;

const ENV_PREFIX: &str = "FIELD_MAP_";

/// Postgres truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

// ────────────────────────────────────────────────────────────────────────────
// Internal symbols
// ────────────────────────────────────────────────────────────────────────────

/// Which external contract a symbol belongs to. External names only need to be
/// unique within a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Candidate,
    StorageOperation,
    CareerFilter,
    AiPayload,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Namespace::Candidate => "candidate attribute",
            Namespace::StorageOperation => "storage operation",
            Namespace::CareerFilter => "career filter",
            Namespace::AiPayload => "AI payload key",
        };
        f.write_str(label)
    }
}

/// Every internal symbol the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CandidateId,
    Name,
    Sector,
    Skills,
    Experience,
    Education,
    Preferences,
    SaveCandidate,
    FetchCareers,
    UpdateRecommendations,
    GetDropdownOptions,
    CareerSector,
    AiCandidate,
    AiCareers,
}

impl Field {
    pub const COUNT: usize = 14;

    /// Declaration order; `Field as usize` indexes into this array.
    pub const ALL: [Field; Field::COUNT] = [
        Field::CandidateId,
        Field::Name,
        Field::Sector,
        Field::Skills,
        Field::Experience,
        Field::Education,
        Field::Preferences,
        Field::SaveCandidate,
        Field::FetchCareers,
        Field::UpdateRecommendations,
        Field::GetDropdownOptions,
        Field::CareerSector,
        Field::AiCandidate,
        Field::AiCareers,
    ];

    /// The symbol used in configuration (`FIELD_MAP_<SYMBOL>`, upper-cased).
    pub fn symbol(self) -> &'static str {
        match self {
            Field::CandidateId => "candidate_id",
            Field::Name => "name",
            Field::Sector => "sector",
            Field::Skills => "skills",
            Field::Experience => "experience",
            Field::Education => "education",
            Field::Preferences => "preferences",
            Field::SaveCandidate => "save_candidate",
            Field::FetchCareers => "fetch_careers",
            Field::UpdateRecommendations => "update_recommendations",
            Field::GetDropdownOptions => "get_dropdown_options",
            Field::CareerSector => "career_sector",
            Field::AiCandidate => "ai_candidate",
            Field::AiCareers => "ai_careers",
        }
    }

    pub fn namespace(self) -> Namespace {
        match self {
            Field::CandidateId
            | Field::Name
            | Field::Sector
            | Field::Skills
            | Field::Experience
            | Field::Education
            | Field::Preferences => Namespace::Candidate,
            Field::SaveCandidate
            | Field::FetchCareers
            | Field::UpdateRecommendations
            | Field::GetDropdownOptions => Namespace::StorageOperation,
            Field::CareerSector => Namespace::CareerFilter,
            Field::AiCandidate | Field::AiCareers => Namespace::AiPayload,
        }
    }

    pub fn default_external(self) -> &'static str {
        match self {
            Field::CandidateId => "id",
            Field::CareerSector => "sector",
            Field::AiCandidate => "candidate",
            Field::AiCareers => "careers",
            other => other.symbol(),
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Field> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.symbol().eq_ignore_ascii_case(symbol))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("unknown field mapping symbol '{0}'")]
    UnknownSymbol(String),

    #[error("field mapping for '{0}' is empty")]
    EmptyName(&'static str),

    #[error("{namespace} name '{external}' is mapped from both '{first}' and '{second}'")]
    DuplicateName {
        namespace: Namespace,
        external: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("storage operation '{symbol}' maps to '{external}', which is not a valid SQL identifier")]
    InvalidOperationName {
        symbol: &'static str,
        external: String,
    },

    #[error("field mapping override {0} is not valid UTF-8")]
    NotUnicode(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Table
// ────────────────────────────────────────────────────────────────────────────

/// Immutable internal → external name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    names: [String; Field::COUNT],
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            names: std::array::from_fn(|i| Field::ALL[i].default_external().to_string()),
        }
    }
}

impl FieldMapping {
    /// Applies `(symbol, external)` overrides on top of the defaults and
    /// validates the whole table.
    pub fn with_overrides<I, K, V>(overrides: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut mapping = Self::default();

        for (symbol, external) in overrides {
            let field = Field::from_symbol(symbol.as_ref())
                .ok_or_else(|| MappingError::UnknownSymbol(symbol.as_ref().to_string()))?;
            let external = external.as_ref().trim();
            if external.is_empty() {
                return Err(MappingError::EmptyName(field.symbol()));
            }
            mapping.names[field as usize] = external.to_string();
        }

        mapping.validate()?;
        Ok(mapping)
    }

    /// Reads `FIELD_MAP_<SYMBOL>=<external>` overrides from the process environment.
    pub fn from_env() -> Result<Self, MappingError> {
        Self::with_overrides(env_overrides(std::env::vars_os())?)
    }

    /// Checks every symbol resolves to a usable, unambiguous name.
    pub fn validate(&self) -> Result<(), MappingError> {
        for (i, field) in Field::ALL.iter().copied().enumerate() {
            let external = self.resolve(field);
            if external.trim().is_empty() {
                return Err(MappingError::EmptyName(field.symbol()));
            }

            if field.namespace() == Namespace::StorageOperation && !is_sql_identifier(external) {
                return Err(MappingError::InvalidOperationName {
                    symbol: field.symbol(),
                    external: external.to_string(),
                });
            }

            if let Some(earlier) = Field::ALL[..i]
                .iter()
                .copied()
                .find(|f| f.namespace() == field.namespace() && self.resolve(*f) == external)
            {
                return Err(MappingError::DuplicateName {
                    namespace: field.namespace(),
                    external: external.to_string(),
                    first: earlier.symbol(),
                    second: field.symbol(),
                });
            }
        }
        Ok(())
    }

    /// External name for an internal symbol.
    pub fn resolve(&self, field: Field) -> &str {
        &self.names[field as usize]
    }

    /// Reverse lookup: which internal symbol does `external` stand for?
    pub fn internal_for(&self, namespace: Namespace, external: &str) -> Option<Field> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.namespace() == namespace && self.resolve(*f) == external)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.iter().map(move |f| (*f, self.resolve(*f)))
    }
}

/// `name` or `schema.name`, each part `[A-Za-z_][A-Za-z0-9_]*`.
fn is_sql_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        part.len() <= MAX_IDENTIFIER_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Picks the `FIELD_MAP_*` entries out of an environment. Unrelated variables
/// are never decoded, so they may hold anything.
fn env_overrides<I>(vars: I) -> Result<Vec<(String, String)>, MappingError>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut overrides = Vec::new();
    for (key, value) in vars {
        let Some(symbol) = key.to_str().and_then(|key| key.strip_prefix(ENV_PREFIX)) else {
            continue;
        };
        let value = value
            .into_string()
            .map_err(|_| MappingError::NotUnicode(format!("{ENV_PREFIX}{symbol}")))?;
        overrides.push((symbol.to_string(), value));
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_all_matches_discriminants() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(*field as usize, i, "{field:?} out of order");
        }
    }

    #[test]
    fn test_default_table_resolves_every_symbol() {
        let mapping = FieldMapping::default();
        mapping.validate().unwrap();
        for field in Field::ALL {
            assert!(!mapping.resolve(field).is_empty(), "{field:?} unresolved");
        }
    }

    #[test]
    fn test_default_names() {
        let mapping = FieldMapping::default();
        assert_eq!(mapping.resolve(Field::CandidateId), "id");
        assert_eq!(mapping.resolve(Field::Name), "name");
        assert_eq!(mapping.resolve(Field::SaveCandidate), "save_candidate");
        assert_eq!(mapping.resolve(Field::CareerSector), "sector");
        assert_eq!(mapping.resolve(Field::AiCandidate), "candidate");
        assert_eq!(mapping.resolve(Field::AiCareers), "careers");
    }

    #[test]
    fn test_override_is_applied_case_insensitively() {
        let mapping =
            FieldMapping::with_overrides([("SAVE_CANDIDATE", "insert_candidate"), ("name", "fullName")])
                .unwrap();
        assert_eq!(mapping.resolve(Field::SaveCandidate), "insert_candidate");
        assert_eq!(mapping.resolve(Field::Name), "fullName");
        assert_eq!(mapping.resolve(Field::Sector), "sector");
    }

    #[test]
    fn test_unknown_symbol_is_rejected() {
        let err = FieldMapping::with_overrides([("salary", "pay")]).unwrap_err();
        assert_eq!(err, MappingError::UnknownSymbol("salary".to_string()));
    }

    #[test]
    fn test_blank_override_is_rejected() {
        let err = FieldMapping::with_overrides([("sector", "   ")]).unwrap_err();
        assert_eq!(err, MappingError::EmptyName("sector"));
    }

    #[test]
    fn test_duplicate_within_namespace_is_rejected() {
        let err = FieldMapping::with_overrides([("skills", "name")]).unwrap_err();
        assert!(matches!(
            err,
            MappingError::DuplicateName {
                namespace: Namespace::Candidate,
                first: "name",
                second: "skills",
                ..
            }
        ));
    }

    #[test]
    fn test_same_name_across_namespaces_is_allowed() {
        // career_sector and sector both default to "sector"
        let mapping = FieldMapping::default();
        assert_eq!(
            mapping.resolve(Field::Sector),
            mapping.resolve(Field::CareerSector)
        );
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_operation_name_must_be_sql_identifier() {
        let err =
            FieldMapping::with_overrides([("fetch_careers", "careers; DROP TABLE x")]).unwrap_err();
        assert!(matches!(err, MappingError::InvalidOperationName { symbol: "fetch_careers", .. }));

        let ok = FieldMapping::with_overrides([("fetch_careers", "recruiting.careers_by_sector")]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_reverse_lookup() {
        let mapping = FieldMapping::with_overrides([("name", "fullName")]).unwrap();
        assert_eq!(
            mapping.internal_for(Namespace::Candidate, "fullName"),
            Some(Field::Name)
        );
        assert_eq!(mapping.internal_for(Namespace::Candidate, "name"), None);
        assert_eq!(
            mapping.internal_for(Namespace::AiPayload, "careers"),
            Some(Field::AiCareers)
        );
    }

    #[test]
    fn test_sql_identifier_rules() {
        assert!(is_sql_identifier("save_candidate"));
        assert!(is_sql_identifier("_x1"));
        assert!(is_sql_identifier("app.save_candidate"));
        assert!(!is_sql_identifier("1abc"));
        assert!(!is_sql_identifier("a.b.c"));
        assert!(!is_sql_identifier("save-candidate"));
        assert!(!is_sql_identifier(""));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_overrides_ignore_non_unicode_unrelated_vars() {
        use std::os::unix::ffi::OsStringExt;

        let garbage = || OsString::from_vec(vec![0x66, 0x6f, 0x80]);
        let vars = vec![
            (garbage(), OsString::from("x")),
            (OsString::from("LANG"), garbage()),
            (OsString::from("FIELD_MAP_NAME"), OsString::from("fullName")),
        ];

        let overrides = env_overrides(vars).unwrap();
        assert_eq!(overrides, vec![("NAME".to_string(), "fullName".to_string())]);

        let mapping = FieldMapping::with_overrides(overrides).unwrap();
        assert_eq!(mapping.resolve(Field::Name), "fullName");
    }

    #[cfg(unix)]
    #[test]
    fn test_env_overrides_reject_non_unicode_value() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![(
            OsString::from("FIELD_MAP_SECTOR"),
            OsString::from_vec(vec![0x80]),
        )];
        assert!(matches!(
            env_overrides(vars),
            Err(MappingError::NotUnicode(name)) if name == "FIELD_MAP_SECTOR"
        ));
    }
}
