use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::debug;

use crate::mapping::{Field, FieldMapping};
use crate::models::{
    json_type, Candidate, CandidateId, Career, DropdownOptions, Recommendation,
};
use crate::storage::{CandidateStore, StorageError};

/// SQLSTATE `undefined_function`.
const UNDEFINED_FUNCTION: &str = "42883";

/// PostgreSQL storage backend.
///
/// Every operation calls a stored function whose name comes from the mapping
/// (`save_candidate`, `fetch_careers`, ... by default) and exchanges JSONB
/// documents keyed by the mapped attribute names. Function names were checked
/// to be plain SQL identifiers when the mapping was built, so interpolating
/// them into the statement is safe.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    mapping: Arc<FieldMapping>,
}

impl PgStore {
    pub fn new(pool: PgPool, mapping: Arc<FieldMapping>) -> Self {
        Self { pool, mapping }
    }

    fn function(&self, field: Field) -> &str {
        self.mapping.resolve(field)
    }
}

#[async_trait]
impl CandidateStore for PgStore {
    async fn save_candidate(&self, candidate: &Candidate) -> Result<CandidateId, StorageError> {
        let function = self.function(Field::SaveCandidate);
        let document = Value::Object(candidate.to_external(&self.mapping));

        let sql = format!("SELECT {function}($1)::text");
        let id: Option<String> = sqlx::query_scalar(&sql)
            .bind(document)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(function, e))?;

        match id {
            Some(id) if !id.trim().is_empty() => {
                debug!("{function} assigned id {id}");
                Ok(CandidateId::new(id))
            }
            _ => Err(StorageError::ContractViolation {
                operation: function.to_string(),
                problem: "no candidate id".to_string(),
            }),
        }
    }

    async fn fetch_careers(&self, sector: &str) -> Result<Vec<Career>, StorageError> {
        let function = self.function(Field::FetchCareers);

        let mut filter = Map::new();
        filter.insert(
            self.mapping.resolve(Field::CareerSector).to_string(),
            Value::String(sector.to_string()),
        );

        let sql = format!("SELECT {function}($1)::jsonb");
        let result: Option<Value> = sqlx::query_scalar(&sql)
            .bind(Value::Object(filter))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(function, e))?;

        expect_career_list(function, result)
    }

    async fn update_recommendations(
        &self,
        candidate_id: &CandidateId,
        recommendations: &[Recommendation],
    ) -> Result<(), StorageError> {
        let function = self.function(Field::UpdateRecommendations);

        let sql = format!("SELECT {function}($1, $2)");
        sqlx::query(&sql)
            .bind(candidate_id.as_str())
            .bind(Value::Array(recommendations.to_vec()))
            .execute(&self.pool)
            .await
            .map_err(|e| classify(function, e))?;

        debug!(
            "{function} stored {} recommendations for {candidate_id}",
            recommendations.len()
        );
        Ok(())
    }

    async fn get_dropdown_options(&self) -> Result<DropdownOptions, StorageError> {
        let function = self.function(Field::GetDropdownOptions);

        let sql = format!("SELECT {function}()::jsonb");
        let result: Option<Value> = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(function, e))?;

        expect_dropdown_options(function, result)
    }
}

/// Separates "the routine does not exist" and "it returned the wrong shape"
/// from ordinary database failures.
fn classify(operation: &str, error: sqlx::Error) -> StorageError {
    match error {
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNDEFINED_FUNCTION) => {
            StorageError::MissingOperation {
                operation: operation.to_string(),
            }
        }
        sqlx::Error::ColumnDecode { .. } => StorageError::ContractViolation {
            operation: operation.to_string(),
            problem: format!("an undecodable value ({error})"),
        },
        other => StorageError::Database(other),
    }
}

fn expect_career_list(operation: &str, result: Option<Value>) -> Result<Vec<Career>, StorageError> {
    match result {
        Some(Value::Array(careers)) => Ok(careers),
        Some(other) => Err(StorageError::ContractViolation {
            operation: operation.to_string(),
            problem: format!("{} instead of a list of careers", json_type(&other)),
        }),
        None => Err(StorageError::ContractViolation {
            operation: operation.to_string(),
            problem: "NULL instead of a list of careers".to_string(),
        }),
    }
}

fn expect_dropdown_options(
    operation: &str,
    result: Option<Value>,
) -> Result<DropdownOptions, StorageError> {
    let value = result.unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| StorageError::ContractViolation {
        operation: operation.to_string(),
        problem: format!("malformed dropdown options ({e})"),
    })
}
