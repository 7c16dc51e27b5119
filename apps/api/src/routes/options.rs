use std::sync::Arc;

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::mapping::Field;
use crate::models::DropdownOptions;
use crate::resilience::with_timeout;
use crate::state::AppState;

/// GET /api/v1/options
///
/// Form metadata (allowed sectors, education levels, ...) straight from storage.
pub async fn handle_dropdown_options(
    State(state): State<AppState>,
) -> Result<Json<DropdownOptions>, AppError> {
    let store = Arc::clone(&state.store);
    let options = with_timeout(
        async move { store.get_dropdown_options().await.map_err(AppError::from) },
        state.config.storage_timeout,
        state.mapping.resolve(Field::GetDropdownOptions),
    )
    .await?;

    Ok(Json(options))
}
