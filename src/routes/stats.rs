// SPDX-License-Identifier: MIT

//! Autocomplete suggestions drawn from the caller's own record history.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/stats/suggestions", get(suggestions))
}

#[derive(Serialize)]
struct Suggestions {
    titles: Vec<String>,
    descriptions: Vec<String>,
}

/// Most frequent titles and descriptions from records the caller created,
/// each capped at 20. Other family members' records do not contribute.
async fn suggestions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Suggestions>> {
    let titles = state.db.suggest_titles(user.user_id).await?;
    let descriptions = state.db.suggest_descriptions(user.user_id).await?;
    Ok(Json(Suggestions {
        titles,
        descriptions,
    }))
}
