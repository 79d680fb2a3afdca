//! Quotes API
//!
//! - GET /quotes?symbol=... - Current quote (advances the replay cursor)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::types::Quote;
use crate::AppState;

/// Create the quotes router.
pub fn router() -> Router<AppState> {
    Router::new().route("/quotes", get(get_quote))
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub symbol: String,
}

/// GET /quotes?symbol=...
async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>, AppError> {
    let symbol = query.symbol.trim().to_uppercase();
    let quote = state.market_data.get_quote(&symbol)?;
    Ok(Json(quote))
}
