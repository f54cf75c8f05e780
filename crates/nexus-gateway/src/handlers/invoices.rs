//! Enriched invoice endpoints.

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use nexus_core::EnrichedInvoice;
use serde_json::Value;

use super::DataResponse;
use crate::error::AppError;
use crate::extractors::{BearerToken, CallerScope};
use crate::state::AppState;

/// GET /invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    token: BearerToken,
    CallerScope(viewer): CallerScope,
    RawQuery(query): RawQuery,
) -> Result<Json<DataResponse<Vec<EnrichedInvoice>>>, AppError> {
    let invoices = state
        .aggregator()
        .list(&viewer, query.as_deref(), token.as_str())
        .await?;

    Ok(Json(DataResponse::new(invoices)))
}

/// GET /invoices/stats
pub async fn invoice_stats(
    State(state): State<AppState>,
    token: BearerToken,
    RawQuery(query): RawQuery,
) -> Result<Json<DataResponse<Value>>, AppError> {
    let stats = state
        .aggregator()
        .stats(query.as_deref(), token.as_str())
        .await?;

    Ok(Json(DataResponse::new(stats)))
}

/// GET /invoices/{id}
pub async fn get_invoice(
    State(state): State<AppState>,
    token: BearerToken,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<EnrichedInvoice>>, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Invoice id cannot be empty".to_string()));
    }

    let invoice = state.aggregator().get(&id, token.as_str()).await?;
    Ok(Json(DataResponse::new(invoice)))
}

/// POST /invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    token: BearerToken,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<DataResponse<EnrichedInvoice>>), AppError> {
    if !body.is_object() {
        return Err(AppError::BadRequest(
            "Invoice body must be a JSON object".to_string(),
        ));
    }

    let invoice = state.aggregator().create(&body, token.as_str()).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(invoice))))
}
