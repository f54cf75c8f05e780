use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::aggregation::AggregationError;

#[derive(Debug)]
pub enum AppError {
    /// Invoice no encontrada
    NotFound { id: String },

    /// Falta o es invalido el token
    Unauthorized(String),

    /// Parametros invalidos
    BadRequest(String),

    /// Fallo del servicio de facturacion
    BadGateway(&'static str),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl From<AggregationError> for AppError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::NotFound { id } => AppError::NotFound { id },
            AggregationError::Upstream(cause) => {
                // The cause stays in the logs, the client only sees a generic message.
                error!(error = %cause, "Billing request failed");
                AppError::BadGateway("Failed to retrieve invoices")
            },
            AggregationError::Create(cause) => {
                error!(error = %cause, "Invoice creation failed");
                AppError::BadGateway("Failed to create invoice")
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::NotFound { id } => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("Invoice {} not found", id),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "Bad Gateway", msg.to_string()),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
