//! HTTP handlers.

pub mod health;
pub mod invoices;
pub mod metrics;

use serde::Serialize;

/// `{ "data": ... }` envelope, same shape the downstream services use.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
