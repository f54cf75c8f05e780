//! HTTP clients for the services that own the data the gateway aggregates.
//!
//! Every downstream call carries the caller's bearer token and expects the
//! `{ "data": ... }` envelope the services respond with.

pub mod billing;
pub mod directory;

use std::time::Duration;

use async_trait::async_trait;
use nexus_core::{EntityKind, Invoice};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use billing::HttpBillingClient;
pub use directory::HttpDirectoryClient;

/// Errors returned by the downstream clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The service answered with a non-success status.
    #[error("{url} responded with status {status}")]
    Status { status: u16, url: String },

    /// Connection refused, DNS failure, reset...
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The body did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ClientError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            Self::Decode {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Returns true if the service reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Response envelope shared by every downstream service.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Base URLs of the downstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub employee: String,
    pub branch: String,
    pub crm: String,
    pub billing: String,
}

impl ServiceEndpoints {
    /// Base URL of the service that owns names of the given kind.
    pub fn directory(&self, kind: EntityKind) -> &str {
        let url = match kind {
            EntityKind::Employee => &self.employee,
            EntityKind::Branch => &self.branch,
            EntityKind::Customer => &self.crm,
        };
        url.trim_end_matches('/')
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            employee: "http://localhost:3001".to_string(),
            branch: "http://localhost:3002".to_string(),
            crm: "http://localhost:3003".to_string(),
            billing: "http://localhost:3004".to_string(),
        }
    }
}

/// Read access to the employee, branch and customer directories.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetches the display name of one entity from its owning service.
    async fn fetch_name(&self, kind: EntityKind, id: &str, token: &str)
    -> Result<String, ClientError>;
}

/// The billing service, owner of the invoice records.
#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Lists invoices. `query` is forwarded verbatim as the query string.
    async fn list_invoices(&self, query: Option<&str>, token: &str)
    -> Result<Vec<Invoice>, ClientError>;

    async fn get_invoice(&self, id: &str, token: &str) -> Result<Invoice, ClientError>;

    /// Aggregated figures, passed through untouched.
    async fn invoice_stats(&self, query: Option<&str>, token: &str) -> Result<Value, ClientError>;

    async fn create_invoice(&self, body: &Value, token: &str) -> Result<Invoice, ClientError>;
}

/// Builds the shared reqwest client with a per-request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::from_reqwest("<client>", e))
}

/// Sends a request and unwraps the `{ data }` envelope of a 2xx response.
pub(crate) async fn send<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<T, ClientError> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| ClientError::from_reqwest(url, e))?;

    Ok(envelope.data)
}

/// Appends a raw query string to `url`.
pub(crate) fn with_query(url: String, query: Option<&str>) -> String {
    match query.map(|q| q.trim_start_matches('?')) {
        Some(q) if !q.is_empty() => format!("{url}?{q}"),
        _ => url,
    }
}
