//! Invoice aggregation: fetch base records from billing and enrich them with
//! employee, branch and customer names.
//!
//! Records are independent units of work. Each one is enriched in its own
//! task with its three lookups running concurrently, and at most
//! `max_concurrent_records` records are in flight at once. A record whose
//! enrichment fails as a whole is still emitted, with every name set to
//! `"Unknown"`. The only error surfaced is a failure of the base fetch.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use nexus_core::{EnrichedInvoice, EntityKind, Invoice, ResolvedNames, Viewer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::clients::{BillingClient, ClientError};
use crate::resolver::NameResolver;

/// Errors surfaced by the aggregator.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// Billing could not provide the base records.
    #[error("billing request failed: {0}")]
    Upstream(#[source] ClientError),

    /// Billing rejected or failed an invoice creation.
    #[error("invoice creation failed: {0}")]
    Create(#[source] ClientError),

    /// Billing has no invoice with this id.
    #[error("invoice '{id}' not found")]
    NotFound { id: String },
}

/// Configuracion del agregador.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Records enriched concurrently (each issues up to three lookups).
    pub max_concurrent_records: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_records: 32,
        }
    }
}

/// Ids an invoice references, owned so enrichment can run in its own task.
struct References {
    employee: Option<String>,
    branch: Option<String>,
    customer: Option<String>,
}

impl References {
    fn of(invoice: &Invoice) -> Self {
        Self {
            employee: invoice.reference(EntityKind::Employee),
            branch: invoice.reference(EntityKind::Branch),
            customer: invoice.reference(EntityKind::Customer),
        }
    }
}

/// Combines billing records with resolved display names.
#[derive(Clone)]
pub struct InvoiceAggregator {
    billing: Arc<dyn BillingClient>,
    resolver: Arc<NameResolver>,
    config: AggregatorConfig,
}

impl InvoiceAggregator {
    pub fn new(
        billing: Arc<dyn BillingClient>,
        resolver: Arc<NameResolver>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            billing,
            resolver,
            config,
        }
    }

    /// Lists the invoices visible to `viewer`, enriched.
    ///
    /// The role filter runs before enrichment so hidden records cost no
    /// lookups.
    pub async fn list(
        &self,
        viewer: &Viewer,
        query: Option<&str>,
        token: &str,
    ) -> Result<Vec<EnrichedInvoice>, AggregationError> {
        let invoices = self
            .billing
            .list_invoices(query, token)
            .await
            .map_err(AggregationError::Upstream)?;

        let total = invoices.len();
        let visible: Vec<Invoice> = invoices
            .into_iter()
            .filter(|invoice| viewer.can_see(invoice))
            .collect();

        debug!(
            total = total,
            visible = visible.len(),
            role = ?viewer.role,
            "Invoices fetched from billing"
        );

        Ok(self.enrich_all(visible, token).await)
    }

    /// Fetches and enriches a single invoice.
    pub async fn get(&self, id: &str, token: &str) -> Result<EnrichedInvoice, AggregationError> {
        let invoice = self
            .billing
            .get_invoice(id, token)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    AggregationError::NotFound { id: id.to_string() }
                } else {
                    AggregationError::Upstream(err)
                }
            })?;

        Ok(self.enrich_one(invoice, token).await)
    }

    /// Billing statistics, passed through without enrichment.
    pub async fn stats(&self, query: Option<&str>, token: &str) -> Result<Value, AggregationError> {
        self.billing
            .invoice_stats(query, token)
            .await
            .map_err(AggregationError::Upstream)
    }

    /// Creates an invoice in billing and returns it enriched.
    pub async fn create(
        &self,
        body: &Value,
        token: &str,
    ) -> Result<EnrichedInvoice, AggregationError> {
        let invoice = self
            .billing
            .create_invoice(body, token)
            .await
            .map_err(AggregationError::Create)?;

        Ok(self.enrich_one(invoice, token).await)
    }

    /// Enriches a batch, preserving input order. Never fails.
    pub async fn enrich_all(&self, invoices: Vec<Invoice>, token: &str) -> Vec<EnrichedInvoice> {
        if invoices.is_empty() {
            return Vec::new();
        }

        let token: Arc<str> = Arc::from(token);
        let limit = self.config.max_concurrent_records.max(1);

        stream::iter(invoices)
            .map(|invoice| enrich(Arc::clone(&self.resolver), invoice, Arc::clone(&token)))
            .buffered(limit)
            .collect()
            .await
    }

    async fn enrich_one(&self, invoice: Invoice, token: &str) -> EnrichedInvoice {
        enrich(Arc::clone(&self.resolver), invoice, Arc::from(token)).await
    }
}

async fn enrich(resolver: Arc<NameResolver>, invoice: Invoice, token: Arc<str>) -> EnrichedInvoice {
    let refs = References::of(&invoice);

    let task = tokio::spawn(async move {
        let (employee_name, branch_name, customer_name) = tokio::join!(
            resolver.employee_name(refs.employee.as_deref(), &token),
            resolver.branch_name(refs.branch.as_deref(), &token),
            resolver.customer_name(refs.customer.as_deref(), &token),
        );

        ResolvedNames {
            employee_name,
            branch_name,
            customer_name,
        }
    });

    let names = match task.await {
        Ok(names) => names,
        Err(err) => {
            let invoice_id = invoice.id();
            error!(
                invoice_id = invoice_id.as_deref().unwrap_or("-"),
                error = %err,
                "Record enrichment failed, using fallback names"
            );
            ResolvedNames::unknown()
        },
    };

    EnrichedInvoice::new(invoice, names)
}
