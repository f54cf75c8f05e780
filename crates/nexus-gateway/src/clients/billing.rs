//! Invoice reads and writes against the billing service.

use std::time::Duration;

use async_trait::async_trait;
use nexus_core::Invoice;
use serde_json::Value;
use tracing::warn;

use super::{BillingClient, ClientError, http_client, send, with_query};

/// reqwest implementation of [`BillingClient`].
#[derive(Clone)]
pub struct HttpBillingClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBillingClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
        })
    }

    fn invoices_url(&self) -> String {
        format!("{}/invoices", self.base_url)
    }
}

#[async_trait]
impl BillingClient for HttpBillingClient {
    async fn list_invoices(
        &self,
        query: Option<&str>,
        token: &str,
    ) -> Result<Vec<Invoice>, ClientError> {
        let url = with_query(self.invoices_url(), query);
        let records: Vec<Value> = send(self.client.get(&url).bearer_auth(token), &url).await?;

        // Un registro que no es objeto no puede llevar nombres; se descarta
        // sin tumbar el listado.
        let mut invoices = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match Invoice::try_from(record) {
                Ok(invoice) => invoices.push(invoice),
                Err(other) => warn!(
                    url = %url,
                    index = index,
                    record = %other,
                    "Skipping non-object invoice record"
                ),
            }
        }
        Ok(invoices)
    }

    async fn get_invoice(&self, id: &str, token: &str) -> Result<Invoice, ClientError> {
        let url = format!("{}/{}", self.invoices_url(), urlencoding::encode(id));
        send(self.client.get(&url).bearer_auth(token), &url).await
    }

    async fn invoice_stats(&self, query: Option<&str>, token: &str) -> Result<Value, ClientError> {
        let url = with_query(format!("{}/stats", self.invoices_url()), query);
        send(self.client.get(&url).bearer_auth(token), &url).await
    }

    async fn create_invoice(&self, body: &Value, token: &str) -> Result<Invoice, ClientError> {
        let url = self.invoices_url();
        send(self.client.post(&url).bearer_auth(token).json(body), &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::EntityKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> HttpBillingClient {
        HttpBillingClient::new(server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_list_forwards_query_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/invoices"))
            .and(query_param("status", "paid"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": 1, "employeeId": "e1", "branchId": 7, "total": 120.5 },
                    { "id": "2", "customerId": "c1" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let invoices = client(&server)
            .await
            .list_invoices(Some("status=paid"), "tok")
            .await
            .unwrap();

        assert_eq!(invoices.len(), 2);
        assert_eq!(invoices[0].id().as_deref(), Some("1"));
        assert_eq!(invoices[0].get("id"), Some(&json!(1)));
        assert_eq!(invoices[0].reference(EntityKind::Branch).as_deref(), Some("7"));
        assert_eq!(invoices[0].get("total"), Some(&json!(120.5)));
        assert_eq!(invoices[1].reference(EntityKind::Customer).as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_list_survives_records_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/invoices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": 1, "employeeId": "e1" },
                    { "employeeId": "e2", "total": 5 },
                    { "id": { "legacy": 3 }, "branchId": "" },
                    "garbage",
                    { "id": "4", "customerId": null }
                ]
            })))
            .mount(&server)
            .await;

        let invoices = client(&server)
            .await
            .list_invoices(None, "tok")
            .await
            .unwrap();

        assert_eq!(invoices.len(), 4);
        assert_eq!(invoices[1].id(), None);
        assert_eq!(invoices[1].reference(EntityKind::Employee).as_deref(), Some("e2"));
        assert_eq!(invoices[2].id(), None);
        assert_eq!(invoices[2].get("branchId"), Some(&json!("")));
        assert_eq!(invoices[3].get("customerId"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_get_missing_invoice() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/invoices/42"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .get_invoice("42", "tok")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stats_passthrough() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/invoices/stats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "count": 3, "total": 99 } })),
            )
            .mount(&server)
            .await;

        let stats = client(&server)
            .await
            .invoice_stats(None, "tok")
            .await
            .unwrap();
        assert_eq!(stats, json!({ "count": 3, "total": 99 }));
    }

    #[tokio::test]
    async fn test_create_posts_body() {
        let server = MockServer::start().await;
        let body = json!({ "employeeId": "e1", "amount": 10 });
        Mock::given(method("POST"))
            .and(path("/invoices"))
            .and(body_json(body.clone()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": { "id": "new", "employeeId": "e1", "amount": 10 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server)
            .await
            .create_invoice(&body, "tok")
            .await
            .unwrap();
        assert_eq!(created.id().as_deref(), Some("new"));
        assert_eq!(created.reference(EntityKind::Employee).as_deref(), Some("e1"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Nothing listens on port 9 (discard) in the test environment.
        let client = HttpBillingClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.list_invoices(None, "tok").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport { .. } | ClientError::Timeout { .. }
        ));
    }
}
