//! Name lookups against the employee, branch and CRM services.

use std::time::Duration;

use async_trait::async_trait;
use nexus_core::EntityKind;
use serde::Deserialize;

use super::{ClientError, DirectoryClient, ServiceEndpoints, http_client, send};

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: Option<String>,
}

/// reqwest implementation of [`DirectoryClient`].
#[derive(Clone)]
pub struct HttpDirectoryClient {
    client: reqwest::Client,
    endpoints: ServiceEndpoints,
}

impl HttpDirectoryClient {
    pub fn new(endpoints: ServiceEndpoints, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoints,
        })
    }

    /// URL of the read endpoint for one entity.
    pub fn url_for(&self, kind: EntityKind, id: &str) -> String {
        let base = self.endpoints.directory(kind);
        let id = urlencoding::encode(id);
        match kind {
            EntityKind::Employee => format!("{base}/employee/public/{id}"),
            EntityKind::Branch => format!("{base}/branch/{id}"),
            EntityKind::Customer => format!("{base}/customers/{id}"),
        }
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn fetch_name(
        &self,
        kind: EntityKind,
        id: &str,
        token: &str,
    ) -> Result<String, ClientError> {
        let url = self.url_for(kind, id);
        let entity: NamedEntity = send(self.client.get(&url).bearer_auth(token), &url).await?;

        match entity.name {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(ClientError::Decode {
                url,
                message: "missing name".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> HttpDirectoryClient {
        let endpoints = ServiceEndpoints {
            employee: server.uri(),
            branch: server.uri(),
            crm: server.uri(),
            billing: server.uri(),
        };
        HttpDirectoryClient::new(endpoints, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_name_per_kind() {
        let server = MockServer::start().await;
        for (route, name) in [
            ("/employee/public/e1", "Ana"),
            ("/branch/b1", "Downtown"),
            ("/customers/c1", "Jane Doe"),
        ] {
            Mock::given(method("GET"))
                .and(path(route))
                .and(header("authorization", "Bearer tok"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "data": { "name": name } })),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = client_for(&server, Duration::from_secs(2));
        assert_eq!(
            client.fetch_name(EntityKind::Employee, "e1", "tok").await.unwrap(),
            "Ana"
        );
        assert_eq!(
            client.fetch_name(EntityKind::Branch, "b1", "tok").await.unwrap(),
            "Downtown"
        );
        assert_eq!(
            client.fetch_name(EntityKind::Customer, "c1", "tok").await.unwrap(),
            "Jane Doe"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/branch/b9"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let err = client
            .fetch_name(EntityKind::Branch, "b9", "tok")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_missing_name_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customers/c1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": {} })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(2));
        let err = client
            .fetch_name(EntityKind::Customer, "c1", "tok")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/employee/public/e1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": { "name": "Ana" } }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(50));
        let err = client
            .fetch_name(EntityKind::Employee, "e1", "tok")
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout { .. }));
    }

    #[test]
    fn test_ids_are_path_encoded() {
        let client =
            HttpDirectoryClient::new(ServiceEndpoints::default(), Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url_for(EntityKind::Customer, "a/b c"),
            "http://localhost:3003/customers/a%2Fb%20c"
        );
    }
}
