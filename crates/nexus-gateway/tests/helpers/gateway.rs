//! A full gateway wired to wiremock services and an in-process store.

use std::sync::Arc;
use std::time::Duration;

use nexus_gateway::cache::MemoryStore;
use nexus_gateway::clients::{HttpBillingClient, HttpDirectoryClient, ServiceEndpoints};
use nexus_gateway::metrics::detached_handle;
use nexus_gateway::{
    AggregatorConfig, AppState, InvoiceAggregator, NameResolver, ResolverConfig,
    create_router_with_state,
};
use wiremock::{MockServer, ResponseTemplate};

use super::client::TestClient;

pub struct Gateway {
    pub client: TestClient,
    pub store: Arc<MemoryStore>,
    /// Serves billing and the three directories; their paths don't overlap.
    pub services: MockServer,
}

pub async fn gateway() -> Gateway {
    let services = MockServer::start().await;
    let endpoints = ServiceEndpoints {
        employee: services.uri(),
        branch: services.uri(),
        crm: services.uri(),
        billing: services.uri(),
    };
    let timeout = Duration::from_secs(2);

    let store = Arc::new(MemoryStore::new(1_000));
    let directory = HttpDirectoryClient::new(endpoints.clone(), timeout).unwrap();
    let billing = HttpBillingClient::new(endpoints.billing, timeout).unwrap();

    let resolver = NameResolver::new(
        Arc::new(directory),
        store.clone(),
        ResolverConfig::default(),
    );
    let aggregator = InvoiceAggregator::new(
        Arc::new(billing),
        Arc::new(resolver),
        AggregatorConfig::default(),
    );

    let app = create_router_with_state(AppState::new(aggregator), detached_handle());

    Gateway {
        client: TestClient::new(app),
        store,
        services,
    }
}

/// `{ "data": { "name": ... } }` directory response.
pub fn name_body(name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": { "name": name } }))
}
