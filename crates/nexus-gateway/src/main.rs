//! Nexus Gateway binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use nexus_core::KeyValueStore;
use nexus_events::{AmqpConnector, ConnectionSupervisor, InvalidationConsumer};
use nexus_gateway::cache::{MemoryStore, RedisStore};
use nexus_gateway::clients::{HttpBillingClient, HttpDirectoryClient};
use nexus_gateway::metrics::init_metrics;
use nexus_gateway::{
    AppState, CacheBackend, InvoiceAggregator, NameResolver, Settings, run_server_with_state,
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings_path = std::env::var_os("NEXUS_CONFIG").map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref()).context("failed to load settings")?;
    let addr = settings.listen_addr()?;

    tracing::info!("Starting Nexus Gateway v{}", env!("CARGO_PKG_VERSION"));

    let prometheus = init_metrics().context("failed to install metrics recorder")?;

    let store: Arc<dyn KeyValueStore> = match settings.cache.backend {
        CacheBackend::Redis => Arc::new(RedisStore::open(
            &settings.cache.url,
            settings.request_timeout(),
        )?),
        CacheBackend::Memory => {
            tracing::warn!("Using the in-process name store; it is not shared between instances");
            Arc::new(MemoryStore::new(settings.cache.memory_capacity))
        },
    };
    tracing::info!(store = store.name(), "Shared name store ready");

    // The consumer connects in the background; HTTP traffic is served meanwhile.
    let supervisor = ConnectionSupervisor::new(
        Arc::new(AmqpConnector::new(&settings.broker.url)),
        settings.broker.topology(),
        settings.broker.supervisor_config(),
    );
    let consumer = InvalidationConsumer::new(
        supervisor.clone(),
        Arc::clone(&store),
        settings.broker.consumer_config(),
    )
    .start();

    let directory = HttpDirectoryClient::new(settings.services.endpoints(), settings.request_timeout())
        .context("failed to build directory client")?;
    let billing = HttpBillingClient::new(&settings.services.billing, settings.request_timeout())
        .context("failed to build billing client")?;

    let resolver = NameResolver::new(Arc::new(directory), store, settings.resolver_config());
    let aggregator = InvoiceAggregator::new(
        Arc::new(billing),
        Arc::new(resolver),
        settings.aggregator_config(),
    );
    let state = AppState::new(aggregator).with_supervisor(supervisor);

    run_server_with_state(addr, state, prometheus).await?;

    consumer.stop();
    tracing::info!("Nexus Gateway stopped");
    Ok(())
}
