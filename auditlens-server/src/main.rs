//! auditlens-server binary - wires collaborators and serves the API.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use auditlens_core::{
    AuditPipeline, HttpObjectStore, HttpVisionClassifier, JsonRuleFile, MemoryVerdictStore,
    ObjectHttpConfig, RuleSetProvider, VerdictStore, VisionHttpConfig,
};
use auditlens_server::verdict_store::PostgresVerdictStore;
use auditlens_server::{create_router_with_config, AppState, Config};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auditlens_core=info,auditlens_server=info,info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env();

    let objects = match HttpObjectStore::new(ObjectHttpConfig {
        base_url: config.object_gateway_url.clone(),
        api_key: config.object_gateway_api_key.clone(),
        ..ObjectHttpConfig::default()
    }) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create object gateway client");
            std::process::exit(1);
        }
    };

    let classifier = match HttpVisionClassifier::new(VisionHttpConfig {
        base_url: config.classifier_url.clone(),
        api_key: config.classifier_api_key.clone(),
        ..VisionHttpConfig::default()
    }) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create classifier client");
            std::process::exit(1);
        }
    };

    // Postgres when DATABASE_URL is set; otherwise an in-memory store that
    // does not survive restarts (local development only).
    let verdicts: Arc<dyn VerdictStore> = match &config.database_url {
        Some(url) => match PostgresVerdictStore::new(url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to Postgres");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory verdict store");
            Arc::new(MemoryVerdictStore::new())
        }
    };

    let rules: Arc<dyn RuleSetProvider> = Arc::new(JsonRuleFile::new(&config.rules_path));

    let pipeline = Arc::new(AuditPipeline::new(
        objects,
        classifier,
        verdicts,
        Arc::clone(&rules),
        config.pipeline_config(),
    ));

    let state = AppState::new(pipeline, rules);
    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    tracing::info!("auditlens-server listening on http://{addr}");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind {addr}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
