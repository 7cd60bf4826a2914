use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use repledger::{
    create_activity_router, create_actor_router, create_reputation_router, create_task_router,
    create_verification_router, ActivityApiState, ActivityLedger, ActorApiState, ChainBridge,
    ChainGatewayClient, ChainReconciler, ReputationApiState, ServiceConfig, Store, TaskApiState,
    VerificationApiState, VerificationWorkflow,
};

/// Depth of the fire-and-forget chain job queue.
const CHAIN_QUEUE_DEPTH: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_logging(&config);

    info!("Starting reputation ledger server");

    // Persistence, degrading to in-memory when PostgreSQL is out of reach
    let store = Arc::new(Store::connect(&config.store_config()).await);
    if !store.is_persistent() {
        info!("Running with in-memory persistence");
    }

    // Chain side: client, background bridge, reconciler
    let chain_client = Arc::new(ChainGatewayClient::new(config.chain.clone())?);
    let bridge = Arc::new(ChainBridge::start((*chain_client).clone(), CHAIN_QUEUE_DEPTH));

    let ledger = Arc::new(ActivityLedger::new(store.clone(), bridge.clone()));
    let workflow = Arc::new(VerificationWorkflow::new(store.clone()));
    let reconciler = Arc::new(ChainReconciler::new(
        store.clone(),
        chain_client.clone(),
        ledger.clone(),
    ));

    let app = Router::new()
        .nest(
            "/api/actors",
            create_actor_router(ActorApiState {
                store: store.clone(),
            }),
        )
        .nest(
            "/api/activity",
            create_activity_router(ActivityApiState {
                ledger: ledger.clone(),
            }),
        )
        .nest(
            "/api/reputation",
            create_reputation_router(ReputationApiState {
                store: store.clone(),
                reconciler: reconciler.clone(),
            }),
        )
        .nest(
            "/api/verification",
            create_verification_router(VerificationApiState { workflow }),
        )
        .nest(
            "/api/tasks",
            create_task_router(TaskApiState { ledger, reconciler }),
        )
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_addr, e))?;

    info!("Reputation ledger server listening on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &ServiceConfig) {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();
}
