use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::handler::{
    create_payment, deactivate_payment, get_payment, health_check, list_payments, list_pools,
    list_positions, list_unreconciled, login, process_payment, resolve_unreconciled,
    treasury_balance, treasury_deposit, treasury_withdraw, AppState,
};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Auth
                .route("/auth/login", post(login))
                // Payment registry
                .route("/payments", post(create_payment))
                .route("/payments", get(list_payments))
                .route("/payments/:id", get(get_payment))
                .route("/payments/:id/deactivate", post(deactivate_payment))
                .route("/payments/:id/process", post(process_payment))
                // Treasury
                .route("/treasury/deposit", post(treasury_deposit))
                .route("/treasury/withdraw", post(treasury_withdraw))
                .route("/treasury/balance", get(treasury_balance))
                // Liquidity
                .route("/liquidity/pools", get(list_pools))
                .route("/liquidity/positions", get(list_positions))
                // Admin
                .route("/admin/unreconciled", get(list_unreconciled))
                .route(
                    "/admin/unreconciled/:payment_id/resolve",
                    post(resolve_unreconciled),
                ),
        )
        .layer(CompressionLayer::new())
        // Allow all origins in dev, restrict in prod
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
