use std::{sync::Arc, time::Duration};

use tracing::{error, info, warn};

use crate::{
    api::handler::AppState,
    auth::StaticCredentialStore,
    chain::{ChainLedger, HttpChainGateway, InMemoryChain},
    config::Config,
    dispatch::{DispatchConfig, ExecutionDispatcher, ReconcilePolicy, UnreconciledStore},
    error::AppResult,
    ledger::ReservationLedger,
    liquidity::{default_pools, PositionBook, SweepConfig, SweepCoordinator},
    registry::PaymentRegistry,
    scheduler::{PaymentPoller, PollConfig},
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    // Core state
    let registry = Arc::new(PaymentRegistry::new());
    let positions = Arc::new(PositionBook::new());
    let unreconciled = Arc::new(UnreconciledStore::new());

    // Chain collaborator
    let chain: Arc<dyn ChainLedger> = match &config.chain_gateway_url {
        Some(url) => {
            info!("✅ Chain gateway configured: {}", url);
            Arc::new(HttpChainGateway::new(url.clone()))
        }
        None => {
            warn!("⚠️  CHAIN_GATEWAY_URL not set - using in-memory chain ledger");
            Arc::new(InMemoryChain::new(0))
        }
    };

    // Seed the local ledger from the on-chain pooled balance
    let ledger = match chain.current_balance().await {
        Ok(balance) => {
            info!("✅ Pooled balance synced from chain: {}", balance);
            Arc::new(ReservationLedger::with_balance(balance))
        }
        Err(e) => {
            error!("❌ Balance sync failed ({}), starting at zero", e);
            Arc::new(ReservationLedger::new())
        }
    };

    // Execution dispatcher
    let dispatch_config = DispatchConfig {
        submit_timeout: Duration::from_millis(config.submit_timeout_ms),
        confirm_timeout: Duration::from_millis(config.confirm_timeout_ms),
        confirm_poll: Duration::from_millis(config.confirm_poll_ms),
        reconcile: ReconcilePolicy {
            initial_backoff: Duration::from_millis(config.reconcile_initial_backoff_ms),
            max_window: Duration::from_millis(config.reconcile_max_window_ms),
        },
    };
    let dispatcher = Arc::new(ExecutionDispatcher::new(
        registry.clone(),
        ledger.clone(),
        chain.clone(),
        unreconciled,
        dispatch_config,
    ));
    info!("✅ Execution dispatcher initialized");

    // Liquidity sweep coordinator
    let sweep = Arc::new(SweepCoordinator::new(
        registry.clone(),
        ledger.clone(),
        positions,
        chain.clone(),
        default_pools(),
        SweepConfig {
            horizon_ceiling_secs: config.sweep_horizon_ceiling_secs,
            min_sweep_amount: config.min_sweep_amount,
            ..SweepConfig::default()
        },
    ));
    info!("✅ Liquidity sweep coordinator initialized");

    // Background poll loop
    let poller = Arc::new(PaymentPoller::new(
        registry.clone(),
        dispatcher.clone(),
        sweep.clone(),
        PollConfig {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        },
    ));
    poller.start();
    info!(
        "✅ Payment poller started (every {}s)",
        config.poll_interval_secs
    );

    // Credential store
    let credentials = Arc::new(StaticCredentialStore::from_config(config));
    info!("✅ Credential store initialized");

    Ok(AppState {
        registry,
        ledger,
        dispatcher,
        sweep,
        credentials,
    })
}
