//! TeamDrive Seat Daemon — seat pool and session admission core.
//!
//! Wires the seat ledger, license authority client, session controller,
//! cleanup sweeper, and drift reconciler together and supervises the
//! periodic loops until shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use teamdrive_core::config::AppConfig;
use teamdrive_core::error::AppError;
use teamdrive_core::events::EventBus;
use teamdrive_license::authority::LicenseAuthority;
use teamdrive_license::http::HttpLicenseAuthority;
use teamdrive_license::mock::MockLicenseAuthority;
use teamdrive_license::retry::RetryingAuthority;
use teamdrive_session::seat::ledger::SeatLedger;
use teamdrive_session::seat::limiter::SessionLimiter;
use teamdrive_session::seat::memory::MemorySeatLedger;
use teamdrive_session::seat::reconciler::DriftReconciler;
use teamdrive_session::seat::recovery::restore_from_checkouts;
use teamdrive_session::session::cleanup::SessionCleanup;
use teamdrive_session::session::controller::SessionController;
use teamdrive_session::store::{
    CheckoutStore, PgCheckoutStore, PgSessionLimitStore, PgSessionStore, PgSnapshotStore,
    SessionLimitStore, SessionStore, SnapshotStore,
};

#[tokio::main]
async fn main() {
    let env = std::env::var("TEAMDRIVE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Seat daemon error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main daemon run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        "Starting TeamDrive seat daemon v{}",
        env!("CARGO_PKG_VERSION")
    );

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = teamdrive_database::connection::DatabasePool::connect(&config.database).await?;
    teamdrive_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Repositories and stores ──────────────────────────
    let session_repo = Arc::new(
        teamdrive_database::repositories::session::SessionRepository::new(db.pool().clone()),
    );
    let checkout_repo = Arc::new(
        teamdrive_database::repositories::checkout::SeatCheckoutRepository::new(db.pool().clone()),
    );
    let limit_repo = Arc::new(
        teamdrive_database::repositories::session_limit::SessionLimitRepository::new(
            db.pool().clone(),
        ),
    );
    let snapshot_repo = Arc::new(
        teamdrive_database::repositories::pool_snapshot::PoolSnapshotRepository::new(
            db.pool().clone(),
        ),
    );

    let session_store: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(session_repo));
    let checkout_store: Arc<dyn CheckoutStore> = Arc::new(PgCheckoutStore::new(checkout_repo));
    let limit_store: Arc<dyn SessionLimitStore> = Arc::new(PgSessionLimitStore::new(limit_repo));
    let snapshot_store: Arc<dyn SnapshotStore> = Arc::new(PgSnapshotStore::new(snapshot_repo));

    // ── Step 3: License authority client ─────────────────────────
    tracing::info!(
        provider = %config.license.provider,
        "Initializing license authority client..."
    );
    let raw_authority: Arc<dyn LicenseAuthority> = match config.license.provider.as_str() {
        "mock" => {
            let mock = MockLicenseAuthority::new();
            mock.set_total_seats(&config.license.feature_name, config.license.pool.total_seats);
            Arc::new(mock)
        }
        _ => Arc::new(HttpLicenseAuthority::new(&config.license)?),
    };
    let authority: Arc<dyn LicenseAuthority> = Arc::new(RetryingAuthority::new(
        raw_authority,
        config.license.retry.clone(),
    ));

    // ── Step 4: Seat ledger with recovered state ─────────────────
    let ledger: Arc<dyn SeatLedger> = Arc::new(MemorySeatLedger::new(
        config.license.pool.total_seats,
        config.license.pool.admin_reserved,
    ));

    // Capacity comes from the authority when reachable; the configured
    // total is the fallback.
    match authority.report_state(&config.license.feature_name).await {
        Ok(external) => {
            tracing::info!(
                total_seats = external.total_seats,
                source = %external.source,
                "Seat capacity loaded from license authority"
            );
            ledger.set_total_seats(external.total_seats).await?;
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                fallback = config.license.pool.total_seats,
                "Authority unreachable at startup, using configured capacity"
            );
        }
    }

    let recovered = restore_from_checkouts(&ledger, &checkout_store).await?;
    tracing::info!(recovered = recovered, "Startup ledger recovery complete");

    // ── Step 5: Admission core ───────────────────────────────────
    let events = EventBus::default();
    let limiter = Arc::new(SessionLimiter::new(
        limit_store,
        config.session.limits.clone(),
    ));
    let controller = Arc::new(SessionController::new(
        Arc::clone(&ledger),
        Arc::clone(&authority),
        Arc::clone(&session_store),
        Arc::clone(&checkout_store),
        limiter,
        events.clone(),
        config.session.clone(),
        config.license.feature_name.clone(),
    ));

    let cleanup = SessionCleanup::new(
        Arc::clone(&controller),
        Arc::clone(&session_store),
        config.session.clone(),
    );

    let reconciler = DriftReconciler::new(
        Arc::clone(&ledger),
        Arc::clone(&authority),
        Arc::clone(&session_store),
        Arc::clone(&checkout_store),
        Arc::clone(&snapshot_store),
        events.clone(),
        config.license.feature_name.clone(),
    );

    reconciler.startup_snapshot().await?;

    // ── Step 6: Background loops ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reconcile_interval =
        std::time::Duration::from_secs(config.license.pool.reconcile_interval_seconds);
    let retention = chrono::Duration::days(config.license.pool.snapshot_retention_days as i64);

    let reconciler_task = {
        let reconciler = reconciler.clone();
        let cancel = shutdown_rx.clone();
        tokio::spawn(async move {
            reconciler.run(reconcile_interval, retention, cancel).await;
        })
    };

    let cleanup_task = {
        let cleanup = cleanup.clone();
        let cancel = shutdown_rx.clone();
        tokio::spawn(async move {
            cleanup.run(cancel).await;
        })
    };

    tracing::info!("TeamDrive seat daemon running");

    // ── Step 7: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    for handle in [reconciler_task, cleanup_task] {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(30), handle).await;
    }

    // Flush the final snapshot so the audit series brackets the process
    // lifetime.
    if let Err(e) = reconciler.shutdown_snapshot().await {
        tracing::error!(error = %e, "Failed to record shutdown snapshot");
    }

    db.close().await;
    tracing::info!("TeamDrive seat daemon shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
