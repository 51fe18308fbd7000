//! IRL Check-in API
//!
//! HTTP service for the IRL location rewards program: wallets check in
//! at checkpoints and geographic locations, earn points, and appear on
//! the leaderboard.
//!
//! # Architecture
//!
//! 1. Address validation per chain family (`irl-address`, pure)
//! 2. Admission policy: per-UTC-day checkpoint limit (`policy`)
//! 3. Ledger: transactional check-in recording + atomic point
//!    increments (`store`, Postgres or in-memory dev backend)
//! 4. axum routes producing one `{ success, data?, error? }` envelope
//!
//! # Running
//!
//! ```bash
//! # Dev mode (in-memory ledger, seeded checkpoints):
//! RUST_LOG=info cargo run -p irl-api
//!
//! # Against Postgres:
//! DATABASE_URL=postgres://localhost/irl RUST_LOG=info cargo run -p irl-api
//! ```

mod config;
mod error;
mod models;
mod policy;
mod routes;
mod store;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::routes::AppState;
use crate::store::memory::MemLedger;
use crate::store::postgres::PgLedger;
use crate::store::Ledger;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    info!("IRL check-in API starting...");

    let config = config::load_config();
    info!(
        "bind={}, max_checkins_per_day={}, location_points={}",
        config.bind_addr, config.max_checkins_per_day, config.location_points_value
    );

    let ledger: Arc<dyn Ledger> = match config.database_url.as_deref() {
        Some(url) => match PgLedger::connect(url).await {
            Ok(ledger) => {
                info!("Connected to Postgres, migrations applied");
                Arc::new(ledger)
            }
            Err(e) => {
                error!("Database connection failed: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("No database_url configured; using in-memory ledger (dev mode)");
            let mem = MemLedger::new();
            for seed in &config.seed_checkpoints {
                let checkpoint = mem.seed_checkpoint(seed).await;
                info!(
                    "Seeded checkpoint {} ({} pts, {})",
                    checkpoint.slug, checkpoint.points_value, checkpoint.chain
                );
            }
            Arc::new(mem)
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        ledger,
        config: Arc::new(config),
    };
    let app = routes::router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
