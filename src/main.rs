//! Operational entry point: migrates the schema, seeds the rule catalog
//! from config.toml, and runs a ledger reconciliation pass. The serving
//! surfaces (chat bot, partner API) live outside this crate and call into
//! the library.

use dotenvy::dotenv;
use loyalty_engine::core::{activity, ledger};
use loyalty_engine::{config, errors::Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load reward policy and secrets
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load application configuration: {e}"))?;

    // 4. Initialize database
    let db = config::database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    config::database::create_tables(&db).await?;

    // 5. Seed the activity rule catalog from configuration
    for rule in &app_config.rewards.rules {
        activity::upsert_rule(&db, rule).await?;
    }
    info!("Seeded {} activity rules.", app_config.rewards.rules.len());

    // 6. Reconcile cached balances against the ledger
    let report = ledger::reconcile(&db).await?;
    if report.divergences.is_empty() {
        info!(
            "Reconciliation clean: {} wallets match their ledger.",
            report.wallets_checked
        );
    } else {
        for divergence in &report.divergences {
            error!(
                user_id = %divergence.user_id,
                cached = divergence.cached_balance,
                ledger = divergence.ledger_sum,
                "Balance divergence detected"
            );
        }
        error!(
            "Reconciliation found {} divergent wallet(s) out of {}.",
            report.divergences.len(),
            report.wallets_checked
        );
    }

    Ok(())
}
