//! Price feed runner
//!
//! 1. Loads `.env` and `config.yaml` (defaults when the file is absent)
//! 2. Restores a stored session, if any
//! 3. Streams prices for the watchlist plus the user's held assets
//! 4. Logs every price change and the portfolio value until Ctrl+C

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use minex_client::adapters::BinanceConfig;
use minex_client::api::ApiClient;
use minex_client::config::{self, AppConfig};
use minex_client::api::Wallet;
use minex_client::core::{
    total_value, unpriced_currencies, FileTokenStore, PriceEntry, PriceFeedReconciler,
    SessionManager,
};

const CONFIG_PATH_ENV: &str = "MINEX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenvy::dotenv().ok();
    config::init_logging();

    let config = load_app_config()?;
    info!(
        api = %config.api.base_url,
        feed = %config.feed.ws_url,
        symbols = ?config.feed.symbols,
        "Configuration loaded"
    );

    let mut client = ApiClient::new(&config.api).context("building API client")?;

    let mut sessions = SessionManager::new(FileTokenStore::new(&config.session.token_path));
    match sessions.restore(&client).await {
        Ok(Some(session)) => {
            info!(user = %session.user.name, role = %session.user.role, "Logged in from stored token");
            client = session.client(&client);
        }
        Ok(None) => info!("No active session, streaming watchlist only"),
        Err(e) => warn!(error = %e, "Session restore failed, continuing logged out"),
    }

    let mut wallets: Vec<Wallet> = Vec::new();
    if client.token().is_some() {
        match client.wallets().await {
            Ok(loaded) => wallets = loaded,
            Err(e) => warn!(error = %e, message = %e.user_message(), "Could not load wallets"),
        }
    }

    // Invalid currency codes are dropped by the symbol set
    let quote_asset = config.feed.quote_asset.clone();
    let mut symbols = config.feed.symbols.clone();
    symbols.extend(
        wallets
            .iter()
            .map(|w| w.currency.clone())
            .filter(|c| !c.eq_ignore_ascii_case(&quote_asset)),
    );

    let mut reconciler = PriceFeedReconciler::new(
        Arc::new(client),
        Arc::new(BinanceConfig::from_feed_config(&config.feed)),
        config.feed.clone(),
    );
    let mut prices = reconciler.table().subscribe();
    let mut status = reconciler.status();

    reconciler.set_symbols(&symbols).await;
    info!(symbols = %reconciler.symbols(), "Price feed running");

    // Create shutdown broadcast channel
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("[SHUTDOWN] Graceful shutdown initiated");
                let _ = shutdown_tx.send(());
            }
            Err(err) => error!(error = %err, "Failed to listen for Ctrl+C signal"),
        }
    });

    let mut last_seen: BTreeMap<String, PriceEntry> = BTreeMap::new();
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            changed = prices.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = prices.borrow_and_update().clone();
                for (symbol, entry) in &snapshot.entries {
                    if last_seen.get(symbol) != Some(entry) {
                        info!(
                            symbol = %symbol,
                            price = %entry.price,
                            change_24h = %entry.change_percent_24h,
                            source = ?entry.source,
                            "Price update"
                        );
                    }
                }
                if !wallets.is_empty() {
                    info!(
                        total = %total_value(&wallets, &snapshot, &quote_asset),
                        quote = %quote_asset,
                        unpriced = ?unpriced_currencies(&wallets, &snapshot, &quote_asset),
                        "Portfolio value"
                    );
                }
                last_seen = snapshot.entries;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *status.borrow_and_update();
                info!(state = %state, "Price stream state");
            }
        }
    }

    reconciler.stop().await;
    info!("[SHUTDOWN] Clean exit");
    Ok(())
}

fn load_app_config() -> anyhow::Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let path = Path::new(&path);

    if path.exists() {
        return config::load_config(path)
            .with_context(|| format!("loading configuration from {}", path.display()));
    }

    info!(path = %path.display(), "No configuration file, using defaults");
    let mut config = AppConfig::default();
    config.apply_env_overrides();
    config.validate().context("validating default configuration")?;
    Ok(config)
}
