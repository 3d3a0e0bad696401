mod app;
mod classify;
mod dispatch;
mod keymap;
mod spotify;
mod store;
mod tracker;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc};

/// What the background tasks broadcast to the TUI.
#[derive(Debug, Clone)]
pub enum UiMessage {
    /// The shared player state has changed; receivers fetch from StateHandle.
    StateUpdated,
    /// A dispatched action's status-line label.
    Status(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = triage_core::config::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("sptriage.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("sptriage log: {}", log_path.display());

    tracing::info!("sptriage starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = triage_core::config::Config::load().unwrap_or_default();

    // ── Connect the remotes; either being unreachable is fatal up front ─────
    let api = Arc::new(
        spotify::SpotifyClient::connect(&config.spotify)
            .await
            .context("playback API authorization failed")?,
    );
    let store = Arc::new(
        store::MongoStore::connect(&config.store)
            .await
            .context("classification store connection failed")?,
    );

    // ── Shared state + channels ──────────────────────────────────────────────
    let state = triage_core::state::StateHandle::new();
    let (ui_tx, ui_rx) = broadcast::channel::<UiMessage>(64);
    let (cmd_tx, cmd_rx) = mpsc::channel::<triage_core::command::Command>(64);

    // ── Spawn tracker loop ───────────────────────────────────────────────────
    let classifier = classify::Classifier::new(
        store,
        config.cache.playlist_capacity,
        config.classify.overflow_label.clone(),
    );
    let tracker = tracker::Tracker::new(
        Arc::clone(&api) as Arc<dyn spotify::PlaybackApi>,
        classifier,
        state.clone(),
        &config.cache,
        ui_tx.clone(),
    );
    tokio::spawn(tracker.run(config.polling.tick_secs));

    // ── Spawn command dispatcher ─────────────────────────────────────────────
    let dispatcher = dispatch::Dispatcher::new(
        api as Arc<dyn spotify::PlaybackApi>,
        state.clone(),
        config.seek.clone(),
        ui_tx.clone(),
    );
    tokio::spawn(dispatcher.run(cmd_rx));

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(state, cmd_tx, config.seek.divisions);
    app.run(ui_rx).await?;

    Ok(())
}
