use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use garble_core::Config;
use garble_engine::providers::{FileSourceFeed, HttpPublisher, LibreTranslateClient};
use garble_engine::{
    ChainExecutor, CircuitBreaker, Coordinator, DurableState, QualityGate, RetryOrchestrator,
    run_locked_tick, start_tick_runner,
};
use garble_store::DataPaths;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;
    let settings = &config.settings;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| settings.logging.level.clone().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Configuration loaded (strategy: {}, translator: {})",
        config.default_strategy(),
        settings.translator.base_url
    );

    let paths = DataPaths::new(settings.data_dir()?);
    info!("Data directory: {}", paths.root().display());

    // Collaborators
    let translator = Arc::new(LibreTranslateClient::new(
        settings.translator.base_url.clone(),
        config.translator_api_key().map(str::to_string),
        Duration::from_secs(settings.translator.timeout_seconds),
    )?);
    let publisher_url = settings
        .publisher
        .url
        .clone()
        .ok_or("publisher.url is not configured")?;
    let publisher_token = config
        .publisher_token()
        .ok_or("GARBLE_PUBLISHER_TOKEN is not set")?;
    let publisher = Arc::new(HttpPublisher::new(
        publisher_url,
        publisher_token,
        Duration::from_secs(settings.publisher.timeout_seconds),
    )?);
    let source_path = settings
        .sources
        .path
        .clone()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| paths.root().join("sources.json"));
    info!("Reading source items from {}", source_path.display());
    let feed = Arc::new(FileSourceFeed::new(source_path));

    // Chain, gate and retry
    let breaker = Arc::new(CircuitBreaker::new(
        settings.breaker.failure_threshold,
        Duration::from_secs(settings.breaker.cooldown_days * 24 * 60 * 60),
    ));
    let chain = ChainExecutor::new(translator.clone(), breaker, &settings.chain);
    let gate = QualityGate::new(translator, settings.quality.clone());
    let orchestrator = RetryOrchestrator::new(chain, gate, settings);

    let state = DurableState::open(&paths, &settings.publish);
    let mut coordinator = Coordinator::new(
        orchestrator,
        publisher,
        feed,
        state,
        settings.publish.clone(),
    );

    if std::env::args().nth(1).as_deref() == Some("once") {
        match run_locked_tick(&mut coordinator, &paths.lock_file()).await {
            Some(outcome) => info!("Single tick finished: {outcome:?}"),
            None => info!("Another instance is running, nothing done"),
        }
        return Ok(());
    }

    let tick = Duration::from_secs(settings.scheduler.tick_minutes.max(1) * 60);
    let runner = start_tick_runner(coordinator, paths.lock_file(), tick);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    runner.abort();
    Ok(())
}
