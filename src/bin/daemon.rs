//! pagewatch daemon
//!
//! Long-lived entry point: loads configuration from the environment, opens
//! the state store, and polls the target page until the process is stopped.

use std::process::ExitCode;

use pagewatch::{
    error::Result,
    models::Config,
    pipeline::Watcher,
    services::{PageFetcher, TelegramNotifier},
    storage::SeenStore,
};

/// Initialize logging from the configured level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    init_logging(&config.log_level);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("Startup failed: {}", error);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;

    log::info!(
        "Watching {} every {}s",
        config.target_url,
        config.poll_delay().as_secs()
    );

    let store = SeenStore::open(&config.state_db_path)?;
    let fetcher = PageFetcher::new(&config)?;
    let notifier = TelegramNotifier::new(config.telegram.clone())?;

    // The daemon still starts when the chat is unreachable.
    if let Err(error) = notifier.announce_start().await {
        log::warn!("Startup announcement failed: {}", error);
    }

    let mut watcher = Watcher::new(&config, Box::new(fetcher), Box::new(notifier), store)?;
    watcher.run().await;

    Ok(())
}
