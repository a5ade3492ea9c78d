pub mod assistant;
pub mod cli;
pub mod config;
pub mod console;
pub mod models;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so they do not mix with
/// the conversation on stdout.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Console host entry point.
pub async fn run(cli: cli::Cli) -> Result<(), console::ConsoleError> {
    init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = cli.resolve_config()?;
    console::run(config, &cli.record).await
}
