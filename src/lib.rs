pub mod analysis; // Safety analysis engine: normalize, dose, interactions, aggregate
pub mod config;
pub mod db;
pub mod history; // Trends and monthly views over past reports
pub mod models;
pub mod reference; // Reference intake tables and interaction rules

use tracing_subscriber::EnvFilter;

/// Initialize tracing once; later calls are no-ops. Logs go to stderr.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
