pub mod config;
pub mod interpretation;
pub mod models;
pub mod report;

use tracing_subscriber::EnvFilter;

pub use interpretation::{DefaultInterpreter, EcgInterpreter, InterpretError};
pub use models::{EcgRecord, MeasurementDocument};
pub use report::Report;

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
/// Returns false when a global subscriber was already set.
pub fn init_tracing() -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("{} v{} ready", config::APP_NAME, config::APP_VERSION);
    }
    installed
}
