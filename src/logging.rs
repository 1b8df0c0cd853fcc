//! Logging setup.
//!
//! Events go to stderr so stdout only ever carries the diagram document.
//! The filter is taken from `TSPLANT_LOG`, then `RUST_LOG`, then the
//! `--log-level` flag, and defaults to `warn`.
//!
//! ```bash
//! TSPLANT_LOG="tsplant::analysis=debug" tsplant -i 'src/**/*.ts'
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "TSPLANT_LOG";
pub const DEFAULT_LEVEL: &str = "warn";

/// Pick the filter directive from the environment and the CLI flag.
pub fn resolve_directive(
    tsplant_log: Option<String>,
    rust_log: Option<String>,
    flag: Option<&str>,
) -> String {
    tsplant_log
        .filter(|s| !s.is_empty())
        .or_else(|| rust_log.filter(|s| !s.is_empty()))
        .or_else(|| flag.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Install the global subscriber.
///
/// Returns an error when the directive does not parse or a subscriber is
/// already installed.
pub fn init_logging(level: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let directive = resolve_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        level,
    );
    let filter = EnvFilter::try_new(&directive)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;
    Ok(())
}
