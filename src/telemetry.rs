// Tracing setup for the binary

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured filter. Logs go to
/// stderr so command output on stdout stays clean. Calling this twice is
/// harmless; the second subscriber is dropped.
pub fn init_tracing(filter: &str) {
    let directive = std::env::var("RUST_LOG").unwrap_or_else(|_| filter.to_string());
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
