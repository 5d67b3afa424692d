//! Tracing setup for opascan entrypoints.
//!
//! [`init_tracing`] installs the global subscriber. Later calls are ignored,
//! so tests and embedders may call it freely.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested level. Everything else,
/// the AWS SDK included, logs at `warn`.
const SCAN_TARGETS: &[&str] = &["opascan", "opascan_core", "opascan_engine", "opascan_storage"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(SCAN_TARGETS.iter().map(|t| format!("{}={}", t, level)));
    directives.join(",")
}

/// Install an `EnvFilter` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`. With `json` set, each event is
/// one JSON object per line.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_scope_level_to_scan_crates() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,opascan=debug,opascan_core=debug,opascan_engine=debug,opascan_storage=debug"
        );
        assert!(default_directives(Level::INFO).parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
