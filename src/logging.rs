//! Diagnostic logging via `tracing`.
//!
//! Status output for users goes through [`crate::ui`]; this is for
//! diagnostics only and writes to stderr. `RUST_LOG` overrides the level
//! chosen here.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// `warn` by default, `debug` with `-v`, `trace` with `-vv`.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("warn,kbuild={level},kb={level}"))
    })
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init(verbosity: u8) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .without_time();
    let _ = tracing_subscriber::registry()
        .with(env_filter(level_for(verbosity)))
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), Level::WARN);
        assert_eq!(level_for(1), Level::DEBUG);
        assert_eq!(level_for(5), Level::TRACE);
    }
}
