//! Process-wide tracing setup.
//!
//! Logs go to stderr; stdout is reserved for RPC responses.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when nothing else is configured.
pub const DEFAULT_LEVEL: &str = "info";

static INIT: Once = Once::new();

/// Install the global subscriber. Only the first call has any effect.
///
/// `RUST_LOG` wins over `level` when it is set and parses.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(format!("kb_vegan={level}")))
            .unwrap_or_else(|_| EnvFilter::new(format!("kb_vegan={DEFAULT_LEVEL}")));

        // Another subscriber may already be installed (e.g. by an embedding host).
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("debug");
        init("info");
        init("not-a-level");
        tracing::info!("still logging");
    }
}
