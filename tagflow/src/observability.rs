//! Logging setup and timing helpers.

use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::core::Phase;

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Returns false if a
/// subscriber was already installed, which leaves the existing one in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    };
    result.is_ok()
}

/// Measures one phase execution.
#[derive(Debug)]
pub struct PhaseTimer {
    start: Instant,
    phase: Phase,
}

impl PhaseTimer {
    /// Starts timing `phase`.
    #[must_use]
    pub fn start(phase: Phase) -> Self {
        Self {
            start: Instant::now(),
            phase,
        }
    }

    /// The phase being timed.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Elapsed whole milliseconds, saturating.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
