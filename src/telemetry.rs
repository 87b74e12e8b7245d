//! Telemetry utilities: subscriber setup, transition timing and spans.

use crate::config::{LogFormat, LoggingConfig};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured filter. Calling this twice is harmless;
/// the second call is ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

/// Guard for timing a controller transition and recording metrics.
///
/// Records transition latency when dropped.
pub struct TransitionTimer {
    target: String,
    start: Instant,
}

impl TransitionTimer {
    /// Start timing a transition towards `target` (in `page/home/edit` notation).
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for TransitionTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_transition_latency(&self.target, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span around one controller transition.
    pub fn transition(target: &str, upgrade: bool) -> Span {
        info_span!("transition", target = %target, upgrade = upgrade)
    }

    /// Span around one debounced change flush.
    pub fn flush(since: u64) -> Span {
        info_span!("flush", since = since)
    }

    /// Span around a context acquisition.
    pub fn acquire(generation: u64, scope: &str) -> Span {
        info_span!("acquire", generation = generation, scope = %scope)
    }
}
