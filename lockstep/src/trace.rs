//! Diagnostic sink for worker threads.
//!
//! Enable with `--features tracing`. Without the feature every macro below
//! expands to nothing, so queue and clock hot paths carry no logging cost.

/// Default `EnvFilter` directive used when `RUST_LOG` is unset.
#[cfg(feature = "tracing")]
const DEFAULT_DIRECTIVE: &str = "lockstep=trace";

/// Installs a global subscriber that prints worker events with thread names.
///
/// Honors `RUST_LOG`; falls back to `lockstep=trace`. Calling it more than
/// once is harmless: later calls leave the first subscriber in place.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    init_tracing_with(DEFAULT_DIRECTIVE);
}

/// Like [`init_tracing`], but with an explicit fallback filter directive.
#[cfg(feature = "tracing")]
pub fn init_tracing_with(directive: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

/// No-op without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

/// No-op without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub const fn init_tracing_with(_directive: &str) {}

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub(crate) use tracing::{debug, error, info, trace, warn};

// Swallows any tracing-style invocation, including `field = %value` syntax.
#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as debug;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as error;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as info;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as trace;
#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use discard as warn;
