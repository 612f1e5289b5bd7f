//! Tracing subscriber setup
//!
//! The library only emits events; hosts decide whether to install a
//! subscriber. `RUST_LOG` always wins over the fallback filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "mupdf_envelope=info";

/// Install the default subscriber. Returns `false` if one was already set.
pub fn init() -> bool {
    init_with(DEFAULT_FILTER)
}

pub fn init_with(filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
