//! `logging` installs the global `tracing` subscriber
use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// `init` installs a subscriber filtered by `RUST_LOG` when it is set, otherwise by `level`
///
/// Only the first call installs the subscriber, it returns `false` when another subscriber was
/// already installed by the host application
pub fn init(level: &str) -> bool {
    *INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .is_ok()
    })
}
