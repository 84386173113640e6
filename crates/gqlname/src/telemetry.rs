use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::Args;

/// Installs the global subscriber. `RUST_LOG` wins over `--log` when set.
pub(crate) fn init(args: &Args) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.unwrap_or_default().filter()));

    tracing_subscriber::registry()
        .with(args.log_format())
        .with(env_filter)
        .init();
}
