use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log to stderr so stdout carries only response JSON.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: &str) {
    let default_filter = format!("warn,ledgerq={level},ledgerq_fetch={level},ledgerq_ops={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();
}
