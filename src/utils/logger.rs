use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// `RUST_LOG` wins over the crate default.
fn env_filter(default_directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives))
}

/// Human-readable logs on stderr, keeping stdout for the JSON results.
pub fn init_cli_logger(verbose: bool) {
    let directives = if verbose {
        "qgis_form_expr=debug,info"
    } else {
        "qgis_form_expr=info,warn"
    };

    tracing_subscriber::registry()
        .with(env_filter(directives))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .without_time()
                .compact(),
        )
        .init();
}

/// JSON lines on stderr, for running behind a log collector.
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter("qgis_form_expr=info,warn"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true),
        )
        .init();
}
