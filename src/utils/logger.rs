use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATE_TARGET: &str = "rebate_engine";

/// Default directives when `RUST_LOG` is not set. Verbose mode opens up
/// debug output for this crate only; dependencies stay at info.
pub fn default_directives(verbose: bool) -> String {
    if verbose {
        format!("{}=debug,info", CRATE_TARGET)
    } else {
        format!("{}=info,warn", CRATE_TARGET)
    }
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Human-readable output for terminal runs.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// One JSON object per line, for runs whose output is collected by a log
/// shipper. Report output on stdout stays clean either way.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(false)
                .flatten_event(true),
        )
        .init();
}
