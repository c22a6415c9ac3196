//! Tracing setup for the `devspace` binary.

use tracing_subscriber::EnvFilter;

/// Logs to stderr. Default: INFO for this crate (DEBUG with `verbose`), WARN
/// for everything else. A non-empty `RUST_LOG` replaces the default.
/// Safe to call more than once.
pub fn init(verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, env.as_deref()))
        .with_writer(std::io::stderr)
        .try_init();
}

fn filter_for(verbose: bool, env: Option<&str>) -> EnvFilter {
    let defaults = if verbose {
        "warn,devspace=debug"
    } else {
        "warn,devspace=info"
    };
    let Some(directives) = env.map(str::trim).filter(|s| !s.is_empty()) else {
        return EnvFilter::new(defaults);
    };

    let filter = EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("Warning: ignoring invalid RUST_LOG ({err})");
        EnvFilter::new(defaults)
    });
    if verbose {
        filter.add_directive(
            "devspace=debug"
                .parse()
                .unwrap_or_else(|_| tracing::Level::DEBUG.into()),
        )
    } else {
        filter
    }
}
