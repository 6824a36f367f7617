use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; enabling `debug`
/// raises this crate's own target to `debug` and lets `RUST_LOG` override
/// the filter. With `debug` off, `RUST_LOG` is ignored so a stray
/// environment variable cannot make a host application verbose.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,glasspane=debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
}
