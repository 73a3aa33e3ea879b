use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level for the `vypis*` crates; `RUST_LOG` wins when set.
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

pub fn setup_logging(verbose: u8, quiet: bool) {
    let level = log_level(verbose, quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vypis={level},vypis_core={level},vypis_ingest={level},vypis_export={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, false), "info");
        assert_eq!(log_level(1, false), "debug");
        assert_eq!(log_level(3, false), "trace");
        assert_eq!(log_level(2, true), "error");
    }
}
