use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "tally=warn",
        1 => "tally=info",
        _ => "tally=debug",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `-v` when set.
pub fn init(verbosity: u8) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(0), "tally=warn");
        assert_eq!(default_directive(1), "tally=info");
        assert_eq!(default_directive(2), "tally=debug");
        assert_eq!(default_directive(7), "tally=debug");
    }
}
