//! # Structured Logging
//!
//! Every `postchain` run logs through `tracing` to stderr; stdout carries
//! only command output, so `postchain export > snapshot.json` stays clean.
//!
//! Two targets matter:
//!
//! ```text
//! postchain_node    command dispatch, seal deadlines, seal progress
//! postchain_ledger  enqueue/seal/message events, restore fallbacks
//! ```
//!
//! `--log-level` supplies the directives; `RUST_LOG` wins when set. Mining
//! progress is logged at debug, so `RUST_LOG=postchain_node=debug` shows it.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when neither `RUST_LOG` nor `--log-level` parse.
const FALLBACK_DIRECTIVES: &str = "warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

impl LogFormat {
    /// Like [`str::parse`], falling back to `Pretty`.
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or(LogFormat::Pretty)
    }
}

/// Pick the filter: `env_override` (the `RUST_LOG` value) if it parses,
/// then `default_level`, then [`FALLBACK_DIRECTIVES`].
fn build_filter(default_level: &str, env_override: Option<&str>) -> EnvFilter {
    env_override
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(default_level).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_DIRECTIVES))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(default_level: &str, format: LogFormat) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(default_level, env.as_deref());

    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(?format, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" text ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::from_str_lossy("yaml"), LogFormat::Pretty);
    }

    #[test]
    fn env_directives_override_cli_level() {
        let filter = build_filter("postchain_node=info", Some("postchain_ledger=debug"));
        assert!(filter.to_string().contains("postchain_ledger=debug"));
    }

    #[test]
    fn unparseable_directives_fall_back() {
        let filter = build_filter("postchain_node=info", Some("postchain_ledger=loud"));
        assert!(filter.to_string().contains("postchain_node=info"));

        let filter = build_filter("postchain_node=loud", None);
        assert_eq!(filter.to_string(), FALLBACK_DIRECTIVES);
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init_logging("postchain_node=info", LogFormat::Pretty);
        init_logging("postchain_node=info", LogFormat::Json);
    }
}
