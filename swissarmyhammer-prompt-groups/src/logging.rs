//! Logging utilities

use crate::config::GroupsConfig;
use serde::Serialize;
use std::fmt::Debug;
use tracing_subscriber::EnvFilter;

/// Wrapper for pretty-printing types in logs as YAML
///
/// ```ignore
/// tracing::debug!("discovered: {}", Pretty(&discovery));
/// ```
///
/// Output starts with a newline. Debug is used as a fallback if YAML
/// serialization fails.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Install a stderr fmt subscriber.
///
/// `RUST_LOG` wins over the configured directive. Returns false if a global
/// subscriber was already installed.
pub fn init_tracing(config: &GroupsConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Counts;

    #[test]
    fn test_pretty_yaml() {
        let rendered = Pretty(Counts::new(2, 3)).to_string();
        assert!(rendered.starts_with('\n'));
        assert!(rendered.contains("enabled: 2"));
        assert!(rendered.contains("total: 3"));
    }

    #[test]
    fn test_init_tracing_twice() {
        let config = GroupsConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
