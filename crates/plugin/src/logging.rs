//! Log file setup
//!
//! Logs go to `d3d9-proxy.log` beside the module. The filter comes from
//! `D3D9_PROXY_LOG` when set, else from `[logging] level`.

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use d3d9_proxy_core::config::{log_path, ProxyConfig};

/// Environment variable overriding the configured filter
pub const LOG_ENV: &str = "D3D9_PROXY_LOG";

/// Effective filter directive
fn filter_directive(env: Option<String>, config: &ProxyConfig) -> String {
    env.filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| config.log_level())
}

/// Install the global subscriber; logging stays off if the file cannot be opened
#[cfg_attr(not(windows), allow(dead_code))]
pub fn init(config: &ProxyConfig) {
    let Ok(path) = log_path() else {
        return;
    };
    let Ok(file) = File::create(&path) else {
        return;
    };

    let directive = filter_directive(std::env::var(LOG_ENV).ok(), config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    tracing::debug!("Logging to {:?} with filter '{}'", path, directive);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_config() {
        let config = ProxyConfig::from_toml_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert_eq!(filter_directive(None, &config), "warn");
        assert_eq!(filter_directive(Some("trace".into()), &config), "trace");
        assert_eq!(filter_directive(Some("  ".into()), &config), "warn");
    }

    #[test]
    fn test_default_level() {
        assert_eq!(filter_directive(None, &ProxyConfig::default()), "info");
    }
}
