use postbox_core::CoreConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub rpc_port: u16,
    pub window_capacity: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    relay: RelaySection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_http_port")]
    http_port: u16,
    #[serde(default = "default_rpc_port")]
    rpc_port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            rpc_port: default_rpc_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelaySection {
    #[serde(default = "default_window_capacity")]
    window_capacity: usize,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_rpc_port() -> u16 {
    50051
}

fn default_window_capacity() -> usize {
    CoreConfig::default().window_capacity
}

fn default_request_timeout_secs() -> u64 {
    CoreConfig::default().request_timeout.as_secs()
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(file_config) = load_from_file()? {
            return Ok(file_config.into());
        }

        Ok(Self::from_env())
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig::default()
            .with_window_capacity(self.window_capacity)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|value| value.trim().parse::<T>().ok())
        }

        Self {
            host: lookup("POSTBOX_SERVER_HOST").unwrap_or_else(default_host),
            http_port: parsed(&lookup, "POSTBOX_HTTP_PORT").unwrap_or_else(default_http_port),
            rpc_port: parsed(&lookup, "POSTBOX_RPC_PORT").unwrap_or_else(default_rpc_port),
            window_capacity: parsed(&lookup, "POSTBOX_WINDOW_CAPACITY")
                .unwrap_or_else(default_window_capacity),
            request_timeout_secs: parsed(&lookup, "POSTBOX_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(default_request_timeout_secs),
        }
    }
}

impl From<FileConfig> for ServerConfig {
    fn from(file_config: FileConfig) -> Self {
        Self {
            host: file_config.server.host,
            http_port: file_config.server.http_port,
            rpc_port: file_config.server.rpc_port,
            window_capacity: file_config.relay.window_capacity,
            request_timeout_secs: file_config.relay.request_timeout_secs,
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("POSTBOX_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_defaults() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.rpc_port, 50051);
        assert_eq!(config.window_capacity, 100);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_env_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("POSTBOX_SERVER_HOST", "127.0.0.1"),
            ("POSTBOX_HTTP_PORT", "9000"),
            ("POSTBOX_RPC_PORT", "not-a-port"),
            ("POSTBOX_WINDOW_CAPACITY", "8"),
        ]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.rpc_port, 50051);
        assert_eq!(config.window_capacity, 8);
        assert_eq!(config.core_config().window_capacity, 8);
    }

    #[test]
    fn test_partial_file_config_uses_defaults() {
        let parsed: FileConfig = toml::from_str(
            r#"
            [server]
            http_port = 8181

            [relay]
            window_capacity = 5
            request_timeout_secs = 2
            "#,
        )
        .unwrap();
        let config = ServerConfig::from(parsed);

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.http_port, 8181);
        assert_eq!(config.rpc_port, 50051);
        assert_eq!(config.core_config().request_timeout, Duration::from_secs(2));
    }
}
