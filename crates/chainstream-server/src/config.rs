use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tick_interval_ms: u64,
    pub upstream_url: String,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    stream: StreamSection,
    #[serde(default)]
    upstream: UpstreamSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamSection {
    #[serde(default = "default_tick_interval_ms")]
    tick_interval_ms: u64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamSection {
    #[serde(default = "default_upstream_url")]
    url: String,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_tick_interval_ms() -> u64 {
    5000
}

fn default_upstream_url() -> String {
    "http://127.0.0.1:3000/route-stream".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        FileConfig::default().into()
    }
}

impl From<FileConfig> for ServerConfig {
    fn from(file_config: FileConfig) -> Self {
        Self {
            host: file_config.server.host,
            port: file_config.server.port,
            tick_interval_ms: file_config.stream.tick_interval_ms,
            upstream_url: file_config.upstream.url,
        }
    }
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        if let Some(path) = config_file_path() {
            return Self::load_from_path(path);
        }

        Ok(Self::from_env())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(read_config(path.as_ref())?.into())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn from_env() -> Self {
        let host = env::var("CHAINSTREAM_SERVER_HOST").unwrap_or_else(|_| default_host());
        let port = env::var("CHAINSTREAM_SERVER_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let tick_interval_ms = env::var("CHAINSTREAM_TICK_INTERVAL_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or_else(default_tick_interval_ms);
        let upstream_url =
            env::var("CHAINSTREAM_UPSTREAM_URL").unwrap_or_else(|_| default_upstream_url());

        Self {
            host,
            port,
            tick_interval_ms,
            upstream_url,
        }
    }
}

fn config_file_path() -> Option<String> {
    let config_path = env::var("CHAINSTREAM_SERVER_CONFIG").ok();
    if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    }
}

fn read_config(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.tick_interval(), Duration::from_secs(5));
        assert_eq!(config.upstream_url, "http://127.0.0.1:3000/route-stream");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = write_config("[server]\nport = 8088\n\n[stream]\ntick_interval_ms = 250\n");
        let config = ServerConfig::load_from_path(file.path()).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8088);
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.upstream_url, "http://127.0.0.1:3000/route-stream");
    }

    #[test]
    fn test_upstream_section() {
        let file = write_config("[upstream]\nurl = \"http://backend:9000/events\"\n");
        let config = ServerConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.upstream_url, "http://backend:9000/events");
    }

    #[test]
    fn test_invalid_file_names_path() {
        let file = write_config("[server]\nport = \"not a port\"\n");
        let err = ServerConfig::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = ServerConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = ServerConfig {
            tick_interval_ms: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(1));
    }
}
