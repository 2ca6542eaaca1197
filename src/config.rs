use crate::errors::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8222;

#[derive(Parser, Debug, Clone)]
#[command(name = "unvr-exporter", version, about)]
pub struct Config {
    /// Path to the TOML file listing the NVR devices to poll.
    #[arg(long, env = "UNVR_EXPORTER_CONFIG", default_value = "config.toml")]
    pub config: String,

    /// Bind address for the metrics endpoint, overrides the file.
    #[arg(long, env = "UNVR_EXPORTER_ADDRESS")]
    pub address: Option<String>,

    /// Bind port for the metrics endpoint, overrides the file.
    #[arg(long, env = "UNVR_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Enable JSON structured logging.
    #[arg(long, env = "UNVR_EXPORTER_JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,

    /// Seconds after the last successful refresh before a device's metrics are withheld.
    #[arg(
        long,
        env = "UNVR_EXPORTER_STALENESS_SECS",
        default_value_t = 15,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub staleness_secs: u64,

    /// Per-request timeout towards the devices, in seconds.
    #[arg(
        long,
        env = "UNVR_EXPORTER_REQUEST_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// CLI values win over the file, the file over built-in defaults.
    pub fn bind_addr(&self, file: &FileConfig) -> Result<SocketAddr, ConfigError> {
        let address = self
            .address
            .clone()
            .or_else(|| file.address.clone())
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
        let port = self.port.or(file.port).unwrap_or(DEFAULT_PORT);

        format!("{address}:{port}")
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{address}:{port}")))
    }
}

/// Resolved per-device connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Base URL including scheme, e.g. `https://10.0.0.1`.
    pub host: String,
    pub username: String,
    pub password: String,
    pub poll_interval: Duration,
}

/// On-disk layout of the device file.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub address: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    #[serde(default = "default_use_https")]
    pub use_https: bool,
}

fn default_polling_interval() -> u64 {
    10
}

fn default_use_https() -> bool {
    true
}

impl DeviceSettings {
    pub fn resolve(&self, name: &str) -> Result<ConnectionDescriptor, ConfigError> {
        let host = self.host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(ConfigError::InvalidDevice {
                name: name.into(),
                reason: "host is empty".into(),
            });
        }
        if self.polling_interval == 0 {
            return Err(ConfigError::InvalidDevice {
                name: name.into(),
                reason: "polling_interval must be at least 1 second".into(),
            });
        }

        let host = if host.contains("://") {
            host.to_string()
        } else {
            let scheme = if self.use_https { "https" } else { "http" };
            format!("{scheme}://{host}")
        };

        Ok(ConnectionDescriptor {
            host,
            username: self.username.clone(),
            password: self.password.clone(),
            poll_interval: Duration::from_secs(self.polling_interval),
        })
    }
}

impl FileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Connection descriptors for every configured device, in name order.
    pub fn descriptors(&self, path: &str) -> Result<Vec<ConnectionDescriptor>, ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices { path: path.into() });
        }
        self.devices
            .iter()
            .map(|(name, settings)| settings.resolve(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
port = 9100

[devices.office]
host = "10.0.0.1"
username = "admin"
password = "pw"

[devices.warehouse]
host = "10.0.0.2/"
username = "ops"
password = "pw2"
polling_interval = 30
use_https = false
"#;

    fn cli(args: &[&str]) -> Config {
        let mut argv = vec!["unvr-exporter"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    #[test]
    fn test_parse_devices_with_defaults() {
        let file = FileConfig::parse(SAMPLE, "test.toml").unwrap();
        let devices = file.descriptors("test.toml").unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].host, "https://10.0.0.1");
        assert_eq!(devices[0].poll_interval, Duration::from_secs(10));
        assert_eq!(devices[1].host, "http://10.0.0.2");
        assert_eq!(devices[1].poll_interval, Duration::from_secs(30));
        assert_eq!(devices[1].username, "ops");
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        let settings = DeviceSettings {
            host: "http://nvr.local:7443".into(),
            username: "u".into(),
            password: "p".into(),
            polling_interval: 5,
            use_https: true,
        };
        assert_eq!(settings.resolve("x").unwrap().host, "http://nvr.local:7443");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = DeviceSettings {
            host: "10.0.0.1".into(),
            username: "u".into(),
            password: "p".into(),
            polling_interval: 0,
            use_https: true,
        };
        assert!(matches!(
            settings.resolve("x"),
            Err(ConfigError::InvalidDevice { .. })
        ));
    }

    #[test]
    fn test_no_devices_is_error() {
        let file = FileConfig::parse("port = 1\n", "empty.toml").unwrap();
        assert!(matches!(
            file.descriptors("empty.toml"),
            Err(ConfigError::NoDevices { .. })
        ));
    }

    #[test]
    fn test_missing_password_is_parse_error() {
        let raw = "[devices.a]\nhost = \"h\"\nusername = \"u\"\n";
        assert!(matches!(
            FileConfig::parse(raw, "bad.toml"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let loaded = FileConfig::load(file.path()).unwrap();
        assert_eq!(loaded.port, Some(9100));
        assert_eq!(loaded.devices.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            FileConfig::load("/nonexistent/unvr.toml"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_bind_addr_precedence() {
        let file = FileConfig::parse(SAMPLE, "test.toml").unwrap();

        let addr = cli(&[]).bind_addr(&file).unwrap();
        assert_eq!(addr, "0.0.0.0:9100".parse::<SocketAddr>().unwrap());

        let addr = cli(&["--address", "127.0.0.1", "--port", "9200"])
            .bind_addr(&file)
            .unwrap();
        assert_eq!(addr, "127.0.0.1:9200".parse::<SocketAddr>().unwrap());

        let addr = cli(&[]).bind_addr(&FileConfig::default()).unwrap();
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_cli_defaults() {
        let config = cli(&[]);
        assert_eq!(config.staleness(), Duration::from_secs(15));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(!config.json_logs);
    }

    #[test]
    fn test_zero_durations_rejected() {
        let err = Config::try_parse_from(["unvr-exporter", "--staleness-secs", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Config::try_parse_from(["unvr-exporter", "--request-timeout-secs", "0"]).is_err());
        assert_eq!(
            cli(&["--staleness-secs", "1"]).staleness(),
            Duration::from_secs(1)
        );
    }
}
