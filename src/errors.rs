use thiserror::Error;

// typed errors so the refresh path and tests can match on the failure class

#[derive(Error, Debug)]
pub enum NvrError {
    /// Bad credentials, or the session was still rejected after re-login.
    #[error("authentication against {host} failed: {body}")]
    Auth { host: String, body: String },

    /// Network unreachable, DNS failure, timeout, connection reset.
    #[error("request to {host} failed: {source}")]
    Transport {
        host: String,
        source: reqwest::Error,
    },

    /// Unexpected HTTP status, or a body that is not a usable status document.
    #[error("unexpected response from {host}: {detail}")]
    Protocol { host: String, detail: String },
}

impl NvrError {
    pub fn host(&self) -> &str {
        match self {
            NvrError::Auth { host, .. }
            | NvrError::Transport { host, .. }
            | NvrError::Protocol { host, .. } => host,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("no devices configured in {path}")]
    NoDevices { path: String },

    #[error("device {name}: {reason}")]
    InvalidDevice { name: String, reason: String },

    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}
