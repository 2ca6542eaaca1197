//! Authenticated access to one NVR's management API.

use crate::config::ConnectionDescriptor;
use crate::errors::NvrError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const BOOTSTRAP_PATH: &str = "/proxy/protect/api/bootstrap";

/// Status and body of one device response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The two HTTP exchanges the session needs. Only transport failures are
/// errors here; status handling belongs to [`Session`].
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<ApiResponse, NvrError>;

    async fn bootstrap(&self) -> Result<ApiResponse, NvrError>;
}

/// `reqwest` client bound to one device. The cookie store carries the session.
pub struct HttpDeviceApi {
    client: Client,
    host: String,
}

impl HttpDeviceApi {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Protect consoles ship self-signed certificates.
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            host: host.into(),
        })
    }

    fn transport(&self, source: reqwest::Error) -> NvrError {
        NvrError::Transport {
            host: self.host.clone(),
            source,
        }
    }

    async fn read_response(&self, resp: reqwest::Response) -> Result<ApiResponse, NvrError> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport(e))?;
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl DeviceApi for HttpDeviceApi {
    async fn login(&self, username: &str, password: &str) -> Result<ApiResponse, NvrError> {
        let resp = self
            .client
            .post(format!("{}{}", self.host, LOGIN_PATH))
            .json(&json!({
                "username": username,
                "password": password,
                "remember": true,
            }))
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        self.read_response(resp).await
    }

    async fn bootstrap(&self) -> Result<ApiResponse, NvrError> {
        let resp = self
            .client
            .get(format!("{}{}", self.host, BOOTSTRAP_PATH))
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        self.read_response(resp).await
    }
}

/// Session state against one device; re-authenticates lazily on 401.
pub struct Session<A = HttpDeviceApi> {
    api: A,
    descriptor: ConnectionDescriptor,
}

impl Session<HttpDeviceApi> {
    pub fn connect(descriptor: ConnectionDescriptor, timeout: Duration) -> Result<Self, NvrError> {
        let api = HttpDeviceApi::new(descriptor.host.clone(), timeout).map_err(|source| {
            NvrError::Transport {
                host: descriptor.host.clone(),
                source,
            }
        })?;
        Ok(Self::new(api, descriptor))
    }
}

impl<A: DeviceApi> Session<A> {
    pub fn new(api: A, descriptor: ConnectionDescriptor) -> Self {
        Self { api, descriptor }
    }

    pub fn host(&self) -> &str {
        &self.descriptor.host
    }

    pub async fn login(&self) -> Result<(), NvrError> {
        warn!(host = %self.host(), "Login");
        let resp = self
            .api
            .login(&self.descriptor.username, &self.descriptor.password)
            .await?;

        if resp.status != StatusCode::OK {
            return Err(NvrError::Auth {
                host: self.host().to_string(),
                body: resp.body,
            });
        }
        Ok(())
    }

    /// Fetch the bootstrap document. A 401 costs exactly one re-login and one
    /// more request; a second 401 is reported as an auth failure.
    pub async fn fetch_status(&self) -> Result<Value, NvrError> {
        let mut relogged = false;
        loop {
            let resp = self.api.bootstrap().await?;
            match resp.status {
                StatusCode::OK => {
                    return serde_json::from_str(&resp.body).map_err(|e| NvrError::Protocol {
                        host: self.host().to_string(),
                        detail: format!("invalid JSON body: {e}"),
                    });
                }
                StatusCode::UNAUTHORIZED if !relogged => {
                    info!(host = %self.host(), "Got error 401, performing login");
                    self.login().await?;
                    relogged = true;
                }
                StatusCode::UNAUTHORIZED => {
                    return Err(NvrError::Auth {
                        host: self.host().to_string(),
                        body: resp.body,
                    });
                }
                status => {
                    return Err(NvrError::Protocol {
                        host: self.host().to_string(),
                        detail: format!("status {status}: {}", resp.body),
                    });
                }
            }
        }
    }
}
