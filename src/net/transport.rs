//! HTTP transport for the position exchange
//!
//! [`Transport`] is the seam between the sync loop and the network so the
//! loop can be driven by a scripted stub in tests.

use std::time::Duration;

use glam::Vec3;
use reqwest::blocking::Client;

use super::wire::{exchange_query, register_query};
use crate::error::{NetError, StartupError};
use crate::settings::Settings;

/// A blocking request/response channel to the position server
pub trait Transport: Send {
    /// Announce this client in a room; the response body is ignored
    fn register(&mut self, room: u64, uid: u16, timeout: Duration) -> Result<(), NetError>;

    /// Send the local world offset and receive the raw roster body
    fn exchange(&mut self, room: u64, uid: u16, position: Vec3) -> Result<Vec<u8>, NetError>;
}

/// reqwest-backed transport against a single endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<Self, StartupError> {
        let request_timeout = Duration::from_millis(settings.request_timeout_ms);
        let client = Client::builder()
            .timeout(request_timeout)
            .tcp_nodelay(true)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_max_idle_per_host(1)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| StartupError::Http(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.server_url.clone(),
            request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, query: &str) -> String {
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{sep}{query}", self.endpoint)
    }

    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, NetError> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(map_reqwest_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}

impl Transport for HttpTransport {
    fn register(&mut self, room: u64, uid: u16, timeout: Duration) -> Result<(), NetError> {
        let url = self.url(&register_query(room, uid));
        self.get(&url, timeout).map(|_| ())
    }

    fn exchange(&mut self, room: u64, uid: u16, position: Vec3) -> Result<Vec<u8>, NetError> {
        let url = self.url(&exchange_query(room, uid, position));
        self.get(&url, self.request_timeout)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> NetError {
    if e.is_timeout() {
        NetError::Timeout
    } else if let Some(status) = e.status() {
        NetError::Status(status.as_u16())
    } else {
        NetError::Request(e.to_string())
    }
}
