// Shared transport configuration for the inventory client and the log stream.
//
// Owns the server base URL and derives both the REST endpoint and the
// WebSocket endpoint from it, so the two never drift apart.

use std::time::Duration;

use url::Url;

use crate::error::Error;

const USER_AGENT: &str = concat!("logdeck/", env!("CARGO_PKG_VERSION"));

/// Transport settings shared by every request to the log server.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the server, e.g. `http://localhost:8080`.
    pub base_url: Url,
    /// Timeout for plain HTTP requests. Streams are not bounded by it.
    pub timeout: Duration,
}

impl TransportConfig {
    /// Create a config for `base_url`, rejecting anything that isn't http(s).
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, Error> {
        match base_url.scheme() {
            "http" | "https" => Ok(Self { base_url, timeout }),
            other => Err(Error::UnsupportedScheme {
                scheme: other.to_owned(),
            }),
        }
    }

    /// Parse `base_url` and build a config from it.
    pub fn parse(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        Self::new(Url::parse(base_url)?, timeout)
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }

    /// `GET` endpoint listing the available containers.
    pub fn containers_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join("api/v1/containers")?)
    }

    /// WebSocket endpoint streaming logs for `container_id`.
    ///
    /// `http` maps to `ws` and `https` to `wss`; the path segment is
    /// percent-encoded so opaque ids can't escape the route.
    pub fn logs_ws_url(&self, container_id: &str) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::UnsupportedScheme {
                scheme: scheme.to_owned(),
            })?;
        url.path_segments_mut()
            .map_err(|()| Error::UnsupportedScheme {
                scheme: self.base_url.scheme().to_owned(),
            })?
            .pop_if_empty()
            .extend(["api", "v1", "logs", container_id]);
        Ok(url)
    }
}
