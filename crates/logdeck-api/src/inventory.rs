// Container inventory endpoint.
//
// One request, one JSON array. The server does not paginate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::transport::TransportConfig;

/// A container as reported by `GET /api/v1/containers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
}

/// HTTP client for the inventory endpoint.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    http: reqwest::Client,
    transport: TransportConfig,
}

impl InventoryClient {
    /// Build a client from the shared transport config.
    pub fn new(transport: TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, transport })
    }

    /// Build a client around an existing `reqwest::Client` (used by tests).
    pub fn from_reqwest(transport: TransportConfig, http: reqwest::Client) -> Self {
        Self { http, transport }
    }

    /// Fetch the full container list.
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>, Error> {
        let url = self.transport.containers_url()?;
        debug!(url = %url, "fetching container inventory");

        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
