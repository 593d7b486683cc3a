//! CLI Commands

use assetledger_asset::Asset;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// API Client for interacting with an asset ledger node
pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url,
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
        })
    }

    /// Get node status
    pub async fn status(&self) -> Result<NodeStatus, ApiError> {
        let url = self.endpoint(&["status"])?;
        unwrap_response(self.client.get(url).send().await?).await
    }

    /// Create an asset
    pub async fn create_asset(&self, asset: &Asset) -> Result<WriteAck, ApiError> {
        let url = self.endpoint(&["asset"])?;
        unwrap_response(self.client.post(url).json(asset).send().await?).await
    }

    /// Replace an existing asset
    pub async fn update_asset(&self, asset: &Asset) -> Result<WriteAck, ApiError> {
        let url = self.endpoint(&["asset"])?;
        unwrap_response(self.client.put(url).json(asset).send().await?).await
    }

    /// Read the current asset
    pub async fn read_asset(&self, dealer_id: &str) -> Result<Asset, ApiError> {
        let url = self.endpoint(&["asset", dealer_id])?;
        unwrap_response(self.client.get(url).send().await?).await
    }

    /// Asset history, oldest first
    pub async fn asset_history(&self, dealer_id: &str) -> Result<Vec<Asset>, ApiError> {
        let url = self.endpoint(&["asset", dealer_id, "history"])?;
        unwrap_response(self.client.get(url).send().await?).await
    }

    /// Asset history with transaction metadata
    pub async fn asset_history_entries(
        &self,
        dealer_id: &str,
    ) -> Result<Vec<HistoryEntry>, ApiError> {
        let mut url = self.endpoint(&["asset", dealer_id, "history"])?;
        url.query_pairs_mut().append_pair("meta", "true");
        unwrap_response(self.client.get(url).send().await?).await
    }

    /// Node URL with `segments` appended, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Decode the node's response envelope
async fn unwrap_response<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;

    let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        // Unrouted paths answer without an envelope
        Err(_) => {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    };

    if envelope.success {
        envelope.data.ok_or(ApiError::EmptyResponse)
    } else {
        Err(ApiError::Server {
            status: status.as_u16(),
            message: envelope.error.unwrap_or_default(),
        })
    }
}

/// API response wrapper
#[derive(Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Node status
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub name: String,
    pub backend: String,
    pub state_version: u64,
}

/// Create/update acknowledgement
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteAck {
    #[serde(rename = "dealerID")]
    pub dealer_id: String,
    pub state_version: u64,
    pub message: String,
}

/// One historic asset version
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub tx_id: String,
    pub version: u64,
    pub timestamp: u64,
    pub asset: Asset,
}

/// API Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Empty response")]
    EmptyResponse,

    #[error("Invalid node URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status returned by the node, if it answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::EmptyResponse | ApiError::InvalidUrl(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetledger_asset::AssetFields;
    use assetledger_core::{NodeConfig, StorageBackend, StorageConfig};
    use assetledger_node::{create_router, NodeRuntime};
    use std::sync::Arc;

    async fn spawn_node() -> ApiClient {
        let config = NodeConfig {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                flush_on_commit: false,
            },
            ..Default::default()
        };
        let router = create_router(Arc::new(NodeRuntime::new(config).unwrap()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        ApiClient::new(&format!("http://{}/", addr)).unwrap()
    }

    fn asset(remarks: &str, balance: f64) -> Asset {
        dealer_asset("D1", remarks, balance)
    }

    fn dealer_asset(dealer_id: &str, remarks: &str, balance: f64) -> Asset {
        Asset::new(
            dealer_id,
            AssetFields::new("9999999999", "1234", "Active", "CREDIT", remarks, balance, 1.0),
        )
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let client = spawn_node().await;

        let ack = client.create_asset(&asset("init", 100.0)).await.unwrap();
        assert_eq!(ack.dealer_id, "D1");
        assert_eq!(ack.state_version, 1);

        client.update_asset(&asset("topup", 150.0)).await.unwrap();
        assert_eq!(client.read_asset("D1").await.unwrap().balance, 150.0);

        let history = client.asset_history("D1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].remarks, "init");

        let entries = client.asset_history_entries("D1").await.unwrap();
        assert_eq!(entries[1].version, 2);
        assert_eq!(entries[1].asset.remarks, "topup");

        let status = client.status().await.unwrap();
        assert_eq!(status.backend, "memory");
        assert_eq!(status.state_version, 2);
    }

    #[tokio::test]
    async fn test_client_surfaces_server_errors() {
        let client = spawn_node().await;

        let err = client.read_asset("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::Server { .. }));
        assert_eq!(err.status(), Some(404));

        client.create_asset(&asset("init", 1.0)).await.unwrap();
        let err = client.create_asset(&asset("again", 2.0)).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
    }

    #[tokio::test]
    async fn test_reserved_characters_in_dealer_id() {
        let client = spawn_node().await;

        for dealer_id in ["D/1", "D?1", "D#1", "D 1%"] {
            client
                .create_asset(&dealer_asset(dealer_id, "init", 1.0))
                .await
                .unwrap();
            client
                .update_asset(&dealer_asset(dealer_id, "next", 2.0))
                .await
                .unwrap();

            let read = client.read_asset(dealer_id).await.unwrap();
            assert_eq!(read.dealer_id, dealer_id);
            assert_eq!(read.balance, 2.0);

            let history = client.asset_history(dealer_id).await.unwrap();
            assert_eq!(history.len(), 2);

            let entries = client.asset_history_entries(dealer_id).await.unwrap();
            assert_eq!(entries[0].asset.remarks, "init");
        }

        let err = client.read_asset("D").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ApiClient::new("http://127.0.0.1:3000/").unwrap();
        let url = client.endpoint(&["asset", "D/1?x#y", "history"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/asset/D%2F1%3Fx%23y/history");

        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
