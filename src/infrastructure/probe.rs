use crate::domain::ports::ReachabilityProbe;
use crate::error::{QueueError, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;

/// Considers the network usable when a TCP connection to the API host opens in time.
///
/// This only proves that a route to the host exists, not that the API is healthy.
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    /// Builds a probe targeting the host and port of `base_url`.
    pub fn for_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| {
            QueueError::ValidationError(format!("invalid API URL {base_url}: {e}"))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| QueueError::ValidationError(format!("API URL {base_url} has no host")))?;
        let port = url.port_or_known_default().ok_or_else(|| {
            QueueError::ValidationError(format!("API URL {base_url} has no port"))
        })?;
        Ok(Self::new(format!("{host}:{port}"), timeout))
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(address = %self.address, error = %e, "probe failed");
                false
            }
            Err(_) => false,
        }
    }
}
