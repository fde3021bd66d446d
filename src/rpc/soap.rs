//! SOAP-over-HTTPS channel

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::envelope::{decode_response, encode_request};
use super::{Params, RpcChannel, RpcResponse};
use crate::error::{Result, SilverError};

/// Endpoint for a pod's SOAP API
pub fn pod_endpoint(pod: u32) -> String {
    format!("https://api{}.ibmmarketingcloud.com/SoapApi", pod)
}

pub struct SoapChannel {
    client: Client,
    endpoint: Url,
}

impl SoapChannel {
    /// Channel for the given pod
    pub fn for_pod(pod: u32, timeout: Duration) -> Result<Self> {
        Self::with_endpoint(&pod_endpoint(pod), timeout)
    }

    /// Channel for an explicit endpoint URL
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SilverError::Config(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RpcChannel for SoapChannel {
    async fn call(
        &self,
        method: &str,
        params: &Params,
        session: Option<&str>,
    ) -> Result<RpcResponse> {
        debug!("SOAP call {} -> {}", method, self.endpoint);

        let body = encode_request(method, params, session);
        let res = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", method)
            .body(body)
            .send()
            .await?;

        // Faults arrive with HTTP 500, so the status alone decides nothing
        // as long as the body is an envelope.
        let status = res.status();
        let text = res.text().await?;
        match decode_response(&text) {
            Ok(response) => Ok(response),
            Err(e) if status.is_success() => Err(e),
            Err(_) => Err(SilverError::Transport(format!(
                "{} returned HTTP {}",
                method, status
            ))),
        }
    }
}
