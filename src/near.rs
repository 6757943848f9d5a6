use crate::constants::{JSONRPC_REQUEST_ID, JSONRPC_VERSION, VALIDATORS_METHOD};
use crate::models::{StatusResponse, ValidatorsResponse, ValidatorsResult};

use log::debug;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Failure of a single request to the node rpc.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("request to {url} failed: {error}")]
    Transport { url: String, error: reqwest::Error },
    #[error("status code {status}, response: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("error decoding: {reason}, response: {body}")]
    Decode { reason: String, body: String },
    #[error("JSONRPC error {code} ({message}), response: {body}")]
    JsonRpc {
        code: i64,
        message: String,
        body: String,
    },
}

// near rpc actions
#[derive(Debug, Clone)]
pub struct NearRpc {
    client: Client,
    rpc_addr: String,
}

impl NearRpc {
    /// Builds the shared pooled client; `timeout` bounds every request.
    pub fn new(rpc_addr: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, rpc_addr))
    }

    pub fn with_client(client: Client, rpc_addr: &str) -> Self {
        Self {
            client,
            rpc_addr: rpc_addr.to_string(),
        }
    }

    fn status_url(&self) -> String {
        format!("{}/status", self.rpc_addr.trim_end_matches('/'))
    }

    // determine whether the node is currently syncing the chain
    pub async fn check_sync_status(&self) -> Result<bool, RpcError> {
        let url = self.status_url();
        let request = self.client.get(&url);
        let body = Self::send(request, &url).await?;

        let status: StatusResponse = serde_json::from_str(&body).map_err(|e| RpcError::Decode {
            reason: e.to_string(),
            body: body.clone(),
        })?;

        debug!(
            "Node status: chain={:?} version={:?} protocol={:?} height={:?} hash={:?} syncing={}",
            status.chain_id,
            status.version.as_ref().map(|v| (&v.version, &v.build)),
            status.protocol_version,
            status.sync_info.latest_block_height,
            status.sync_info.latest_block_hash,
            status.sync_info.syncing
        );
        Ok(status.sync_info.syncing)
    }

    // get current and next validator sets together with epoch metadata
    pub async fn get_validator_info(&self) -> Result<ValidatorsResult, RpcError> {
        let payload = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": JSONRPC_REQUEST_ID,
            "method": VALIDATORS_METHOD,
            "params": [null]
        });
        let request = self
            .client
            .post(&self.rpc_addr)
            .header("content-type", "application/json")
            .json(&payload);
        let body = Self::send(request, &self.rpc_addr).await?;

        let response: ValidatorsResponse =
            serde_json::from_str(&body).map_err(|e| RpcError::Decode {
                reason: e.to_string(),
                body: body.clone(),
            })?;

        // a json-rpc call can fail with http 200
        if let Some(error) = response.error.filter(|e| e.code != 0) {
            return Err(RpcError::JsonRpc {
                code: error.code,
                message: error.message,
                body,
            });
        }

        let result = response.result.ok_or_else(|| RpcError::Decode {
            reason: "missing result".to_string(),
            body: body.clone(),
        })?;

        debug!(
            "Fetched validators: epoch_start_height={} current={} next={}",
            result.epoch_start_height,
            result.current_validators.len(),
            result.next_validators.len()
        );
        for next in result.next_validators.iter() {
            debug!("Next epoch validator {} stake={}", next.account_id, next.stake);
        }
        Ok(result)
    }

    async fn send(request: reqwest::RequestBuilder, url: &str) -> Result<String, RpcError> {
        let transport = |error: reqwest::Error| RpcError::Transport {
            url: url.to_string(),
            error,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(RpcError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
