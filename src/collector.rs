use crate::near::{NearRpc, RpcError};
use crate::prometheus::{invalid_for_all, map_to_samples, MetricSample};

use log::{debug, warn};

/// Reason a whole scrape was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("check_sync_status: {0}")]
    CheckSyncStatus(RpcError),
    // validator data is unreliable until the node catches up
    #[error("node is syncing, validator metrics are unavailable until sync completes")]
    Syncing,
    #[error("get_validator_info: {0}")]
    GetValidatorInfo(RpcError),
}

/// Stateless between scrapes; clones share the pooled rpc client.
#[derive(Debug, Clone)]
pub struct NearCollector {
    rpc: NearRpc,
}

impl NearCollector {
    pub fn new(rpc: NearRpc) -> Self {
        Self { rpc }
    }

    // collect one scrape worth of samples, never fails as a whole
    pub async fn collect(&self) -> Vec<MetricSample> {
        match self.try_collect().await {
            Ok(samples) => {
                debug!("Collected {} samples", samples.len());
                samples
            }
            Err(e) => {
                warn!("Scrape aborted: {e}");
                invalid_for_all(&e)
            }
        }
    }

    async fn try_collect(&self) -> Result<Vec<MetricSample>, CollectError> {
        let syncing = self
            .rpc
            .check_sync_status()
            .await
            .map_err(CollectError::CheckSyncStatus)?;
        if syncing {
            return Err(CollectError::Syncing);
        }

        let validators = self
            .rpc
            .get_validator_info()
            .await
            .map_err(CollectError::GetValidatorInfo)?;

        Ok(map_to_samples(&validators))
    }
}
