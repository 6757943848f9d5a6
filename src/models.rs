use serde::Deserialize;

// GET /status
#[derive(Deserialize, Debug, Clone)]
pub struct StatusResponse {
    #[serde(default)]
    pub version: Option<NodeVersion>,
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub protocol_version: Option<u32>,
    pub sync_info: SyncInfo,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NodeVersion {
    pub version: String,
    #[serde(default)]
    pub build: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_hash: Option<String>,
    #[serde(default)]
    pub latest_block_height: Option<u64>,
    pub syncing: bool,
}

// POST / {"method": "validators"}
#[derive(Deserialize, Debug, Clone)]
pub struct ValidatorsResponse {
    #[serde(default)]
    pub result: Option<ValidatorsResult>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ValidatorsResult {
    pub current_validators: Vec<CurrentValidator>,
    #[serde(default)]
    pub next_validators: Vec<NextValidator>,
    pub epoch_start_height: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CurrentValidator {
    pub account_id: String,
    #[serde(default)]
    pub is_slashed: bool,
    pub num_expected_blocks: u64,
    pub num_produced_blocks: u64,
    pub stake: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NextValidator {
    pub account_id: String,
    pub stake: String,
}
