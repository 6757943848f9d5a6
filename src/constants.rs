use std::time::Duration;

// prometheus metrics prefix
pub static METRICS_PREFIX: &str = "near";

// listen address used when none is configured
pub static DEFAULT_LISTEN_ADDR: &str = ":8080";

// per-request timeout towards the node rpc
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(2);

// near json-rpc
pub static JSONRPC_VERSION: &str = "2.0";
pub static VALIDATORS_METHOD: &str = "validators";
pub const JSONRPC_REQUEST_ID: u64 = 1;

pub static OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";
