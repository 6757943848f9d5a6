use crate::collector::NearCollector;
use crate::constants::OPENMETRICS_CONTENT_TYPE;
use crate::prometheus::{encode_samples, Exposition};
use crate::utils::Config;

use log::{error, info};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::Filter;

#[derive(Clone)]
pub struct State {
    pub config: Arc<Config>,
    pub collector: Arc<NearCollector>,
}

fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn routes(state: State) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .then(handle_metrics)
}

// scrape the node and encode the result
pub async fn handle_metrics(state: State) -> Response {
    let samples = state.collector.collect().await;

    match encode_samples(&samples, state.config.error_handling) {
        Ok(Exposition::Metrics(body)) => {
            warp::reply::with_header(body, "content-type", OPENMETRICS_CONTENT_TYPE).into_response()
        }
        Ok(Exposition::Failed(message)) => {
            warp::reply::with_status(message, StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            warp::reply::with_status(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
    }
}

pub async fn serve(
    state: State,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let listen_addr = state.config.listen_addr;
    let (addr, server) =
        warp::serve(routes(state)).try_bind_with_graceful_shutdown(listen_addr, shutdown)?;

    info!("Serving metrics at http://{}/metrics", addr);
    server.await;
    info!("Metrics server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::near::NearRpc;
    use crate::utils::ErrorHandling;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn state(server: &MockServer, error_handling: ErrorHandling) -> State {
        let config = Config {
            rpc_addr: server.base_url(),
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            http_timeout: Duration::from_secs(2),
            error_handling,
        };
        let rpc = NearRpc::new(&config.rpc_addr, config.http_timeout).unwrap();
        State {
            config: Arc::new(config),
            collector: Arc::new(NearCollector::new(rpc)),
        }
    }

    async fn mock_node(server: &MockServer, stake: &str) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/status");
                then.status(200).json_body(json!({"sync_info": {"syncing": false}}));
            })
            .await;
        let stake = stake.to_string();
        server
            .mock_async(move |when, then| {
                when.method(POST).path("/");
                then.status(200).json_body(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "current_validators": [
                            {"account_id": "a.near", "is_slashed": false, "num_expected_blocks": 4,
                             "num_produced_blocks": 3, "stake": stake}
                        ],
                        "epoch_start_height": 77
                    }
                }));
            })
            .await;
    }

    #[tokio::test]
    async fn serves_metrics() {
        let server = MockServer::start_async().await;
        mock_node(&server, "12").await;

        let response = warp::test::request()
            .method("GET")
            .path("/metrics")
            .reply(&routes(state(&server, ErrorHandling::HttpError)))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], OPENMETRICS_CONTENT_TYPE);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("near_epoch_start_height 77.0"));
        assert!(body.contains("near_validator_stake{account_id=\"a.near\"} 12.0"));
    }

    #[tokio::test]
    async fn invalid_sample_fails_scrape_in_http_error_mode() {
        let server = MockServer::start_async().await;
        mock_node(&server, "lots").await;

        let response = warp::test::request()
            .path("/metrics")
            .reply(&routes(state(&server, ErrorHandling::HttpError)))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("invalid stake: lots"));
    }

    #[tokio::test]
    async fn invalid_sample_is_skipped_in_continue_mode() {
        let server = MockServer::start_async().await;
        mock_node(&server, "lots").await;

        let response = warp::test::request()
            .path("/metrics")
            .reply(&routes(state(&server, ErrorHandling::Continue)))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert!(body.contains("near_validator_produced_blocks{account_id=\"a.near\"} 3.0"));
        assert!(!body.contains("near_validator_stake{"));
    }

    #[tokio::test]
    async fn syncing_node_fails_scrape() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/status");
                then.status(200).json_body(json!({"sync_info": {"syncing": true}}));
            })
            .await;

        let response = warp::test::request()
            .path("/metrics")
            .reply(&routes(state(&server, ErrorHandling::HttpError)))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert_eq!(body.matches("node is syncing").count(), 6);
    }

    #[tokio::test]
    async fn syncing_node_keeps_every_family_in_continue_mode() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/status");
                then.status(200).json_body(json!({"sync_info": {"syncing": true}}));
            })
            .await;

        let response = warp::test::request()
            .path("/metrics")
            .reply(&routes(state(&server, ErrorHandling::Continue)))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(response.body().to_vec()).unwrap();
        assert_eq!(body.matches("# TYPE ").count(), 6);
        assert!(body.contains("# TYPE near_active_validators gauge"));
        assert!(body.contains("# TYPE near_epoch_start_height gauge"));
        assert!(!body.contains("near_active_validators 0"));
    }

    #[tokio::test]
    async fn unknown_path_is_rejected() {
        let server = MockServer::start_async().await;
        let response = warp::test::request()
            .path("/")
            .reply(&routes(state(&server, ErrorHandling::HttpError)))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
