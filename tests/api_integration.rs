use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use gas_ledger::aggregate::GasCostAggregator;
use gas_ledger::api::{app_router, AppState};
use gas_ledger::config::{build_endpoint, Config};

const API_KEY: &str = "test-key";

#[tokio::test]
async fn health_endpoint_works() {
    let (base_url, handles) = spawn_app_with_upstream().await;
    let client = Client::new();
    let res = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.get("status").and_then(|s| s.as_str()), Some("ok"));
    abort_all(handles);
}

#[tokio::test]
async fn gas_summary_walks_pages_and_prices_transactions() {
    let (base_url, handles) = spawn_app_with_upstream().await;
    let client = Client::new();
    let res = client
        .get(format!("{}/gas-summary?address=0xgood", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["totalGasCostWei"], "63000000000000");
    assert_eq!(body["totalGasCostUSD"], "0.14");
    assert_eq!(body["staleSubstitutions"], 1);
    assert_eq!(body["skippedTransactions"], 0);

    let costs = body["transactionCosts"].as_array().cloned().unwrap_or_default();
    let hashes: Vec<&str> = costs.iter().filter_map(|c| c["hash"].as_str()).collect();
    assert_eq!(hashes, vec!["0xt1", "0xt2", "0xt3"]);
    assert_eq!(costs[0]["timestamp"], json!(1_700_000_000_000u64));
    assert_eq!(costs[2]["timestamp"], json!("1700001200000"));
    assert_eq!(costs[1]["costUSD"], costs[0]["costUSD"]);
    assert!(costs[2]["costETH"].is_number());
    abort_all(handles);
}

#[tokio::test]
async fn missing_address_is_bad_request() {
    let (base_url, handles) = spawn_app_with_upstream().await;
    let client = Client::new();

    for path in ["/gas-summary", "/gas-summary?address=", "/gas-summary?address=%20"] {
        let res = client
            .get(format!("{}{}", base_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400, "path {}", path);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Missing address parameter" }));
    }
    abort_all(handles);
}

#[tokio::test]
async fn upstream_failure_is_server_error_without_data() {
    let (base_url, handles) = spawn_app_with_upstream().await;
    let client = Client::new();
    let res = client
        .get(format!("{}/gas-summary?address=0xbroken", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 500);
    let body: Value = res.json().await.unwrap();
    let message = body.get("error").and_then(|e| e.as_str()).unwrap_or_default();
    assert!(message.contains("502"), "unexpected error message: {}", message);
    assert!(body.get("transactionCosts").is_none());
    abort_all(handles);
}

#[tokio::test]
async fn summary_stats_returns_counters() {
    let (base_url, handles) = spawn_app_with_upstream().await;
    let client = Client::new();
    client
        .get(format!("{}/gas-summary?address=0xgood", base_url))
        .send()
        .await
        .unwrap();
    let res = client
        .get(format!("{}/stats/summary", base_url))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert!(body["requests"].as_u64().unwrap_or_default() >= 1);
    assert!(body.get("failed_requests").is_some());
    assert!(body.get("priced_transactions").is_some());
    assert!(body.get("skipped_transactions").is_some());
    assert!(body.get("stale_substitutions").is_some());
    abort_all(handles);
}

#[tokio::test]
async fn transport_failure_does_not_reveal_api_key() {
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);

    let secret = "sk-live-do-not-print";
    let (base_url, handles) = spawn_app_against(&dead_url, secret).await;
    let client = Client::new();
    let res = client
        .get(format!("{}/gas-summary?address=0xgood", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 500);
    let body: Value = res.json().await.unwrap();
    let message = body.get("error").and_then(|e| e.as_str()).unwrap_or_default();
    assert!(!message.is_empty());
    assert!(!message.contains(secret), "api key leaked: {}", message);
    abort_all(handles);
}

fn abort_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.abort();
    }
}

async fn spawn_app_with_upstream() -> (String, Vec<JoinHandle<()>>) {
    let (upstream_url, upstream) = spawn(fake_upstream()).await;
    let (base_url, mut handles) = spawn_app_against(&upstream_url, API_KEY).await;
    handles.push(upstream);
    (base_url, handles)
}

async fn spawn_app_against(upstream_url: &str, api_key: &str) -> (String, Vec<JoinHandle<()>>) {
    let config = Config {
        history_endpoint: build_endpoint(
            "HISTORY_API_URL",
            &format!("{}/data/v1", upstream_url),
            &[api_key, "transactions", "history", "by-address"],
        )
        .unwrap(),
        prices_endpoint: build_endpoint(
            "PRICES_API_URL",
            &format!("{}/prices/v1", upstream_url),
            &[api_key, "tokens", "historical"],
        )
        .unwrap(),
        network: "eth-mainnet".to_string(),
        price_symbol: "ETH".to_string(),
        http_bind_addr: "127.0.0.1:0".to_string(),
    };
    let aggregator = GasCostAggregator::from_config(&config).unwrap();
    let (base_url, app) = spawn(app_router(AppState { aggregator })).await;

    (base_url, vec![app])
}

async fn spawn(router: Router) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);
    let server = axum::serve(listener, router);
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (base_url, handle)
}

fn fake_upstream() -> Router {
    Router::new()
        .route(
            "/data/v1/test-key/transactions/history/by-address",
            post(fake_history),
        )
        .route("/prices/v1/test-key/tokens/historical", post(fake_prices))
}

/// Two pages for `0xgood`, each 21000 gas at 1 gwei; `0xbroken` always fails.
async fn fake_history(Json(body): Json<Value>) -> Response {
    let address = body["addresses"][0]["address"].as_str().unwrap_or_default();
    if body["limit"] != json!(50) || body["addresses"][0]["networks"] != json!(["eth-mainnet"]) {
        return (StatusCode::BAD_REQUEST, "bad request shape").into_response();
    }

    match (address, body.get("after").and_then(Value::as_str)) {
        ("0xbroken", _) => (StatusCode::BAD_GATEWAY, "upstream exploded").into_response(),
        (_, None) => Json(json!({
            "transactions": [
                {
                    "hash": "0xt1",
                    "gasUsed": "21000",
                    "effectiveGasPrice": "1000000000",
                    "blockTimestamp": 1_700_000_000_000u64
                },
                {
                    "hash": "0xt2",
                    "gasUsed": "0x5208",
                    "gasPrice": "0x3b9aca00",
                    "blockTimestamp": "1700000600000"
                }
            ],
            "after": "page-2"
        }))
        .into_response(),
        (_, Some("page-2")) => Json(json!({
            "transactions": [
                {
                    "hash": "0xt3",
                    "gas": "21000",
                    "gasPrice": "1000000000",
                    "blockTimestamp": "1700001200000"
                }
            ],
            "after": null
        }))
        .into_response(),
        _ => (StatusCode::BAD_REQUEST, "unknown cursor").into_response(),
    }
}

/// Prices for the first and third transaction windows only.
async fn fake_prices(Json(body): Json<Value>) -> Json<Value> {
    let data = match body["startTime"].as_str() {
        Some("2023-11-14T22:13:20.000Z") => {
            json!([{ "value": "2000.00", "timestamp": "2023-11-14T22:00:00Z" }])
        }
        Some("2023-11-14T22:33:20.000Z") => json!([{ "value": 2500.0 }]),
        _ => json!([]),
    };
    Json(json!({ "symbol": "ETH", "currency": "usd", "data": data }))
}
