//! In-memory stand-in for the OwnTracks Recorder HTTP API.
//!
//! Serves `/list`, `/locations`, `/version` and `/pub` under `/api/0`.
//! Records are kept as raw JSON so the stub stays independent of the client's
//! types; end-to-end tests catch any drift between the two.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};

pub const API_PREFIX: &str = "/api/0";
pub const USER_HEADER: &str = "x-limit-u";
pub const DEVICE_HEADER: &str = "x-limit-d";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// user -> device -> records in arrival order.
pub type Store = Arc<RwLock<BTreeMap<String, BTreeMap<String, Vec<Value>>>>>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub results: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationList {
    pub count: usize,
    pub data: Vec<Value>,
    pub status: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
}

#[derive(Deserialize)]
struct ListQuery {
    user: Option<String>,
}

#[derive(Deserialize)]
struct LocationsQuery {
    user: String,
    device: String,
    from: String,
    to: String,
}

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn app() -> Router {
    router(Store::default())
}

/// Router over a caller-owned store, so tests can seed or inspect it.
pub fn router(store: Store) -> Router {
    let api = Router::new()
        .route("/list", get(list))
        .route("/locations", get(locations))
        .route("/version", get(version))
        .route("/pub", post(publish))
        .with_state(store);
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list(State(store): State<Store>, Query(query): Query<ListQuery>) -> Json<ListResponse> {
    let store = store.read().await;
    let results = match query.user {
        Some(user) => store
            .get(&user)
            .map(|devices| devices.keys().cloned().collect())
            .unwrap_or_default(),
        None => store.keys().cloned().collect(),
    };
    Json(ListResponse { results })
}

async fn locations(
    State(store): State<Store>,
    Query(query): Query<LocationsQuery>,
) -> ApiResult<Json<LocationList>> {
    let from = parse_bound("from", &query.from)?;
    let to = parse_bound("to", &query.to)?;

    let store = store.read().await;
    let data: Vec<Value> = store
        .get(&query.user)
        .and_then(|devices| devices.get(&query.device))
        .map(|records| {
            records
                .iter()
                .filter(|record| {
                    record_time(record).is_some_and(|tst| from < tst && tst < to)
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    tracing::debug!(
        user = %query.user,
        device = %query.device,
        %from,
        %to,
        count = data.len(),
        "served locations"
    );
    Ok(Json(LocationList {
        count: data.len(),
        data,
        status: 200,
    }))
}

async fn version() -> Json<Version> {
    Json(Version {
        version: VERSION.to_string(),
    })
}

async fn publish(
    State(store): State<Store>,
    headers: HeaderMap,
    Json(record): Json<Value>,
) -> ApiResult<Json<Vec<Value>>> {
    let user = required_header(&headers, USER_HEADER)?;
    let device = required_header(&headers, DEVICE_HEADER)?;
    if !record.is_object() || record_time(&record).is_none() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "location must be an object with an integer tst".to_string(),
        ));
    }

    tracing::info!(%user, %device, "recorded location");
    store
        .write()
        .await
        .entry(user)
        .or_default()
        .entry(device)
        .or_default()
        .push(record);
    Ok(Json(Vec::new()))
}

fn required_header(headers: &HeaderMap, name: &str) -> ApiResult<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or((StatusCode::BAD_REQUEST, format!("missing {name} header")))
}

fn parse_bound(name: &str, raw: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid {name}: {e}")))
}

fn record_time(record: &Value) -> Option<DateTime<Utc>> {
    let tst = record.get("tst")?.as_i64()?;
    Utc.timestamp_opt(tst, 0).single()
}
