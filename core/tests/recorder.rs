//! Facade and duplicate-detection behaviour against hand-written doubles.
//!
//! `StubTransport` replays a canned body and records every request it sees,
//! so the tests can assert on exactly what went over the wire. `StubRecorder`
//! implements `Recorder` directly and only overrides `locations`, leaving the
//! default `exists` under test.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use recorder_client::{
    ApiError, HttpMethod, HttpRequest, HttpResponse, Location, LocationList, Recorder,
    RecorderClient, RequestContext, Transport, Version, DEVICE_HEADER, USER_HEADER,
};
use reqwest::Url;

const BASE_URL: &str = "http://recorder.test/api/0";

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StubTransport {
    body: String,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    fn replying(body: &str) -> Self {
        Self {
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: 200,
            body: self.body.clone(),
        })
    }
}

struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
        Err(ApiError::transport("connection refused"))
    }
}

struct HangingTransport;

#[async_trait]
impl Transport for HangingTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
        std::future::pending().await
    }
}

type Window = (DateTime<FixedOffset>, DateTime<FixedOffset>);

struct StubRecorder {
    list: Result<LocationList, String>,
    windows: Mutex<Vec<Window>>,
}

impl StubRecorder {
    fn returning(data: Vec<Location>) -> Self {
        Self {
            list: Ok(LocationList {
                count: data.len() as i64,
                data,
                status: 200,
            }),
            windows: Mutex::new(Vec::new()),
        }
    }

    fn with_list(list: LocationList) -> Self {
        Self {
            list: Ok(list),
            windows: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            list: Err(message.to_string()),
            windows: Mutex::new(Vec::new()),
        }
    }

    fn windows(&self) -> Vec<Window> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recorder for StubRecorder {
    async fn users(&self, _ctx: &RequestContext) -> Result<Vec<String>, ApiError> {
        Ok(Vec::new())
    }

    async fn devices(&self, _ctx: &RequestContext, _user: &str) -> Result<Vec<String>, ApiError> {
        Ok(Vec::new())
    }

    async fn locations(
        &self,
        _ctx: &RequestContext,
        _user: &str,
        _device: &str,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<LocationList, ApiError> {
        self.windows.lock().unwrap().push((from, to));
        self.list.clone().map_err(ApiError::transport)
    }

    async fn publish(
        &self,
        _ctx: &RequestContext,
        _user: &str,
        _device: &str,
        _location: &Location,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn version(&self, _ctx: &RequestContext) -> Result<Version, ApiError> {
        Ok(Version {
            version: "stub".to_string(),
        })
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn candidate() -> Location {
    Location::new(at(1_600_000_000), 52.5, 13.375)
}

fn query_value(request: &HttpRequest, key: &str) -> Option<String> {
    Url::parse(&request.url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn users_hits_list_without_query() {
    let client = RecorderClient::with_transport(
        BASE_URL,
        StubTransport::replying(r#"{"results":["testUser1","anotherUser"]}"#),
    );

    let users = client.users(&RequestContext::background()).await.unwrap();
    assert_eq!(users, vec!["testUser1", "anotherUser"]);

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].url, format!("{BASE_URL}/list"));
}

#[tokio::test]
async fn devices_sends_user_and_returns_results_verbatim() {
    for user in ["test", "jane doe", "ünïcode&more"] {
        let client = RecorderClient::with_transport(
            BASE_URL,
            StubTransport::replying(r#"{"results":["d1","d2"]}"#),
        );

        let devices = client.devices(&RequestContext::background(), user).await.unwrap();
        assert_eq!(devices, vec!["d1", "d2"]);

        let requests = client.transport().requests();
        assert_eq!(query_value(&requests[0], "user").as_deref(), Some(user));
        assert_eq!(Url::parse(&requests[0].url).unwrap().path(), "/api/0/list");
    }
}

#[tokio::test]
async fn version_decodes_envelope() {
    let client = RecorderClient::with_transport(
        BASE_URL,
        StubTransport::replying(r#"{"version":"1.3.3.7"}"#),
    );

    let version = client.version(&RequestContext::background()).await.unwrap();
    assert_eq!(version.version, "1.3.3.7");
    assert_eq!(
        client.transport().requests()[0].url,
        format!("{BASE_URL}/version")
    );
}

#[tokio::test]
async fn locations_sends_rfc3339_window() {
    let client = RecorderClient::with_transport(
        BASE_URL,
        StubTransport::replying(r#"{"count":0,"data":[],"status":200}"#),
    );
    let from = FixedOffset::west_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(2021, 6, 1, 9, 0, 0)
        .unwrap();
    let to: DateTime<FixedOffset> = at(1_622_600_000).into();

    let list = client
        .locations(&RequestContext::background(), "jane", "phone", from, to)
        .await
        .unwrap();
    assert_eq!(list.count, 0);

    let requests = client.transport().requests();
    let request = &requests[0];
    assert_eq!(query_value(request, "user").as_deref(), Some("jane"));
    assert_eq!(query_value(request, "device").as_deref(), Some("phone"));
    let sent_from = query_value(request, "from").unwrap();
    let sent_to = query_value(request, "to").unwrap();
    assert_eq!(sent_from, "2021-06-01T09:00:00-03:00");
    assert_eq!(DateTime::parse_from_rfc3339(&sent_from).unwrap(), from);
    assert_eq!(DateTime::parse_from_rfc3339(&sent_to).unwrap(), to);
}

#[tokio::test]
async fn publish_sends_headers_and_json_body() {
    let client = RecorderClient::with_transport(BASE_URL, StubTransport::replying("[]"));
    let location = candidate();

    client
        .publish(&RequestContext::background(), "jane", "phone", &location)
        .await
        .unwrap();

    let requests = client.transport().requests();
    let request = &requests[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, format!("{BASE_URL}/pub"));
    assert_eq!(request.headers.len(), 3);
    assert_eq!(request.header(USER_HEADER), Some("jane"));
    assert_eq!(request.header(DEVICE_HEADER), Some("phone"));
    assert_eq!(request.header("content-type"), Some("application/json"));

    let sent: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(sent, serde_json::to_value(&location).unwrap());
}

#[tokio::test]
async fn publish_ignores_non_json_response() {
    let client = RecorderClient::with_transport(BASE_URL, StubTransport::replying("OK"));
    let result = client
        .publish(&RequestContext::background(), "jane", "phone", &candidate())
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn decode_failure_is_surfaced() {
    let client = RecorderClient::with_transport(BASE_URL, StubTransport::replying("<html>"));
    let err = client.users(&RequestContext::background()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn transport_failure_is_surfaced() {
    let client = RecorderClient::with_transport(BASE_URL, FailingTransport);
    let err = client.version(&RequestContext::background()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn malformed_base_url_fails_before_transport() {
    let client = RecorderClient::with_transport("::nonsense::", StubTransport::default());
    let err = client.users(&RequestContext::background()).await.unwrap_err();
    assert!(matches!(err, ApiError::MalformedUrl(_)));
    assert!(client.transport().requests().is_empty());
}

#[tokio::test]
async fn cancellation_aborts_in_flight_call() {
    let client = RecorderClient::with_transport(BASE_URL, HangingTransport);
    let ctx = RequestContext::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = client.users(&ctx).await.unwrap_err();
    assert!(matches!(err, ApiError::Cancelled));
}

#[tokio::test]
async fn deadline_aborts_in_flight_call() {
    let client = RecorderClient::with_transport(BASE_URL, HangingTransport);
    let ctx = RequestContext::background().with_timeout(Duration::from_millis(20));

    let err = client.version(&ctx).await.unwrap_err();
    assert!(matches!(err, ApiError::DeadlineExceeded));
    assert!(err.is_transport());
}

#[tokio::test]
async fn client_is_usable_as_shared_trait_object() {
    let recorder: Arc<dyn Recorder> = Arc::new(RecorderClient::with_transport(
        BASE_URL,
        StubTransport::replying(r#"{"version":"2.0"}"#),
    ));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move { recorder.version(&RequestContext::background()).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().version, "2.0");
    }
}

// ---------------------------------------------------------------------------
// exists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exists_is_false_for_empty_window() {
    let recorder = StubRecorder::returning(Vec::new());
    let found = recorder
        .exists(&RequestContext::background(), "jane", "phone", &candidate())
        .await
        .unwrap();
    assert!(!found);
}

#[tokio::test]
async fn exists_trusts_zero_count() {
    let recorder = StubRecorder::with_list(LocationList {
        count: 0,
        data: vec![candidate()],
        status: 200,
    });
    let found = recorder
        .exists(&RequestContext::background(), "jane", "phone", &candidate())
        .await
        .unwrap();
    assert!(!found);
}

#[tokio::test]
async fn exists_is_true_for_exact_match() {
    let mut stored = candidate();
    stored.tracker_id = Some("jd".to_string());
    let recorder = StubRecorder::returning(vec![stored]);

    let found = recorder
        .exists(&RequestContext::background(), "jane", "phone", &candidate())
        .await
        .unwrap();
    assert!(found);
}

#[tokio::test]
async fn exists_finds_match_anywhere_in_list() {
    let original = candidate();
    let other = Location::new(original.timestamp, 0.0, 0.0);
    let recorder = StubRecorder::returning(vec![other.clone(), other, original.clone()]);

    let found = recorder
        .exists(&RequestContext::background(), "jane", "phone", &original)
        .await
        .unwrap();
    assert!(found);
}

#[tokio::test]
async fn exists_rejects_place_mismatch() {
    let original = candidate();
    let shifted_lat = Location::new(
        original.timestamp,
        original.latitude + 0.000001,
        original.longitude,
    );
    let shifted_lon = Location::new(
        original.timestamp,
        original.latitude,
        original.longitude - 0.000001,
    );
    let recorder = StubRecorder::returning(vec![shifted_lat, shifted_lon]);

    let found = recorder
        .exists(&RequestContext::background(), "jane", "phone", &original)
        .await
        .unwrap();
    assert!(!found);
}

#[tokio::test]
async fn exists_rejects_time_mismatch() {
    let original = candidate();
    let earlier = Location::new(at(1_599_999_999), original.latitude, original.longitude);
    let later = Location::new(at(1_600_000_001), original.latitude, original.longitude);
    let recorder = StubRecorder::returning(vec![earlier, later]);

    let found = recorder
        .exists(&RequestContext::background(), "jane", "phone", &original)
        .await
        .unwrap();
    assert!(!found);
}

#[tokio::test]
async fn exists_queries_padded_utc_window() {
    let local = FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2022, 2, 2, 9, 0, 0)
        .unwrap();
    let location = Location::new(local.with_timezone(&Utc), 1.0, 2.0);
    let recorder = StubRecorder::returning(Vec::new());

    recorder
        .exists(&RequestContext::background(), "jane", "phone", &location)
        .await
        .unwrap();

    let windows = recorder.windows();
    assert_eq!(windows.len(), 1);
    let (from, to) = windows[0];
    assert_eq!(from.offset().local_minus_utc(), 0);
    assert_eq!(to.offset().local_minus_utc(), 0);
    assert_eq!(from, Utc.with_ymd_and_hms(2022, 2, 1, 23, 59, 59).unwrap());
    assert_eq!(to, Utc.with_ymd_and_hms(2022, 2, 2, 0, 0, 1).unwrap());
}

#[tokio::test]
async fn exists_propagates_locations_failure() {
    let recorder = StubRecorder::failing("recorder unreachable");
    let err = recorder
        .exists(&RequestContext::background(), "jane", "phone", &candidate())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn exists_at_edge_of_time_range_fails_without_querying() {
    let recorder = StubRecorder::returning(vec![candidate()]);
    let edge = Location::new(DateTime::<Utc>::MAX_UTC, 52.5, 13.375);

    let err = recorder
        .exists(&RequestContext::background(), "jane", "phone", &edge)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::TimestampOutOfRange(_)), "{err:?}");
    assert!(!err.is_transport());
    assert!(recorder.windows().is_empty());
}

#[tokio::test]
async fn exists_over_http_client_issues_one_windowed_request() {
    let body = format!(
        r#"{{"count":1,"data":[{}],"status":200}}"#,
        serde_json::to_string(&candidate()).unwrap()
    );
    let client = RecorderClient::with_transport(BASE_URL, StubTransport::replying(&body));

    let found = client
        .exists(&RequestContext::background(), "jane", "phone", &candidate())
        .await
        .unwrap();
    assert!(found);

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(Url::parse(&requests[0].url).unwrap().path(), "/api/0/locations");
    assert_eq!(query_value(&requests[0], "from").as_deref(), Some("2020-09-13T12:26:39Z"));
    assert_eq!(query_value(&requests[0], "to").as_deref(), Some("2020-09-13T12:26:41Z"));
}

#[tokio::test]
async fn exists_over_http_client_surfaces_decode_error() {
    let client = RecorderClient::with_transport(BASE_URL, StubTransport::replying("{\"count\":"));
    let err = client
        .exists(&RequestContext::background(), "jane", "phone", &candidate())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}
