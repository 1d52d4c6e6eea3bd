//! HTTP client for the recorder API.
//!
//! # Design
//! `RecorderClient` holds only a `base_url` and a transport handle and carries
//! no mutable state between calls, so one instance can be shared across tasks.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`; the
//! `Recorder` impl glues the two together around a single transport call.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{ClientConfig, DEFAULT_TIMEOUT};
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::recorder::Recorder;
use crate::types::{ListResponse, Location, LocationList, Version};

/// Header naming the acting user on `/pub`.
pub const USER_HEADER: &str = "X-Limit-U";
/// Header naming the acting device on `/pub`.
pub const DEVICE_HEADER: &str = "X-Limit-D";

#[derive(Debug, Clone)]
pub struct RecorderClient<T = ReqwestTransport> {
    base_url: String,
    transport: T,
}

impl RecorderClient<ReqwestTransport> {
    /// Client for `base_url` (e.g. `http://host:8083/api/0`) with the default
    /// two-minute per-call timeout.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self::with_transport(
            base_url,
            ReqwestTransport::new(DEFAULT_TIMEOUT)?,
        ))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::with_transport(
            &config.base_url,
            ReqwestTransport::new(config.timeout())?,
        ))
    }
}

impl<T> RecorderClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET request for `base_url + path` with `params` as the query string.
    pub fn build_request(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint(path, params)?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn build_users(&self) -> Result<HttpRequest, ApiError> {
        self.build_request("/list", &[])
    }

    pub fn build_devices(&self, user: &str) -> Result<HttpRequest, ApiError> {
        self.build_request("/list", &[("user", user)])
    }

    pub fn build_locations(
        &self,
        user: &str,
        device: &str,
        from: &DateTime<FixedOffset>,
        to: &DateTime<FixedOffset>,
    ) -> Result<HttpRequest, ApiError> {
        let from = format_timestamp(from);
        let to = format_timestamp(to);
        self.build_request(
            "/locations",
            &[("user", user), ("device", device), ("from", &from), ("to", &to)],
        )
    }

    pub fn build_version(&self) -> Result<HttpRequest, ApiError> {
        self.build_request("/version", &[])
    }

    pub fn build_publish(
        &self,
        user: &str,
        device: &str,
        location: &Location,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint("/pub", &[])?;
        let body = serde_json::to_string(location).map_err(ApiError::Encode)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: vec![
                (USER_HEADER.to_string(), user.to_string()),
                (DEVICE_HEADER.to_string(), device.to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        })
    }

    pub fn parse_users(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        decode::<ListResponse>(&response).map(|list| list.results)
    }

    pub fn parse_devices(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        decode::<ListResponse>(&response).map(|list| list.results)
    }

    pub fn parse_locations(&self, response: HttpResponse) -> Result<LocationList, ApiError> {
        decode(&response)
    }

    pub fn parse_version(&self, response: HttpResponse) -> Result<Version, ApiError> {
        decode(&response)
    }

    /// The body of a publish response carries nothing of interest.
    pub fn parse_publish(&self, _response: HttpResponse) -> Result<(), ApiError> {
        Ok(())
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::MalformedUrl(format!("{}: {e}", self.base_url)))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::MalformedUrl(format!(
                "{}: cannot carry a path",
                self.base_url
            )));
        }

        let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

impl<T: Transport> RecorderClient<T> {
    async fn round_trip(
        &self,
        ctx: &RequestContext,
        request: HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending recorder request");
        let result = ctx.run(self.transport.execute(request)).await;
        match &result {
            Ok(response) => debug!(status = response.status, "recorder responded"),
            Err(err) => warn!(error = %err, "recorder request failed"),
        }
        result
    }
}

#[async_trait]
impl<T: Transport> Recorder for RecorderClient<T> {
    async fn users(&self, ctx: &RequestContext) -> Result<Vec<String>, ApiError> {
        let request = self.build_users()?;
        let response = self.round_trip(ctx, request).await?;
        self.parse_users(response)
    }

    async fn devices(&self, ctx: &RequestContext, user: &str) -> Result<Vec<String>, ApiError> {
        let request = self.build_devices(user)?;
        let response = self.round_trip(ctx, request).await?;
        self.parse_devices(response)
    }

    async fn locations(
        &self,
        ctx: &RequestContext,
        user: &str,
        device: &str,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<LocationList, ApiError> {
        let request = self.build_locations(user, device, &from, &to)?;
        let response = self.round_trip(ctx, request).await?;
        self.parse_locations(response)
    }

    async fn publish(
        &self,
        ctx: &RequestContext,
        user: &str,
        device: &str,
        location: &Location,
    ) -> Result<(), ApiError> {
        let request = self.build_publish(user, device, location)?;
        let response = self.round_trip(ctx, request).await?;
        self.parse_publish(response)
    }

    async fn version(&self, ctx: &RequestContext) -> Result<Version, ApiError> {
        let request = self.build_version()?;
        let response = self.round_trip(ctx, request).await?;
        self.parse_version(response)
    }
}

/// RFC3339 with whole seconds; UTC renders as `Z`, other offsets verbatim.
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode<D: DeserializeOwned>(response: &HttpResponse) -> Result<D, ApiError> {
    serde_json::from_str(&response.body).map_err(ApiError::Decode)
}
