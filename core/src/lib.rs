//! Async client for the OwnTracks Recorder HTTP API.
//!
//! # Overview
//! Lists users and devices, fetches location history, publishes new reports,
//! reads the server version, and checks whether a report has already been
//! recorded.
//!
//! # Design
//! - `Recorder` is the capability trait callers depend on; `RecorderClient`
//!   is the HTTP implementation.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`) around a pluggable `Transport`,
//!   so request construction and decoding are testable without a network.
//! - Every operation takes a `RequestContext` for cancellation and deadlines.
//!   Nothing is retried.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod recorder;
pub mod types;

pub use client::{RecorderClient, DEVICE_HEADER, USER_HEADER};
pub use config::{ClientConfig, ConfigError, DEFAULT_TIMEOUT};
pub use context::RequestContext;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use recorder::{exists_window, Recorder};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    Battery, BatteryStatus, ConnectivityStatus, ListResponse, Location, LocationList, Trigger,
    Version, WiFi,
};
