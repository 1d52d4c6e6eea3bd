//! The recorder capability set.
//!
//! `Recorder` is what callers program against. `RecorderClient` implements it
//! over HTTP; tests and downstream code can supply their own implementations.
//! `exists` is not a server endpoint. It is layered on `locations`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, SubsecRound, Utc};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::types::{Location, LocationList, Version};

#[async_trait]
pub trait Recorder: Send + Sync {
    /// Users known to the recorder.
    async fn users(&self, ctx: &RequestContext) -> Result<Vec<String>, ApiError>;

    /// Devices of `user`.
    async fn devices(&self, ctx: &RequestContext, user: &str) -> Result<Vec<String>, ApiError>;

    /// Locations of `user`/`device` strictly between `from` and `to`.
    async fn locations(
        &self,
        ctx: &RequestContext,
        user: &str,
        device: &str,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> Result<LocationList, ApiError>;

    async fn publish(
        &self,
        ctx: &RequestContext,
        user: &str,
        device: &str,
        location: &Location,
    ) -> Result<(), ApiError>;

    async fn version(&self, ctx: &RequestContext) -> Result<Version, ApiError>;

    /// Whether a report at the same instant and the same coordinates as
    /// `candidate` is already stored for `user`/`device`.
    ///
    /// Issues exactly one `locations` call over [`exists_window`]. Any error
    /// from that call is returned as is. A candidate too close to the edge of
    /// the representable range fails before any call is made.
    async fn exists(
        &self,
        ctx: &RequestContext,
        user: &str,
        device: &str,
        candidate: &Location,
    ) -> Result<bool, ApiError> {
        let (from, to) = exists_window(candidate)?;
        let list = self
            .locations(ctx, user, device, from.into(), to.into())
            .await?;

        if list.count <= 0 {
            debug!(user, device, %from, %to, "no locations in window");
            return Ok(false);
        }

        let found = list
            .data
            .iter()
            .any(|stored| stored.is_same_place_and_time(candidate));
        debug!(user, device, count = list.count, found, "checked for existing location");
        Ok(found)
    }
}

/// Query window used by [`Recorder::exists`].
///
/// The server's bounds are exclusive, so one second of padding on each side
/// of the candidate's whole-second `tst` keeps it inside the window.
pub fn exists_window(candidate: &Location) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let tst = candidate.timestamp.trunc_subsecs(0);
    let pad = Duration::seconds(1);
    let from = tst
        .checked_sub_signed(pad)
        .ok_or(ApiError::TimestampOutOfRange(candidate.timestamp))?;
    let to = tst
        .checked_add_signed(pad)
        .ok_or(ApiError::TimestampOutOfRange(candidate.timestamp))?;
    Ok((from, to))
}
