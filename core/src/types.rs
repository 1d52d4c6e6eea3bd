//! Domain types for the recorder API.
//!
//! # Design
//! `Location` mirrors the recorder's JSON record. Battery and WiFi data are
//! held as named sub-records and flattened back to top-level keys on the wire,
//! so callers see `location.battery.level` while the server sees `batt`.
//!
//! Optional attributes are `Option` and skipped when unset; `lat`, `lon` and
//! `tst` are always emitted. Coordinate ranges are not validated here.
//!
//! `tst` is epoch seconds on the wire. Sub-second precision never survives a
//! publish, so time comparisons are made at whole-second resolution.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Why the device generated a location report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    #[serde(rename = "p")]
    Ping,
    /// Entered or left a circular region.
    #[serde(rename = "c")]
    CircularRegion,
    /// Entered or left a beacon region.
    #[serde(rename = "b")]
    BeaconRegion,
    /// Answer to a reportLocation request.
    #[serde(rename = "r")]
    Response,
    #[serde(rename = "u")]
    Manual,
    #[serde(rename = "t")]
    Timer,
    #[serde(rename = "v")]
    FrequentLocationsMonitoring,
}

impl Trigger {
    pub const ALL: [Trigger; 7] = [
        Trigger::Ping,
        Trigger::CircularRegion,
        Trigger::BeaconRegion,
        Trigger::Response,
        Trigger::Manual,
        Trigger::Timer,
        Trigger::FrequentLocationsMonitoring,
    ];

    /// Single-character code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Trigger::Ping => "p",
            Trigger::CircularRegion => "c",
            Trigger::BeaconRegion => "b",
            Trigger::Response => "r",
            Trigger::Manual => "u",
            Trigger::Timer => "t",
            Trigger::FrequentLocationsMonitoring => "v",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Ping => "Ping",
            Trigger::CircularRegion => "CircularRegion",
            Trigger::BeaconRegion => "BeaconRegion",
            Trigger::Response => "Response",
            Trigger::Manual => "Manual",
            Trigger::Timer => "Timer",
            Trigger::FrequentLocationsMonitoring => "FrequentLocationsMonitoring",
        };
        f.write_str(name)
    }
}

/// Network attachment of the device when the report was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectivityStatus {
    #[serde(rename = "w")]
    WiFi,
    #[serde(rename = "o")]
    Offline,
    #[serde(rename = "m")]
    Mobile,
}

impl ConnectivityStatus {
    pub fn code(self) -> &'static str {
        match self {
            ConnectivityStatus::WiFi => "w",
            ConnectivityStatus::Offline => "o",
            ConnectivityStatus::Mobile => "m",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        [Self::WiFi, Self::Offline, Self::Mobile]
            .into_iter()
            .find(|c| c.code() == code)
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectivityStatus::WiFi => "WiFi",
            ConnectivityStatus::Offline => "Offline",
            ConnectivityStatus::Mobile => "Mobile",
        };
        f.write_str(name)
    }
}

/// Charging state, integer-coded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum BatteryStatus {
    #[default]
    Unknown = 0,
    Unplugged = 1,
    Charging = 2,
    Full = 3,
}

impl BatteryStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for BatteryStatus {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(BatteryStatus::Unknown),
            1 => Ok(BatteryStatus::Unplugged),
            2 => Ok(BatteryStatus::Charging),
            3 => Ok(BatteryStatus::Full),
            other => Err(other),
        }
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatteryStatus::Unknown => "Unknown",
            BatteryStatus::Unplugged => "Unplugged",
            BatteryStatus::Charging => "Charging",
            BatteryStatus::Full => "Full",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// Charge level in percent, 0-100.
    #[serde(rename = "batt", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(rename = "bs", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BatteryStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WiFi {
    #[serde(rename = "SSID", default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(rename = "BSSID", default, skip_serializing_if = "Option::is_none")]
    pub bssid: Option<String>,
}

/// A single location report as stored by the recorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(rename = "tst", with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isotst", default, skip_serializing_if = "Option::is_none")]
    pub iso_timestamp: Option<String>,
    #[serde(rename = "isorcv", default, skip_serializing_if = "Option::is_none")]
    pub iso_received: Option<String>,

    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,

    #[serde(rename = "acc", default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(rename = "vac", default, skip_serializing_if = "Option::is_none")]
    pub vertical_accuracy: Option<i32>,
    #[serde(rename = "alt", default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(rename = "rad", default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<i32>,

    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
    #[serde(rename = "tid", default, skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<String>,
    #[serde(rename = "ghash", default, skip_serializing_if = "Option::is_none")]
    pub geohash: Option<String>,

    /// Course over ground in degrees.
    #[serde(rename = "cog", default, skip_serializing_if = "Option::is_none")]
    pub course: Option<i32>,
    /// km/h
    #[serde(rename = "vel", default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<i32>,
    /// kPa
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub barometric_pressure: Option<f64>,
    #[serde(rename = "conn", default, skip_serializing_if = "Option::is_none")]
    pub connectivity: Option<ConnectivityStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(rename = "inregions", default, skip_serializing_if = "Vec::is_empty")]
    pub in_regions: Vec<String>,

    #[serde(rename = "addr", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(rename = "cc", default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    /// Metres travelled since the previous report.
    #[serde(rename = "dist", default, skip_serializing_if = "Option::is_none")]
    pub distance_travelled: Option<i64>,

    #[serde(flatten)]
    pub battery: Battery,
    #[serde(flatten)]
    pub wifi: WiFi,
}

impl Location {
    /// A report carrying only the required fields. The timestamp is
    /// truncated to the whole second the wire can carry.
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(0),
            latitude,
            longitude,
            ..Self::default()
        }
    }

    /// Exact coordinate equality. No distance tolerance is applied.
    pub fn is_same_place(&self, other: &Location) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }

    /// Equal to the second, matching what `tst` carries.
    pub fn is_same_time(&self, other: &Location) -> bool {
        self.timestamp.timestamp() == other.timestamp.timestamp()
    }

    pub fn is_same_place_and_time(&self, other: &Location) -> bool {
        self.is_same_time(other) && self.is_same_place(other)
    }
}

/// Envelope for `/list`: user names, or device names when filtered by user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub results: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationList {
    pub count: i64,
    #[serde(default)]
    pub data: Vec<Location>,
    #[serde(default)]
    pub status: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
}
