//! Shared types and wire format for the Controller Tools backend ↔ panel.
//!
//! This crate is intentionally lightweight (only `serde` + `serde_json`).
//! It defines:
//! - The controller snapshot record returned by `GET /controllers`
//! - Known vendor identifiers
//! - Default backend address and endpoint paths

use serde::{Deserialize, Serialize};

// ── Backend address ────────────────────────────────────────────────

/// Default port the backend listens on (HTTP + WebSocket)
pub const DEFAULT_BACKEND_PORT: u16 = 33220;

/// Default host of the backend
pub const DEFAULT_BACKEND_HOST: &str = "localhost";

/// Snapshot endpoint path
pub const CONTROLLERS_PATH: &str = "/controllers";

/// Notification WebSocket path
pub const WS_PATH: &str = "/ws";

/// `http://host:port/controllers`
pub fn controllers_url(host: &str, port: u16) -> String {
    format!("http://{}:{}{}", host, port, CONTROLLERS_PATH)
}

/// `ws://host:port/ws`
pub fn ws_url(host: &str, port: u16) -> String {
    format!("ws://{}:{}{}", host, port, WS_PATH)
}

// ── Vendor ids ─────────────────────────────────────────────────────

pub const VENDOR_SONY: u16 = 0x054C;
pub const VENDOR_NINTENDO: u16 = 0x057E;
pub const VENDOR_MICROSOFT: u16 = 0x045E;
pub const VENDOR_GOOGLE: u16 = 0x18D1;

// ── Snapshot records ───────────────────────────────────────────────

/// Battery status as reported by the backend.
///
/// Anything the backend sends that is not `charging` or `discharging`
/// is read as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryStatus {
    Charging,
    Discharging,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatteryStatus::Charging => write!(f, "charging"),
            BatteryStatus::Discharging => write!(f, "discharging"),
            BatteryStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// One connected controller in a snapshot.
///
/// `capacity` is a percentage in 0..=100; values outside that range are
/// sentinels meaning the level could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerRecord {
    pub name: String,
    pub product_id: u16,
    pub vendor_id: u16,
    pub capacity: i32,
    #[serde(default)]
    pub status: BatteryStatus,
    #[serde(default)]
    pub bluetooth: bool,
}

impl ControllerRecord {
    /// Display key: `vendorId:productId`
    pub fn key(&self) -> String {
        format!("{}:{}", self.vendor_id, self.product_id)
    }

    pub fn is_charging(&self) -> bool {
        self.status == BatteryStatus::Charging
    }
}

/// Decode a `GET /controllers` body.
pub fn decode_snapshot(body: &[u8]) -> Result<Vec<ControllerRecord>, serde_json::Error> {
    serde_json::from_slice(body)
}
