//! Controllers module - snapshot fetching and list presentation

pub mod classify;
pub mod fetch;
pub mod list;

pub use classify::{BatteryTier, Link, VendorCategory};
pub use fetch::{ControllerSource, FetchError, HttpControllerSource};
pub use list::{BatteryIndicator, ControllerList, ControllerRow, FetchTicket, ListState};
