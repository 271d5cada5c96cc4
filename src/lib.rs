//! Controller Tools companion
//!
//! The live-state side of the Controller Tools overlay panel.
//!
//! # Features
//! - Self-healing push-notification channel to the local backend (low battery alerts)
//! - Controller snapshot fetching with stale-response protection
//! - Vendor/battery classification and stable list ordering for the panel
//! - Optimistic settings toggles backed by a get/set/commit store

pub mod controllers;
pub mod core;
pub mod notifications;
pub mod panel;
pub mod plugin;

/// Product name, used as the toast title
pub const PRODUCT_NAME: &str = "Controller Tools";

pub use crate::core::config::Config;
pub use crate::core::events::{AppEvent, EventSender};
pub use crate::core::settings::{SettingKey, SettingsState};
pub use controllers::{ControllerList, ControllerRow, ListState};
pub use notifications::{NotificationChannel, NotificationEvent};
pub use panel::Panel;
pub use plugin::Plugin;
