//! Process-level plugin lifecycle
//!
//! The notification channel belongs to the plugin, not to the panel: it is
//! started once when the plugin loads and keeps running whether or not the
//! panel is open, until the plugin unloads.

use crate::controllers::HttpControllerSource;
use crate::core::config::Config;
use crate::core::events::EventSender;
use crate::core::settings::JsonSettingsStore;
use crate::notifications::{
    ChannelHandle, ChannelStatus, Connector, NotificationChannel, ToastSink, WsConnector,
};
use crate::panel::Panel;
use anyhow::{Context, Result};
use tracing::{debug, info};

pub struct Plugin {
    config: Config,
    channel: ChannelHandle,
}

impl Plugin {
    /// Load with the WebSocket transport
    pub fn load<S: ToastSink>(config: Config, sink: S, events: Option<EventSender>) -> Self {
        Self::load_with(config, WsConnector, sink, events)
    }

    /// Load with a custom transport
    pub fn load_with<C: Connector, S: ToastSink>(
        config: Config,
        connector: C,
        sink: S,
        events: Option<EventSender>,
    ) -> Self {
        info!("Loading {} (backend {})", crate::PRODUCT_NAME, config.backend.ws_url());

        let mut channel = NotificationChannel::new(config.backend.ws_url(), connector, sink)
            .with_title(config.notifications.title.clone())
            .with_reconnect_delay(config.notifications.reconnect_delay());
        if let Some(events) = events {
            channel = channel.with_events(events);
        }

        Self {
            channel: channel.start(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.channel.status()
    }

    /// Build a panel wired to the configured backend and settings file
    pub fn panel(&self) -> Result<Panel<HttpControllerSource, JsonSettingsStore>> {
        open_panel(&self.config)
    }

    /// Stop the notification channel
    pub async fn unload(self) {
        info!("Unloading {}", crate::PRODUCT_NAME);
        self.channel.stop().await;
    }
}

/// Panel against the configured backend, without starting the channel.
///
/// An unreadable settings file does not stop the panel; it starts from
/// default settings and the next toggle rewrites the file.
pub fn open_panel(config: &Config) -> Result<Panel<HttpControllerSource, JsonSettingsStore>> {
    let source = HttpControllerSource::from_config(&config.backend)
        .context("Failed to create controller client")?;
    let store = JsonSettingsStore::open_or_empty(config.settings_path()?);
    debug!("Panel settings at {:?}", store.path());
    Ok(Panel::new(source, store).with_refresh_settle(config.panel.refresh_settle()))
}

/// Open the JSON settings store named by the config
pub fn open_settings(config: &Config) -> Result<JsonSettingsStore> {
    let path = config.settings_path()?;
    JsonSettingsStore::open(&path).with_context(|| format!("Failed to open settings: {:?}", path))
}
