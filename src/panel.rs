//! Panel controller
//!
//! Everything the quick-access panel does, minus the widgets: loading the
//! settings, fetching and reconciling controllers, refresh, and the two
//! settings toggles.

use crate::controllers::{ControllerList, ControllerSource};
use crate::core::events::{AppEvent, EventSender};
use crate::core::settings::{
    write_bool, SettingKey, SettingsCache, SettingsError, SettingsRpc, SettingsState,
};
use std::time::Duration;
use tracing::{info, warn};

pub struct Panel<F: ControllerSource, R: SettingsRpc> {
    source: F,
    settings_rpc: R,
    controllers: ControllerList,
    settings: SettingsCache,
    refresh_settle: Duration,
    events: Option<EventSender>,
}

impl<F: ControllerSource, R: SettingsRpc> Panel<F, R> {
    pub fn new(source: F, settings_rpc: R) -> Self {
        Self {
            source,
            settings_rpc,
            controllers: ControllerList::new(),
            settings: SettingsCache::default(),
            refresh_settle: Duration::ZERO,
            events: None,
        }
    }

    /// Minimum time a manual refresh stays in the loading state
    pub fn with_refresh_settle(mut self, settle: Duration) -> Self {
        self.refresh_settle = settle;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn controllers(&self) -> &ControllerList {
        &self.controllers
    }

    pub fn settings(&self) -> SettingsState {
        self.settings.state()
    }

    /// Transient error from the last failed settings write
    pub fn settings_error(&self) -> Option<&str> {
        self.settings.error()
    }

    /// Panel became visible: read settings and fetch controllers
    pub async fn show(&mut self) {
        match SettingsState::load(&self.settings_rpc).await {
            Ok(state) => self.settings.replace(state),
            Err(e) => warn!("Failed to read settings, keeping current values: {}", e),
        }
        self.fetch(Duration::ZERO).await;
    }

    /// Refresh button
    pub async fn refresh(&mut self) {
        info!("Refreshing controller list");
        self.fetch(self.refresh_settle).await;
    }

    async fn fetch(&mut self, settle: Duration) {
        let ticket = self.controllers.begin_fetch();
        let (result, _) = tokio::join!(self.source.fetch(), tokio::time::sleep(settle));
        if self.controllers.apply(ticket, result) {
            let count = self.controllers.rows().len();
            self.emit(AppEvent::ControllersUpdated { count });
        }
    }

    /// Settings toggle. The cache changes immediately and is rolled back
    /// if the backend does not confirm.
    pub async fn toggle(&mut self, key: SettingKey, value: bool) -> Result<(), SettingsError> {
        let pending = self.settings.begin(key, value);
        let result = write_bool(&self.settings_rpc, key, value).await;
        let outcome = self.settings.finish(pending, result);
        match &outcome {
            Ok(()) => self.emit(AppEvent::SettingChanged {
                key: key.to_string(),
                value,
            }),
            Err(e) => self.emit(AppEvent::SettingFailed {
                key: key.to_string(),
                error: e.to_string(),
            }),
        }
        outcome
    }

    fn emit(&self, event: AppEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
