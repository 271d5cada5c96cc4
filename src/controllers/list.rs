//! Controller list reconciliation
//!
//! Turns a fetched snapshot into ordered, keyed display rows and tracks
//! the loading/empty/populated state of the panel list. Each fetch gets a
//! ticket; only the newest ticket may change the list, so a slow stale
//! response can never overwrite a newer one.

use super::classify::{battery_tier, shows_battery, shows_percentage, BatteryTier, Link, VendorCategory};
use super::fetch::FetchError;
use controller_tools_protocol::ControllerRecord;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use icu_collator::{Collator, CollatorOptions};
use tracing::{debug, warn};

/// Battery part of a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BatteryIndicator {
    /// No usable data: capacity not positive and status unknown
    Unknown,
    Level {
        tier: BatteryTier,
        /// `"40%"`, absent when the percentage is suppressed
        percentage: Option<String>,
    },
}

impl BatteryIndicator {
    pub fn of(record: &ControllerRecord) -> Self {
        if !shows_battery(record) {
            return BatteryIndicator::Unknown;
        }
        BatteryIndicator::Level {
            tier: battery_tier(record),
            percentage: shows_percentage(record).then(|| format!("{}%", record.capacity)),
        }
    }

    pub fn percentage(&self) -> Option<&str> {
        match self {
            BatteryIndicator::Level { percentage, .. } => percentage.as_deref(),
            BatteryIndicator::Unknown => None,
        }
    }

    pub fn tier(&self) -> Option<BatteryTier> {
        match self {
            BatteryIndicator::Level { tier, .. } => Some(*tier),
            BatteryIndicator::Unknown => None,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            BatteryIndicator::Level { tier, .. } => tier.icon(),
            BatteryIndicator::Unknown => "battery-unknown",
        }
    }
}

/// One rendered controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerRow {
    /// Unique within the list; `vendorId:productId`, suffixed `#n` for repeats
    pub key: String,
    pub name: String,
    pub category: VendorCategory,
    pub link: Link,
    pub battery: BatteryIndicator,
}

impl ControllerRow {
    pub fn new(record: &ControllerRecord, key: String) -> Self {
        Self {
            key,
            name: record.name.clone(),
            category: VendorCategory::of(record),
            link: Link::of(record),
            battery: BatteryIndicator::of(record),
        }
    }
}

impl std::fmt::Display for ControllerRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] [{}] {}", self.link.icon(), self.category.icon(), self.name)?;
        if let Some(percentage) = self.battery.percentage() {
            write!(f, "  {}", percentage)?;
        }
        if self.battery != BatteryIndicator::Unknown {
            write!(f, " ({})", self.battery.icon())?;
        }
        Ok(())
    }
}

thread_local! {
    static COLLATOR: Option<Collator> = root_collator();
}

fn root_collator() -> Option<Collator> {
    match Collator::try_new(&Default::default(), CollatorOptions::new()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            warn!("Root collation unavailable, ordering by folded names: {}", e);
            None
        }
    }
}

/// Name ordering used for the list.
///
/// Root-locale collation: accents and case are secondary to the base
/// letters (`alpha < Beta < Élite < Zeta`). Names that collate equal keep
/// fetch order under a stable sort.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    COLLATOR.with(|collator| match collator {
        Some(collator) => collator.compare(a, b),
        None => a.to_lowercase().cmp(&b.to_lowercase()),
    })
}

/// Sort, classify and key a snapshot
pub fn build_rows(records: &[ControllerRecord]) -> Vec<ControllerRow> {
    let mut sorted: Vec<&ControllerRecord> = records.iter().collect();
    sorted.sort_by(|a, b| compare_names(&a.name, &b.name));

    let mut seen: HashMap<String, usize> = HashMap::new();
    sorted
        .into_iter()
        .map(|record| {
            let base = record.key();
            let count = seen.entry(base.clone()).or_insert(0);
            let key = if *count == 0 {
                base
            } else {
                debug!("Duplicate controller key {} ({})", base, record.name);
                format!("{}#{}", base, count)
            };
            *count += 1;
            ControllerRow::new(record, key)
        })
        .collect()
}

/// Display state of the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Empty,
    Populated(Vec<ControllerRow>),
}

impl ListState {
    fn from_rows(rows: Vec<ControllerRow>) -> Self {
        if rows.is_empty() {
            ListState::Empty
        } else {
            ListState::Populated(rows)
        }
    }

    /// Placeholder text for the non-populated states
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            ListState::Loading => Some("Loading..."),
            ListState::Empty => Some("No controllers found"),
            ListState::Populated(_) => None,
        }
    }
}

/// Identifies one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Reconciled controller list
#[derive(Debug)]
pub struct ControllerList {
    state: ListState,
    issued: u64,
    last_good: Vec<ControllerRow>,
    last_error: Option<String>,
}

impl Default for ControllerList {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerList {
    /// Starts empty, before any fetch
    pub fn new() -> Self {
        Self {
            state: ListState::Empty,
            issued: 0,
            last_good: Vec::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn rows(&self) -> &[ControllerRow] {
        match &self.state {
            ListState::Populated(rows) => rows,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == ListState::Loading
    }

    /// Error from the last applied fetch, if it failed
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Enter Loading and clear the rows; the returned ticket must be passed
    /// to [`ControllerList::apply`] with the fetch result.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        self.state = ListState::Loading;
        FetchTicket(self.issued)
    }

    /// Apply a fetch result. Returns `false` when the ticket is stale and
    /// the result was discarded.
    ///
    /// A failed fetch falls back to the last successful snapshot (Empty if
    /// there was none).
    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<ControllerRecord>, FetchError>,
    ) -> bool {
        if ticket.0 != self.issued {
            debug!("Discarding stale controller snapshot #{} (latest #{})", ticket.0, self.issued);
            return false;
        }

        match result {
            Ok(records) => {
                let rows = build_rows(&records);
                debug!("Controller snapshot #{}: {} rows", ticket.0, rows.len());
                self.last_good = rows.clone();
                self.last_error = None;
                self.state = ListState::from_rows(rows);
            }
            Err(e) => {
                warn!("Failed to fetch controllers: {}", e);
                self.last_error = Some(e.to_string());
                self.state = ListState::from_rows(self.last_good.clone());
            }
        }
        true
    }
}
