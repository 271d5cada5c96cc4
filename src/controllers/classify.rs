//! Presentation rules for a single controller record
//!
//! Everything here is a pure function of the record and total over all
//! inputs, including out-of-range capacities and unknown vendors.

use controller_tools_protocol::{
    BatteryStatus, ControllerRecord, VENDOR_GOOGLE, VENDOR_MICROSOFT, VENDOR_NINTENDO, VENDOR_SONY,
};
use serde::Serialize;

/// Brand used to pick the controller icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorCategory {
    Sony,
    Nintendo,
    Microsoft,
    Google,
    Other,
}

impl VendorCategory {
    pub fn from_vendor_id(vendor_id: u16) -> Self {
        match vendor_id {
            VENDOR_SONY => VendorCategory::Sony,
            VENDOR_NINTENDO => VendorCategory::Nintendo,
            VENDOR_MICROSOFT => VendorCategory::Microsoft,
            VENDOR_GOOGLE => VendorCategory::Google,
            _ => VendorCategory::Other,
        }
    }

    pub fn of(record: &ControllerRecord) -> Self {
        Self::from_vendor_id(record.vendor_id)
    }

    /// Icon identifier for the rendering layer
    pub fn icon(&self) -> &'static str {
        match self {
            VendorCategory::Sony => "playstation",
            VendorCategory::Nintendo => "switch",
            VendorCategory::Microsoft => "xbox",
            VendorCategory::Google => "stadia",
            VendorCategory::Other => "controller",
        }
    }
}

/// Battery icon bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatteryTier {
    Empty,
    Quarter,
    Half,
    ThreeQuarter,
    Full,
    Charging,
}

impl BatteryTier {
    pub fn icon(&self) -> &'static str {
        match self {
            BatteryTier::Empty => "battery-empty",
            BatteryTier::Quarter => "battery-quarter",
            BatteryTier::Half => "battery-half",
            BatteryTier::ThreeQuarter => "battery-three-quarters",
            BatteryTier::Full => "battery-full",
            BatteryTier::Charging => "battery-charging",
        }
    }
}

/// Pick the tier; charging wins over any capacity
pub fn tier_for(status: BatteryStatus, capacity: i32) -> BatteryTier {
    if status == BatteryStatus::Charging {
        return BatteryTier::Charging;
    }
    match capacity {
        c if c <= 0 => BatteryTier::Empty,
        c if c <= 25 => BatteryTier::Quarter,
        c if c <= 50 => BatteryTier::Half,
        c if c <= 75 => BatteryTier::ThreeQuarter,
        _ => BatteryTier::Full,
    }
}

pub fn battery_tier(record: &ControllerRecord) -> BatteryTier {
    tier_for(record.status, record.capacity)
}

/// Whether any battery data is worth showing
pub fn shows_battery(record: &ControllerRecord) -> bool {
    record.capacity > 0 || record.status != BatteryStatus::Unknown
}

/// Whether the percentage text is shown.
///
/// Xbox controllers only report capacity over Bluetooth, so for Microsoft
/// the percentage needs a positive capacity on a Bluetooth link.
pub fn shows_percentage(record: &ControllerRecord) -> bool {
    if !shows_battery(record) {
        return false;
    }
    match VendorCategory::of(record) {
        VendorCategory::Microsoft => record.capacity > 0 && record.bluetooth,
        _ => true,
    }
}

/// Link the controller is attached over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    Bluetooth,
    Usb,
}

impl Link {
    pub fn of(record: &ControllerRecord) -> Self {
        if record.bluetooth {
            Link::Bluetooth
        } else {
            Link::Usb
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Link::Bluetooth => "bluetooth",
            Link::Usb => "usb",
        }
    }
}
