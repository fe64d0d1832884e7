//! Adaptive data-loading strategy.
//!
//! Pure mapping from (total item count, device class) to a load plan:
//! where filtering/sorting/pagination happens, page size, prefetch reach
//! and cache lifetime. Recomputed whenever the total or the device class
//! changes; never persisted.

use serde::{Deserialize, Serialize};

/// Below this floor the loading overhead dominates any filtering benefit,
/// so everything stays client-side regardless of device.
pub const CLIENT_MODE_FLOOR: usize = 20;

// Per-device item thresholds for leaving client mode.
const MOBILE_THRESHOLD: usize = 50;
const TABLET_THRESHOLD: usize = 100;
const DESKTOP_THRESHOLD: usize = 500;

// Client mode loads the whole collection, so pages are large; server and
// hybrid pages stay small to bound transfer size.
const CLIENT_PAGE_SIZES: [u32; 3] = [100, 200, 500];
const SERVER_PAGE_SIZES: [u32; 3] = [20, 50, 100];

// Cache lifetimes: shorter for data more likely to go stale from
// concurrent edits on the server.
const CLIENT_CACHE_MS: u64 = 10 * 60 * 1000;
const HYBRID_CACHE_MS: u64 = 5 * 60 * 1000;
const SERVER_CACHE_MS: u64 = 2 * 60 * 1000;

const PREFETCH_DISTANCE: u32 = 2;
const PREFETCH_DISTANCE_MOBILE: u32 = 1;

// Device-class memory cutoffs (the dashboard original keyed off viewport
// width; a desktop core classifies the machine instead).
const MOBILE_CLASS_MAX_BYTES: u64 = 4 * 1024 * 1024 * 1024;
const TABLET_CLASS_MAX_BYTES: u64 = 8 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    /// Classifies the host from total system memory. Config can override.
    pub fn detect() -> Self {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        Self::from_total_memory(sys.total_memory())
    }

    pub fn from_total_memory(bytes: u64) -> Self {
        if bytes <= MOBILE_CLASS_MAX_BYTES {
            Self::Mobile
        } else if bytes <= TABLET_CLASS_MAX_BYTES {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Mobile => 0,
            Self::Tablet => 1,
            Self::Desktop => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Whole filtered collection resident; filtering/sorting/pagination
    /// all local.
    Client,
    /// Server does everything; the client only holds the visible window.
    Server,
    /// Initial server page, then client-side refinement within it.
    Hybrid,
}

/// Per-device item counts above which client mode is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyThresholds {
    pub mobile: usize,
    pub tablet: usize,
    pub desktop: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            mobile: MOBILE_THRESHOLD,
            tablet: TABLET_THRESHOLD,
            desktop: DESKTOP_THRESHOLD,
        }
    }
}

impl StrategyThresholds {
    fn for_device(&self, device: DeviceClass) -> usize {
        match device {
            DeviceClass::Mobile => self.mobile,
            DeviceClass::Tablet => self.tablet,
            DeviceClass::Desktop => self.desktop,
        }
    }
}

/// Chooses where filtering/pagination computation happens.
///
/// Small collections stay client-side. Above its threshold a non-desktop
/// device goes straight to server mode (weak clients must not hold large
/// in-memory collections); desktop tolerates up to twice its threshold in
/// hybrid mode before conceding to the server as well.
pub fn select_strategy(
    total_items: usize,
    device: DeviceClass,
    thresholds: &StrategyThresholds,
    forced: Option<LoadStrategy>,
) -> LoadStrategy {
    if let Some(strategy) = forced {
        return strategy;
    }
    if total_items <= CLIENT_MODE_FLOOR {
        return LoadStrategy::Client;
    }
    let threshold = thresholds.for_device(device);
    if total_items <= threshold {
        return LoadStrategy::Client;
    }
    if device != DeviceClass::Desktop || total_items > threshold * 2 {
        return LoadStrategy::Server;
    }
    LoadStrategy::Hybrid
}

pub fn page_size(device: DeviceClass, strategy: LoadStrategy) -> u32 {
    match strategy {
        LoadStrategy::Client => CLIENT_PAGE_SIZES[device.index()],
        LoadStrategy::Server | LoadStrategy::Hybrid => SERVER_PAGE_SIZES[device.index()],
    }
}

pub fn cache_time_ms(strategy: LoadStrategy) -> u64 {
    match strategy {
        LoadStrategy::Client => CLIENT_CACHE_MS,
        LoadStrategy::Hybrid => HYBRID_CACHE_MS,
        LoadStrategy::Server => SERVER_CACHE_MS,
    }
}

pub fn prefetch_distance(device: DeviceClass) -> u32 {
    match device {
        DeviceClass::Mobile => PREFETCH_DISTANCE_MOBILE,
        _ => PREFETCH_DISTANCE,
    }
}

/// Derived loading plan. Never persisted; rebuilt on total/device change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLoadPlan {
    pub strategy: LoadStrategy,
    pub page_size: u32,
    pub should_paginate: bool,
    pub should_use_server_filters: bool,
    pub prefetch_distance: u32,
    pub cache_time_ms: u64,
}

impl DataLoadPlan {
    pub fn build(
        total_items: usize,
        device: DeviceClass,
        thresholds: &StrategyThresholds,
        forced: Option<LoadStrategy>,
    ) -> Self {
        let strategy = select_strategy(total_items, device, thresholds, forced);
        Self {
            strategy,
            page_size: page_size(device, strategy),
            should_paginate: strategy != LoadStrategy::Client,
            should_use_server_filters: strategy != LoadStrategy::Client,
            prefetch_distance: prefetch_distance(device),
            cache_time_ms: cache_time_ms(strategy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> StrategyThresholds {
        StrategyThresholds::default()
    }

    #[test]
    fn test_tiny_collections_stay_client_side() {
        assert_eq!(
            select_strategy(15, DeviceClass::Mobile, &defaults(), None),
            LoadStrategy::Client
        );
        assert_eq!(
            select_strategy(20, DeviceClass::Desktop, &defaults(), None),
            LoadStrategy::Client
        );
    }

    #[test]
    fn test_mobile_above_threshold_goes_server() {
        assert_eq!(
            select_strategy(60, DeviceClass::Mobile, &defaults(), None),
            LoadStrategy::Server
        );
    }

    #[test]
    fn test_desktop_below_threshold_stays_client() {
        assert_eq!(
            select_strategy(80, DeviceClass::Desktop, &defaults(), None),
            LoadStrategy::Client
        );
    }

    #[test]
    fn test_desktop_above_threshold_goes_hybrid() {
        assert_eq!(
            select_strategy(600, DeviceClass::Desktop, &defaults(), None),
            LoadStrategy::Hybrid
        );
    }

    #[test]
    fn test_desktop_past_double_threshold_goes_server() {
        assert_eq!(
            select_strategy(1001, DeviceClass::Desktop, &defaults(), None),
            LoadStrategy::Server
        );
    }

    #[test]
    fn test_forced_override_wins() {
        assert_eq!(
            select_strategy(5, DeviceClass::Mobile, &defaults(), Some(LoadStrategy::Server)),
            LoadStrategy::Server
        );
    }

    #[test]
    fn test_plan_flags_follow_strategy() {
        let client = DataLoadPlan::build(10, DeviceClass::Desktop, &defaults(), None);
        assert_eq!(client.strategy, LoadStrategy::Client);
        assert!(!client.should_paginate);
        assert!(!client.should_use_server_filters);
        assert_eq!(client.page_size, 500);
        assert_eq!(client.cache_time_ms, 10 * 60 * 1000);

        let server = DataLoadPlan::build(200, DeviceClass::Mobile, &defaults(), None);
        assert_eq!(server.strategy, LoadStrategy::Server);
        assert!(server.should_paginate);
        assert!(server.should_use_server_filters);
        assert_eq!(server.page_size, 20);
        assert_eq!(server.prefetch_distance, 1);
        assert_eq!(server.cache_time_ms, 2 * 60 * 1000);

        let hybrid = DataLoadPlan::build(600, DeviceClass::Desktop, &defaults(), None);
        assert_eq!(hybrid.strategy, LoadStrategy::Hybrid);
        assert_eq!(hybrid.page_size, 100);
        assert_eq!(hybrid.prefetch_distance, 2);
        assert_eq!(hybrid.cache_time_ms, 5 * 60 * 1000);
    }

    #[test]
    fn test_device_class_from_memory() {
        assert_eq!(
            DeviceClass::from_total_memory(2 * 1024 * 1024 * 1024),
            DeviceClass::Mobile
        );
        assert_eq!(
            DeviceClass::from_total_memory(6 * 1024 * 1024 * 1024),
            DeviceClass::Tablet
        );
        assert_eq!(
            DeviceClass::from_total_memory(32 * 1024 * 1024 * 1024),
            DeviceClass::Desktop
        );
    }
}
