use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::domain::{
    AllocationId, AllocationStatus, DelegationId, HotelId, RoomCategory,
};

/// Occupancy bands for the daily grid. Thresholds are fixed constants, not
/// per-event configuration.
pub const MEDIUM_OCCUPANCY_PCT: f64 = 80.0;
pub const CRITICAL_OCCUPANCY_PCT: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyBand {
    Unavailable,
    Low,
    Medium,
    Critical,
}

impl OccupancyBand {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unavailable => "Unavailable",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::Critical => "Critical",
        }
    }

    /// A day with no capacity data is unavailable, not 0% occupied.
    pub fn classify(rooms_total: u32, rooms_reserved: u32) -> Self {
        if rooms_total == 0 {
            return Self::Unavailable;
        }
        let pct = occupancy_pct(rooms_total, rooms_reserved);
        if pct > CRITICAL_OCCUPANCY_PCT {
            Self::Critical
        } else if pct > MEDIUM_OCCUPANCY_PCT {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

pub fn occupancy_pct(rooms_total: u32, rooms_reserved: u32) -> f64 {
    if rooms_total == 0 {
        return 0.0;
    }
    f64::from(rooms_reserved) / f64::from(rooms_total) * 100.0
}

/// Rollup of every hotel in one city over the queried window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityReportRow {
    pub city: String,
    pub rooms_total: u32,
    pub rooms_reserved: u32,
    pub occupancy_pct: f64,
}

/// One (hotel, night, category) slice of the two ledgers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelDayRow {
    pub hotel_id: HotelId,
    pub hotel_name: String,
    pub night: NaiveDate,
    pub category: RoomCategory,
    pub category_label: &'static str,
    pub rooms_total: u32,
    pub rooms_reserved: u32,
    pub rooms_available: u32,
    pub occupancy_pct: f64,
}

/// One reservation row with its owning allocation's current status attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelegationStayRow {
    pub allocation_id: AllocationId,
    pub delegation_id: DelegationId,
    pub delegation_name: String,
    pub hotel_id: HotelId,
    pub night: NaiveDate,
    pub category: RoomCategory,
    pub category_label: &'static str,
    pub rooms: u32,
    pub status: AllocationStatus,
    pub status_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub night: NaiveDate,
    pub occupancy_pct: f64,
    pub band: OccupancyBand,
    pub band_label: &'static str,
}

/// One grid row per hotel or city, one cell per night in the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub key: String,
    pub label: String,
    pub cells: Vec<GridCell>,
}
