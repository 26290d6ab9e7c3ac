//! Read-only rollups of the capacity and reservation ledgers.
//!
//! Every report is computed fresh from the two ledgers on each call; nothing
//! here caches or mutates, so report correctness reduces to ledger
//! correctness.

pub mod views;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{
    AllocationId, AllocationStatus, DelegationId, HotelId, RoomCategory, StayRange,
};
use super::repository::{EngineRepository, HotelDirectory};
use super::service::EngineError;
use views::{
    occupancy_pct, CityReportRow, DelegationStayRow, GridCell, GridRow, HotelDayRow, OccupancyBand,
};

const UNKNOWN_CITY: &str = "(unknown)";

/// Optional narrowing for the hotel/day and delegation reports.
#[derive(Debug, Default, Clone)]
pub struct ReportFilters {
    pub hotel: Option<HotelId>,
    pub delegation: Option<DelegationId>,
    pub category: Option<RoomCategory>,
}

/// Grouping axis for the daily grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridScope {
    Hotel,
    City,
}

/// Reporting aggregator over the two ledgers. Read-only; takes no hotel
/// locks, a read-committed view is enough for best-effort reports.
pub struct OccupancyReporter<R, D> {
    store: Arc<R>,
    directory: Arc<D>,
}

impl<R, D> OccupancyReporter<R, D>
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    pub fn new(store: Arc<R>, directory: Arc<D>) -> Self {
        Self { store, directory }
    }

    /// Totals and occupancy per city, optionally narrowed to one city.
    pub fn city_report(
        &self,
        window: StayRange,
        city: Option<&str>,
    ) -> Result<Vec<CityReportRow>, EngineError> {
        let capacity = self.store.capacity_between(window, None)?;
        let reservations = self.store.reservations_between(window, None)?;

        let mut cities: HashMap<HotelId, String> = HashMap::new();
        let mut sums: BTreeMap<String, (u32, u32)> = BTreeMap::new();

        for entry in &capacity {
            let name = self.city_of(&mut cities, &entry.hotel_id)?;
            sums.entry(name).or_default().0 += entry.rooms_total;
        }
        for entry in &reservations {
            let name = self.city_of(&mut cities, &entry.hotel_id)?;
            sums.entry(name).or_default().1 += entry.rooms_reserved;
        }

        Ok(sums
            .into_iter()
            .filter(|(name, _)| city.map_or(true, |wanted| wanted == name))
            .map(|(name, (total, reserved))| CityReportRow {
                city: name,
                rooms_total: total,
                rooms_reserved: reserved,
                occupancy_pct: occupancy_pct(total, reserved),
            })
            .collect())
    }

    /// One row per (hotel, night, category) present in either ledger.
    pub fn hotel_day_report(
        &self,
        window: StayRange,
        filters: &ReportFilters,
    ) -> Result<Vec<HotelDayRow>, EngineError> {
        let capacity = self.store.capacity_between(window, filters.hotel.as_ref())?;
        let reservations = self
            .store
            .reservations_between(window, filters.hotel.as_ref())?;

        // Oversold keys with no capacity rows still get a row, with total 0.
        let mut sums: BTreeMap<(HotelId, NaiveDate, RoomCategory), (u32, u32)> = BTreeMap::new();
        for entry in &capacity {
            sums.entry((entry.hotel_id.clone(), entry.night, entry.category))
                .or_default()
                .0 += entry.rooms_total;
        }
        for entry in &reservations {
            sums.entry((entry.hotel_id.clone(), entry.night, entry.category))
                .or_default()
                .1 += entry.rooms_reserved;
        }

        let mut names: HashMap<HotelId, String> = HashMap::new();
        let mut rows = Vec::with_capacity(sums.len());
        for ((hotel_id, night, category), (total, reserved)) in sums {
            if filters.category.map_or(false, |wanted| wanted != category) {
                continue;
            }
            let hotel_name = self.hotel_name(&mut names, &hotel_id)?;
            rows.push(HotelDayRow {
                hotel_id,
                hotel_name,
                night,
                category,
                category_label: category.label(),
                rooms_total: total,
                rooms_reserved: reserved,
                rooms_available: total.saturating_sub(reserved),
                occupancy_pct: occupancy_pct(total, reserved),
            });
        }
        Ok(rows)
    }

    /// Which delegation holds which rooms, night by night, with the owning
    /// allocation's current status attached.
    pub fn delegation_stay_report(
        &self,
        window: StayRange,
        filters: &ReportFilters,
    ) -> Result<Vec<DelegationStayRow>, EngineError> {
        let reservations = self
            .store
            .reservations_between(window, filters.hotel.as_ref())?;

        let mut statuses: HashMap<AllocationId, AllocationStatus> = HashMap::new();
        let mut delegation_names: HashMap<DelegationId, String> = HashMap::new();

        let mut rows = Vec::new();
        for entry in reservations {
            if filters
                .delegation
                .as_ref()
                .map_or(false, |wanted| *wanted != entry.delegation_id)
            {
                continue;
            }

            let status = match statuses.get(&entry.allocation_id) {
                Some(status) => *status,
                None => {
                    let status = self
                        .store
                        .fetch_allocation(&entry.allocation_id)?
                        .map(|allocation| allocation.status)
                        .unwrap_or(AllocationStatus::Confirmed);
                    statuses.insert(entry.allocation_id.clone(), status);
                    status
                }
            };

            let delegation_name = match delegation_names.get(&entry.delegation_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .directory
                        .delegation(&entry.delegation_id)?
                        .map(|profile| profile.name)
                        .unwrap_or_else(|| entry.delegation_id.0.clone());
                    delegation_names.insert(entry.delegation_id.clone(), name.clone());
                    name
                }
            };

            rows.push(DelegationStayRow {
                allocation_id: entry.allocation_id,
                delegation_id: entry.delegation_id,
                delegation_name,
                hotel_id: entry.hotel_id,
                night: entry.night,
                category: entry.category,
                category_label: entry.category.label(),
                rooms: entry.rooms_reserved,
                status,
                status_label: status.label(),
            });
        }

        rows.sort_by(|a, b| {
            (&a.delegation_id.0, a.night, a.category).cmp(&(&b.delegation_id.0, b.night, b.category))
        });
        Ok(rows)
    }

    /// Heatmap grid: one row per hotel or city, one cell per night, each
    /// cell banded by occupancy.
    pub fn daily_grid(
        &self,
        window: StayRange,
        scope: GridScope,
    ) -> Result<Vec<GridRow>, EngineError> {
        let capacity = self.store.capacity_between(window, None)?;
        let reservations = self.store.reservations_between(window, None)?;

        let mut cities: HashMap<HotelId, String> = HashMap::new();
        let mut names: HashMap<HotelId, String> = HashMap::new();

        // (key, label) -> night -> (total, reserved)
        let mut grid: BTreeMap<(String, String), HashMap<NaiveDate, (u32, u32)>> = BTreeMap::new();

        for entry in &capacity {
            let slot = self.grid_key(scope, &mut cities, &mut names, &entry.hotel_id)?;
            grid.entry(slot)
                .or_default()
                .entry(entry.night)
                .or_default()
                .0 += entry.rooms_total;
        }
        for entry in &reservations {
            let slot = self.grid_key(scope, &mut cities, &mut names, &entry.hotel_id)?;
            grid.entry(slot)
                .or_default()
                .entry(entry.night)
                .or_default()
                .1 += entry.rooms_reserved;
        }

        Ok(grid
            .into_iter()
            .map(|((key, label), nights)| {
                let cells = window
                    .nights()
                    .map(|night| {
                        let (total, reserved) = nights.get(&night).copied().unwrap_or((0, 0));
                        GridCell {
                            night,
                            occupancy_pct: occupancy_pct(total, reserved),
                            band: OccupancyBand::classify(total, reserved),
                            band_label: OccupancyBand::classify(total, reserved).label(),
                        }
                    })
                    .collect();
                GridRow { key, label, cells }
            })
            .collect())
    }

    fn city_of(
        &self,
        cache: &mut HashMap<HotelId, String>,
        hotel: &HotelId,
    ) -> Result<String, EngineError> {
        if let Some(city) = cache.get(hotel) {
            return Ok(city.clone());
        }
        let city = self
            .directory
            .hotel(hotel)?
            .map(|profile| profile.city)
            .unwrap_or_else(|| UNKNOWN_CITY.to_string());
        cache.insert(hotel.clone(), city.clone());
        Ok(city)
    }

    fn hotel_name(
        &self,
        cache: &mut HashMap<HotelId, String>,
        hotel: &HotelId,
    ) -> Result<String, EngineError> {
        if let Some(name) = cache.get(hotel) {
            return Ok(name.clone());
        }
        let name = self
            .directory
            .hotel(hotel)?
            .map(|profile| profile.name)
            .unwrap_or_else(|| hotel.0.clone());
        cache.insert(hotel.clone(), name.clone());
        Ok(name)
    }

    fn grid_key(
        &self,
        scope: GridScope,
        cities: &mut HashMap<HotelId, String>,
        names: &mut HashMap<HotelId, String>,
        hotel: &HotelId,
    ) -> Result<(String, String), EngineError> {
        match scope {
            GridScope::Hotel => {
                let name = self.hotel_name(names, hotel)?;
                Ok((hotel.0.clone(), name))
            }
            GridScope::City => {
                let city = self.city_of(cities, hotel)?;
                Ok((city.clone(), city))
            }
        }
    }
}
