use std::collections::HashMap;

use chrono::NaiveDate;

use super::domain::{Allocation, CapacityEntry, ReservationEntry, RoomCategory};

/// Fan a confirmed allocation out into one reservation row per
/// (night, room line). Written to the store only by the lifecycle manager as
/// a side effect of confirmation; removed on cancel and revert.
pub fn reservation_rows(allocation: &Allocation) -> Vec<ReservationEntry> {
    let mut rows = Vec::new();
    for night in allocation.stay.nights() {
        for line in &allocation.rooms {
            if line.rooms == 0 {
                continue;
            }
            rows.push(ReservationEntry {
                allocation_id: allocation.id.clone(),
                delegation_id: allocation.delegation_id.clone(),
                hotel_id: allocation.hotel_id.clone(),
                night,
                category: line.category,
                rooms_reserved: line.rooms,
            });
        }
    }
    rows
}

/// Sum capacity rows per (night, category). Multiple offers covering the
/// same key are additive.
pub(crate) fn capacity_by_night(
    entries: &[CapacityEntry],
) -> HashMap<(NaiveDate, RoomCategory), u32> {
    let mut totals: HashMap<(NaiveDate, RoomCategory), u32> = HashMap::new();
    for entry in entries {
        *totals.entry((entry.night, entry.category)).or_default() += entry.rooms_total;
    }
    totals
}

/// Sum reservation rows per (night, category).
pub(crate) fn reserved_by_night(
    entries: &[ReservationEntry],
) -> HashMap<(NaiveDate, RoomCategory), u32> {
    let mut totals: HashMap<(NaiveDate, RoomCategory), u32> = HashMap::new();
    for entry in entries {
        *totals.entry((entry.night, entry.category)).or_default() += entry.rooms_reserved;
    }
    totals
}
