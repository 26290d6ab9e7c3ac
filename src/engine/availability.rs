use super::domain::{AllocationId, CapacityEntry, ReservationEntry, RoomCategory, StayRange};
use super::ledger::{capacity_by_night, reserved_by_night};

/// Free rooms of one category across a stay window, as bounded by its
/// tightest night.
///
/// For each night: `total - reserved`, where a night with no capacity rows
/// counts as zero inventory rather than unlimited. The result is the minimum
/// over all nights, clamped at zero (a night can already be oversold through
/// another path). `exclude` drops one allocation's own reservations so a
/// confirmed allocation can ask how much room is left for itself.
///
/// Both slices must already be scoped to a single hotel; the repository
/// queries they come from filter by hotel id.
pub fn bottleneck(
    capacity: &[CapacityEntry],
    reservations: &[ReservationEntry],
    stay: StayRange,
    category: RoomCategory,
    exclude: Option<&AllocationId>,
) -> u32 {
    let totals = capacity_by_night(capacity);

    let counted: Vec<ReservationEntry> = reservations
        .iter()
        .filter(|entry| Some(&entry.allocation_id) != exclude)
        .cloned()
        .collect();
    let reserved = reserved_by_night(&counted);

    stay.nights()
        .map(|night| {
            let key = (night, category);
            let total = totals.get(&key).copied().unwrap_or(0);
            let held = reserved.get(&key).copied().unwrap_or(0);
            total.saturating_sub(held)
        })
        .min()
        .unwrap_or(0)
}
