use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::availability::bottleneck;
use super::capacity::expand_offer;
use super::domain::{
    Allocation, AllocationId, AllocationRoomLine, AllocationStatus, DelegationId, HotelId, Offer,
    OfferId, OfferRoomLine, OfferStatus, RoomCategory, StayRange, TransitionError, ValidationError,
};
use super::ledger::{capacity_by_night, reservation_rows, reserved_by_night};
use super::repository::{EngineRepository, HotelDirectory, RepositoryError};

/// Lifecycle manager for offers and allocations.
///
/// Owns every write to the two derived ledgers: capacity rows change only
/// through offer transitions, reservation rows only through allocation
/// transitions. Every ledger-touching transition serializes per hotel, and
/// the confirm path re-reads the allocation under that lock, so a transition
/// landing between fetch and lock can never be overwritten by a stale copy.
pub struct AccommodationService<R, D> {
    store: Arc<R>,
    directory: Arc<D>,
    hotel_locks: Mutex<HashMap<HotelId, Arc<Mutex<()>>>>,
}

static OFFER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ALLOCATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_offer_id() -> OfferId {
    let id = OFFER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OfferId(format!("off-{id:06}"))
}

fn next_allocation_id() -> AllocationId {
    let id = ALLOCATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AllocationId(format!("alc-{id:06}"))
}

impl<R, D> AccommodationService<R, D>
where
    R: EngineRepository + 'static,
    D: HotelDirectory + 'static,
{
    pub fn new(store: Arc<R>, directory: Arc<D>) -> Self {
        Self {
            store,
            directory,
            hotel_locks: Mutex::new(HashMap::new()),
        }
    }

    // ---- offer store ----------------------------------------------------

    /// Register a hotel's room inventory for a stay window, in draft.
    pub fn create_offer(
        &self,
        hotel_id: HotelId,
        stay: StayRange,
        rooms: Vec<OfferRoomLine>,
    ) -> Result<Offer, EngineError> {
        self.require_hotel(&hotel_id)?;

        let offer = Offer {
            id: next_offer_id(),
            hotel_id,
            stay,
            status: OfferStatus::Draft,
            rooms,
            ever_confirmed: false,
        };
        let stored = self.store.insert_offer(offer)?;
        Ok(stored)
    }

    /// Replace an offer's stay window and/or room lines.
    ///
    /// Drafts are fully editable. Once an offer leaves draft its stay and
    /// per-category room counts are locked, but rate details
    /// (`price_per_night`, `complimentary`) stay editable; such an edit
    /// regenerates the offer's capacity slice.
    pub fn update_offer(
        &self,
        id: &OfferId,
        stay: Option<StayRange>,
        rooms: Option<Vec<OfferRoomLine>>,
    ) -> Result<Offer, EngineError> {
        let mut offer = self.require_offer(id)?;

        if offer.status == OfferStatus::Draft {
            if let Some(stay) = stay {
                offer.stay = stay;
            }
            if let Some(rooms) = rooms {
                offer.rooms = rooms;
            }
            self.store.update_offer(offer.clone())?;
            return Ok(offer);
        }

        let locked = TransitionError::OfferLocked {
            id: id.clone(),
            status: offer.status,
        };
        if stay.map_or(false, |requested| requested != offer.stay) {
            return Err(locked.into());
        }
        let Some(rooms) = rooms else {
            return Ok(offer);
        };
        if room_counts(&rooms) != room_counts(&offer.rooms) {
            return Err(locked.into());
        }
        offer.rooms = rooms;

        let lock = self.hotel_lock(&offer.hotel_id);
        let _serialized = lock.lock().expect("hotel lock poisoned");

        let entries = expand_offer(&offer);
        self.store
            .replace_capacity_for_offer(offer.clone(), entries)?;

        info!(offer = %offer.id, hotel = %offer.hotel_id, "offer rates updated, capacity rebuilt");
        Ok(offer)
    }

    /// Confirm an offer and rebuild its slice of the capacity ledger.
    ///
    /// Re-confirming an already-confirmed offer regenerates the same rows;
    /// the replace-by-offer-id swap keeps the rebuild idempotent.
    pub fn confirm_offer(&self, id: &OfferId) -> Result<Offer, EngineError> {
        let mut offer = self.require_offer(id)?;
        if offer.status == OfferStatus::Rejected {
            return Err(TransitionError::OfferRejected { id: id.clone() }.into());
        }

        let lock = self.hotel_lock(&offer.hotel_id);
        let _serialized = lock.lock().expect("hotel lock poisoned");

        offer.status = OfferStatus::Confirmed;
        offer.ever_confirmed = true;
        let entries = expand_offer(&offer);
        let nights = entries.len();
        self.store
            .replace_capacity_for_offer(offer.clone(), entries)?;

        info!(offer = %offer.id, hotel = %offer.hotel_id, rows = nights, "offer confirmed, capacity rebuilt");
        Ok(offer)
    }

    /// Reject an offer, clearing any capacity it contributed.
    pub fn reject_offer(&self, id: &OfferId) -> Result<Offer, EngineError> {
        let mut offer = self.require_offer(id)?;
        if offer.status == OfferStatus::Rejected {
            return Ok(offer);
        }

        let lock = self.hotel_lock(&offer.hotel_id);
        let _serialized = lock.lock().expect("hotel lock poisoned");

        offer.status = OfferStatus::Rejected;
        self.store
            .replace_capacity_for_offer(offer.clone(), Vec::new())?;

        info!(offer = %offer.id, hotel = %offer.hotel_id, "offer rejected, capacity cleared");
        Ok(offer)
    }

    /// Hard-delete an offer that never reached confirmation.
    pub fn delete_offer(&self, id: &OfferId) -> Result<(), EngineError> {
        let offer = self.require_offer(id)?;
        if offer.ever_confirmed {
            return Err(TransitionError::OfferRetained { id: id.clone() }.into());
        }
        self.store.remove_offer(id)?;
        Ok(())
    }

    // ---- allocation lifecycle -------------------------------------------

    /// Open a draft allocation. Drafts consume no capacity, so no
    /// availability check happens here. An empty `rooms` breakdown is seeded
    /// from the delegation's registered request.
    pub fn create_allocation(
        &self,
        delegation_id: DelegationId,
        hotel_id: HotelId,
        stay: StayRange,
        rooms: Vec<AllocationRoomLine>,
    ) -> Result<Allocation, EngineError> {
        self.require_hotel(&hotel_id)?;
        if delegation_id.0.trim().is_empty() {
            return Err(ValidationError::BlankIdentifier {
                field: "delegation_id",
            }
            .into());
        }
        let delegation = self
            .directory
            .delegation(&delegation_id)?
            .ok_or_else(|| EngineError::NotFound {
                kind: "delegation",
                id: delegation_id.0.clone(),
            })?;

        let rooms = if rooms.is_empty() {
            delegation.requested_rooms
        } else {
            rooms
        };

        let allocation = Allocation {
            id: next_allocation_id(),
            delegation_id,
            hotel_id,
            stay,
            status: AllocationStatus::Draft,
            rooms,
        };
        let stored = self.store.insert_allocation(allocation)?;
        Ok(stored)
    }

    /// Replace a draft allocation's stay window and/or room breakdown. A new
    /// room set fully supersedes the old rows.
    pub fn update_allocation(
        &self,
        id: &AllocationId,
        stay: Option<StayRange>,
        rooms: Option<Vec<AllocationRoomLine>>,
    ) -> Result<Allocation, EngineError> {
        let mut allocation = self.require_allocation(id)?;
        if allocation.status != AllocationStatus::Draft {
            return Err(TransitionError::AllocationLocked {
                id: id.clone(),
                status: allocation.status,
            }
            .into());
        }

        if let Some(stay) = stay {
            allocation.stay = stay;
        }
        if let Some(rooms) = rooms {
            allocation.rooms = rooms;
        }
        self.store.update_allocation(allocation.clone())?;
        Ok(allocation)
    }

    /// Confirm a draft allocation: check every room line against the
    /// bottleneck night, then write the reservation fan-out. All-or-nothing;
    /// an overbooked night leaves the allocation in draft and the ledger
    /// untouched.
    pub fn confirm_allocation(&self, id: &AllocationId) -> Result<Allocation, EngineError> {
        let allocation = self.require_allocation(id)?;
        if allocation.status != AllocationStatus::Draft {
            return Err(TransitionError::NotConfirmable {
                id: id.clone(),
                status: allocation.status,
            }
            .into());
        }

        // Read-check-write under the hotel lock; see module doc.
        let lock = self.hotel_lock(&allocation.hotel_id);
        let _serialized = lock.lock().expect("hotel lock poisoned");

        // A cancel or revert may have landed between the fetch above and the
        // lock; only the copy read under the lock may be committed.
        let allocation = self.require_allocation(id)?;
        if allocation.status != AllocationStatus::Draft {
            return Err(TransitionError::NotConfirmable {
                id: id.clone(),
                status: allocation.status,
            }
            .into());
        }

        let requested = requested_by_category(&allocation.rooms);
        if requested.is_empty() {
            return Err(ValidationError::NoRoomsRequested.into());
        }

        let capacity = self
            .store
            .capacity_between(allocation.stay, Some(&allocation.hotel_id))?;
        let reservations = self
            .store
            .reservations_between(allocation.stay, Some(&allocation.hotel_id))?;

        let shortfalls = night_shortfalls(&capacity, &reservations, &allocation, &requested);
        if !shortfalls.is_empty() {
            return Err(EngineError::Overbooked(OverbookingReport {
                allocation_id: allocation.id,
                shortfalls,
            }));
        }

        let mut confirmed = allocation;
        confirmed.status = AllocationStatus::Confirmed;
        let rows = reservation_rows(&confirmed);
        self.store.commit_confirmation(confirmed.clone(), rows)?;

        info!(
            allocation = %confirmed.id,
            delegation = %confirmed.delegation_id,
            hotel = %confirmed.hotel_id,
            "allocation confirmed"
        );
        Ok(confirmed)
    }

    /// Cancel an allocation from draft or confirmed. Terminal; the record is
    /// retained for audit history but excluded from every future
    /// availability and reporting computation.
    pub fn cancel_allocation(&self, id: &AllocationId) -> Result<Allocation, EngineError> {
        let allocation = self.require_allocation(id)?;
        let lock = self.hotel_lock(&allocation.hotel_id);
        let _serialized = lock.lock().expect("hotel lock poisoned");

        let mut allocation = self.require_allocation(id)?;
        if allocation.status == AllocationStatus::Cancelled {
            return Err(TransitionError::AlreadyCancelled { id: id.clone() }.into());
        }

        allocation.status = AllocationStatus::Cancelled;
        self.store.release_reservations(allocation.clone())?;

        info!(allocation = %allocation.id, hotel = %allocation.hotel_id, "allocation cancelled");
        Ok(allocation)
    }

    /// Move a confirmed allocation back to draft, freeing its capacity
    /// immediately.
    pub fn revert_allocation(&self, id: &AllocationId) -> Result<Allocation, EngineError> {
        let allocation = self.require_allocation(id)?;
        let lock = self.hotel_lock(&allocation.hotel_id);
        let _serialized = lock.lock().expect("hotel lock poisoned");

        let mut allocation = self.require_allocation(id)?;
        if allocation.status != AllocationStatus::Confirmed {
            return Err(TransitionError::NotRevertible {
                id: id.clone(),
                status: allocation.status,
            }
            .into());
        }

        allocation.status = AllocationStatus::Draft;
        self.store.release_reservations(allocation.clone())?;

        info!(allocation = %allocation.id, hotel = %allocation.hotel_id, "allocation reverted to draft");
        Ok(allocation)
    }

    /// Hard-delete a draft or cancelled allocation. Confirmed allocations
    /// must be cancelled first so the reservation trail is preserved.
    pub fn delete_allocation(&self, id: &AllocationId) -> Result<(), EngineError> {
        let allocation = self.require_allocation(id)?;
        let lock = self.hotel_lock(&allocation.hotel_id);
        let _serialized = lock.lock().expect("hotel lock poisoned");

        let allocation = self.require_allocation(id)?;
        if allocation.status == AllocationStatus::Confirmed {
            return Err(TransitionError::ConfirmedDelete { id: id.clone() }.into());
        }
        self.store.remove_allocation(id)?;
        Ok(())
    }

    // ---- queries --------------------------------------------------------

    /// Free rooms of one category across a stay window, bounded by the
    /// tightest night. Unknown hotels report zero: absence of capacity data
    /// is absence of inventory.
    pub fn availability(
        &self,
        hotel_id: &HotelId,
        category: RoomCategory,
        stay: StayRange,
        exclude: Option<&AllocationId>,
    ) -> Result<u32, EngineError> {
        let capacity = self.store.capacity_between(stay, Some(hotel_id))?;
        let reservations = self.store.reservations_between(stay, Some(hotel_id))?;
        Ok(bottleneck(&capacity, &reservations, stay, category, exclude))
    }

    // ---- internals ------------------------------------------------------

    fn hotel_lock(&self, hotel: &HotelId) -> Arc<Mutex<()>> {
        let mut registry = self.hotel_locks.lock().expect("hotel lock registry poisoned");
        registry.entry(hotel.clone()).or_default().clone()
    }

    fn require_hotel(&self, id: &HotelId) -> Result<(), EngineError> {
        if id.0.trim().is_empty() {
            return Err(ValidationError::BlankIdentifier { field: "hotel_id" }.into());
        }
        self.directory
            .hotel(id)?
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound {
                kind: "hotel",
                id: id.0.clone(),
            })
    }

    fn require_offer(&self, id: &OfferId) -> Result<Offer, EngineError> {
        self.store
            .fetch_offer(id)?
            .ok_or_else(|| EngineError::NotFound {
                kind: "offer",
                id: id.0.clone(),
            })
    }

    fn require_allocation(&self, id: &AllocationId) -> Result<Allocation, EngineError> {
        self.store
            .fetch_allocation(id)?
            .ok_or_else(|| EngineError::NotFound {
                kind: "allocation",
                id: id.0.clone(),
            })
    }
}

/// Per-category room totals of an offer's lines, for deciding whether an
/// edit changes the counts or only the rates.
fn room_counts(rooms: &[OfferRoomLine]) -> BTreeMap<RoomCategory, u32> {
    let mut counts: BTreeMap<RoomCategory, u32> = BTreeMap::new();
    for line in rooms {
        *counts.entry(line.category).or_default() += line.rooms;
    }
    counts
}

/// Collapse a room breakdown to positive per-category requests. Duplicate
/// lines for the same category are additive.
fn requested_by_category(rooms: &[AllocationRoomLine]) -> BTreeMap<RoomCategory, u32> {
    let mut requested: BTreeMap<RoomCategory, u32> = BTreeMap::new();
    for line in rooms {
        if line.rooms > 0 {
            *requested.entry(line.category).or_default() += line.rooms;
        }
    }
    requested
}

/// Every (night, category) pair where the request exceeds what is left once
/// other confirmed allocations are counted. Overbooking is judged per night,
/// never per stay-average.
fn night_shortfalls(
    capacity: &[super::domain::CapacityEntry],
    reservations: &[super::domain::ReservationEntry],
    allocation: &Allocation,
    requested: &BTreeMap<RoomCategory, u32>,
) -> Vec<NightShortfall> {
    let totals = capacity_by_night(capacity);
    let counted: Vec<_> = reservations
        .iter()
        .filter(|entry| entry.allocation_id != allocation.id)
        .cloned()
        .collect();
    let reserved = reserved_by_night(&counted);

    let mut shortfalls = Vec::new();
    for (&category, &want) in requested {
        for night in allocation.stay.nights() {
            let key = (night, category);
            let total = totals.get(&key).copied().unwrap_or(0);
            let held = reserved.get(&key).copied().unwrap_or(0);
            let available = total.saturating_sub(held);
            if want > available {
                shortfalls.push(NightShortfall {
                    night,
                    category,
                    requested: want,
                    available,
                });
            }
        }
    }
    shortfalls.sort_by(|a, b| (a.night, a.category).cmp(&(b.night, b.category)));
    shortfalls
}

/// One oversold (night, category) pair from a failed confirmation, with
/// enough detail for the caller to trim the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NightShortfall {
    pub night: NaiveDate,
    pub category: RoomCategory,
    pub requested: u32,
    pub available: u32,
}

/// Per-night breakdown attached to a rejected confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverbookingReport {
    pub allocation_id: AllocationId,
    pub shortfalls: Vec<NightShortfall>,
}

impl fmt::Display for OverbookingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocation {} overbooks {} night/category pair(s):",
            self.allocation_id,
            self.shortfalls.len()
        )?;
        for shortfall in &self.shortfalls {
            write!(
                f,
                " {} {} (requested {}, available {})",
                shortfall.night,
                shortfall.category.label(),
                shortfall.requested,
                shortfall.available
            )?;
        }
        Ok(())
    }
}

/// Error raised by the lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{0}")]
    Overbooked(OverbookingReport),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
