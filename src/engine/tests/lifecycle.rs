use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::common::*;
use crate::engine::domain::{
    Allocation, AllocationId, AllocationRoomLine, AllocationStatus, CapacityEntry, HotelId, Offer,
    OfferId, ReservationEntry, RoomCategory, StayRange, TransitionError, ValidationError,
};
use crate::engine::ledger::{capacity_by_night, reserved_by_night};
use crate::engine::memory::InMemoryEngineStore;
use crate::engine::repository::{EngineRepository, RepositoryError};
use crate::engine::service::{AccommodationService, EngineError};

#[test]
fn basic_confirm_walkthrough() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft created");
    assert_eq!(allocation.status, AllocationStatus::Draft);

    // Drafts consume nothing.
    let before = service
        .availability(&hotel_a(), RoomCategory::Double, october_window(), None)
        .expect("availability");
    assert_eq!(before, 5);

    let confirmed = service
        .confirm_allocation(&allocation.id)
        .expect("confirmation succeeds");
    assert_eq!(confirmed.status, AllocationStatus::Confirmed);

    let after = service
        .availability(&hotel_a(), RoomCategory::Double, october_window(), None)
        .expect("availability");
    assert_eq!(after, 2);
}

#[test]
fn overbooking_is_rejected_atomically() {
    let (service, store) = build_service();
    seeded_offer(&service, 5);

    let first = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");
    service.confirm_allocation(&first.id).expect("confirm");

    let ledger_before = store.reservation_rows();

    let second = service
        .create_allocation(delegation_y(), hotel_a(), october_window(), doubles(4))
        .expect("draft");
    match service.confirm_allocation(&second.id) {
        Err(EngineError::Overbooked(report)) => {
            assert_eq!(report.allocation_id, second.id);
            // Both nights are short, and the detail names the gap.
            assert_eq!(report.shortfalls.len(), 2);
            let nights: Vec<_> = report.shortfalls.iter().map(|s| s.night).collect();
            assert_eq!(nights, vec![date(2026, 10, 16), date(2026, 10, 17)]);
            assert!(report
                .shortfalls
                .iter()
                .all(|s| s.requested == 4 && s.available == 2));
        }
        other => panic!("expected overbooking error, got {other:?}"),
    }

    // No stray ledger rows, status unchanged.
    assert_eq!(store.reservation_rows(), ledger_before);
    let stored = store
        .fetch_allocation(&second.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, AllocationStatus::Draft);
}

#[test]
fn cancel_frees_capacity() {
    let (service, store) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");
    service.confirm_allocation(&allocation.id).expect("confirm");

    let cancelled = service
        .cancel_allocation(&allocation.id)
        .expect("cancel succeeds");
    assert_eq!(cancelled.status, AllocationStatus::Cancelled);
    assert!(store.reservation_rows().is_empty());

    let available = service
        .availability(&hotel_a(), RoomCategory::Double, october_window(), None)
        .expect("availability");
    assert_eq!(available, 5);
}

#[test]
fn revert_round_trips_availability() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");

    let before = service
        .availability(&hotel_a(), RoomCategory::Double, october_window(), None)
        .expect("availability");

    service.confirm_allocation(&allocation.id).expect("confirm");
    let reverted = service
        .revert_allocation(&allocation.id)
        .expect("revert succeeds");
    assert_eq!(reverted.status, AllocationStatus::Draft);

    let after = service
        .availability(&hotel_a(), RoomCategory::Double, october_window(), None)
        .expect("availability");
    assert_eq!(before, after);
}

#[test]
fn reserved_never_exceeds_capacity_across_transitions() {
    let (service, store) = build_service();
    seeded_offer(&service, 5);

    let assert_invariant = |label: &str| {
        let totals = capacity_by_night(&store.capacity_rows());
        let reserved = reserved_by_night(&store.reservation_rows());
        for (key, held) in &reserved {
            let total = totals.get(key).copied().unwrap_or(0);
            assert!(
                held <= &total,
                "{label}: {held} reserved vs {total} total for {key:?}"
            );
        }
    };

    let a = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft a");
    let b = service
        .create_allocation(delegation_y(), hotel_a(), october_window(), doubles(2))
        .expect("draft b");

    service.confirm_allocation(&a.id).expect("confirm a");
    assert_invariant("after confirm a");

    service.confirm_allocation(&b.id).expect("confirm b");
    assert_invariant("after confirm b");

    // Hotel is now full; any further request must bounce.
    let c = service
        .create_allocation(delegation_y(), hotel_a(), october_window(), doubles(1))
        .expect("draft c");
    assert!(matches!(
        service.confirm_allocation(&c.id),
        Err(EngineError::Overbooked(_))
    ));
    assert_invariant("after rejected c");

    service.revert_allocation(&a.id).expect("revert a");
    assert_invariant("after revert a");

    service.confirm_allocation(&c.id).expect("confirm c");
    assert_invariant("after confirm c");

    service.cancel_allocation(&b.id).expect("cancel b");
    assert_invariant("after cancel b");
}

#[test]
fn confirm_requires_a_positive_room_line() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(0))
        .expect("draft");

    match service.confirm_allocation(&allocation.id) {
        Err(EngineError::Validation(ValidationError::NoRoomsRequested)) => {}
        other => panic!("expected missing rooms validation, got {other:?}"),
    }
}

#[test]
fn unknown_category_requests_are_rejected_not_rounded() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    // No single-room capacity exists at hotel A.
    let allocation = service
        .create_allocation(
            delegation_x(),
            hotel_a(),
            october_window(),
            vec![AllocationRoomLine {
                category: RoomCategory::Single,
                rooms: 1,
            }],
        )
        .expect("draft");

    match service.confirm_allocation(&allocation.id) {
        Err(EngineError::Overbooked(report)) => {
            assert!(report.shortfalls.iter().all(|s| s.available == 0));
        }
        other => panic!("expected overbooking error, got {other:?}"),
    }
}

#[test]
fn duplicate_category_lines_are_summed_before_the_check() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let mut rooms = doubles(3);
    rooms.extend(doubles(3));
    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), rooms)
        .expect("draft");

    match service.confirm_allocation(&allocation.id) {
        Err(EngineError::Overbooked(report)) => {
            assert!(report.shortfalls.iter().all(|s| s.requested == 6));
        }
        other => panic!("expected overbooking error, got {other:?}"),
    }
}

#[test]
fn updates_are_locked_outside_draft() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");
    service.confirm_allocation(&allocation.id).expect("confirm");

    match service.update_allocation(&allocation.id, None, Some(doubles(1))) {
        Err(EngineError::Transition(TransitionError::AllocationLocked { status, .. })) => {
            assert_eq!(status, AllocationStatus::Confirmed);
        }
        other => panic!("expected locked transition error, got {other:?}"),
    }
}

#[test]
fn update_replaces_the_room_set_wholesale() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");
    let updated = service
        .update_allocation(
            &allocation.id,
            None,
            Some(vec![AllocationRoomLine {
                category: RoomCategory::Single,
                rooms: 1,
            }]),
        )
        .expect("update");

    assert_eq!(updated.rooms.len(), 1);
    assert_eq!(updated.rooms[0].category, RoomCategory::Single);
}

#[test]
fn confirmed_allocations_cannot_be_hard_deleted() {
    let (service, store) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");
    service.confirm_allocation(&allocation.id).expect("confirm");

    assert!(matches!(
        service.delete_allocation(&allocation.id),
        Err(EngineError::Transition(TransitionError::ConfirmedDelete { .. }))
    ));

    // Cancel first, then delete is fine.
    service.cancel_allocation(&allocation.id).expect("cancel");
    service.delete_allocation(&allocation.id).expect("delete");
    assert!(store
        .fetch_allocation(&allocation.id)
        .expect("fetch")
        .is_none());
}

#[test]
fn cancelled_is_terminal() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");
    service.cancel_allocation(&allocation.id).expect("cancel");

    assert!(matches!(
        service.confirm_allocation(&allocation.id),
        Err(EngineError::Transition(TransitionError::NotConfirmable { .. }))
    ));
    assert!(matches!(
        service.cancel_allocation(&allocation.id),
        Err(EngineError::Transition(TransitionError::AlreadyCancelled { .. }))
    ));
    assert!(matches!(
        service.revert_allocation(&allocation.id),
        Err(EngineError::Transition(TransitionError::NotRevertible { .. }))
    ));
}

#[test]
fn empty_breakdown_is_seeded_from_the_delegation_directory() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), Vec::new())
        .expect("draft");

    // Delegation X registered a request for 3 doubles.
    assert_eq!(allocation.rooms, doubles(3));
}

#[test]
fn unknown_hotels_and_delegations_are_not_found() {
    let (service, _) = build_service();

    let missing_hotel = service.create_allocation(
        delegation_x(),
        HotelId("hotel-nowhere".to_string()),
        october_window(),
        doubles(1),
    );
    assert!(matches!(
        missing_hotel,
        Err(EngineError::NotFound { kind: "hotel", .. })
    ));

    let missing_delegation = service.create_allocation(
        crate::engine::domain::DelegationId("delegation-none".to_string()),
        hotel_a(),
        october_window(),
        doubles(1),
    );
    assert!(matches!(
        missing_delegation,
        Err(EngineError::NotFound {
            kind: "delegation",
            ..
        })
    ));

    assert!(matches!(
        service.confirm_allocation(&AllocationId("alc-none".to_string())),
        Err(EngineError::NotFound {
            kind: "allocation",
            ..
        })
    ));
}

#[test]
fn confirmed_offers_lock_their_terms_and_resist_deletion() {
    let (service, _) = build_service();
    let offer = seeded_offer(&service, 5);

    assert!(matches!(
        service.update_offer(&offer.id, None, Some(offer_doubles(9))),
        Err(EngineError::Transition(TransitionError::OfferLocked { .. }))
    ));

    // Even after rejection the offer stays as history.
    service.reject_offer(&offer.id).expect("reject");
    assert!(matches!(
        service.delete_offer(&offer.id),
        Err(EngineError::Transition(TransitionError::OfferRetained { .. }))
    ));
}

#[test]
fn never_confirmed_offers_can_be_deleted() {
    let (service, store) = build_service();
    let offer = service
        .create_offer(hotel_a(), october_window(), offer_doubles(5))
        .expect("draft offer");

    service.delete_offer(&offer.id).expect("delete");
    assert!(store.fetch_offer(&offer.id).expect("fetch").is_none());
}

#[test]
fn confirmed_offers_accept_rate_edits_and_rebuild_capacity() {
    let (service, store) = build_service();
    let offer = seeded_offer(&service, 5);

    let mut repriced = offer_doubles(5);
    repriced[0].price_per_night = 210;
    repriced[0].complimentary = true;
    let updated = service
        .update_offer(&offer.id, None, Some(repriced.clone()))
        .expect("rate edit on a confirmed offer");
    assert_eq!(updated.rooms, repriced);

    // Counts did not change, so the rebuilt ledger keeps the same shape.
    assert_eq!(store.capacity_rows().len(), 2);
    let available = service
        .availability(&hotel_a(), RoomCategory::Double, october_window(), None)
        .expect("availability");
    assert_eq!(available, 5);

    // Stay and per-category counts remain locked.
    assert!(matches!(
        service.update_offer(
            &offer.id,
            Some(stay(date(2026, 10, 16), date(2026, 10, 20))),
            None
        ),
        Err(EngineError::Transition(TransitionError::OfferLocked { .. }))
    ));
}

#[test]
fn blank_delegation_ids_are_rejected_up_front() {
    let (service, _) = build_service();
    seeded_offer(&service, 5);

    let result = service.create_allocation(
        crate::engine::domain::DelegationId("  ".to_string()),
        hotel_a(),
        october_window(),
        doubles(1),
    );
    match result {
        Err(EngineError::Validation(ValidationError::BlankIdentifier { field })) => {
            assert_eq!(field, "delegation_id");
        }
        other => panic!("expected blank identifier validation, got {other:?}"),
    }
}

#[test]
fn concurrent_confirmations_admit_exactly_one_winner() {
    let (service, store) = build_service();
    seeded_offer(&service, 1);

    let a = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(1))
        .expect("draft a");
    let b = service
        .create_allocation(delegation_y(), hotel_a(), october_window(), doubles(1))
        .expect("draft b");

    let results: Vec<_> = std::thread::scope(|scope| {
        let service = &service;
        let handles: Vec<_> = [&a.id, &b.id]
            .into_iter()
            .map(|id| scope.spawn(move || service.confirm_allocation(id)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("confirm thread"))
            .collect()
    });

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter(|result| result.is_err())
        .all(|result| matches!(result, Err(EngineError::Overbooked(_)))));

    // One double held on each of the two nights, never more.
    let reserved: u32 = store
        .reservation_rows()
        .iter()
        .map(|row| row.rooms_reserved)
        .sum();
    assert_eq!(reserved, 2);
}

/// Store double that lands the writes of a completed cancel immediately
/// before the confirm path re-reads the allocation under the hotel lock,
/// mimicking a cancel finishing on another thread.
struct CancelRacingStore {
    inner: Arc<InMemoryEngineStore>,
    target: Mutex<Option<AllocationId>>,
    fetches: AtomicUsize,
}

impl CancelRacingStore {
    fn new(inner: Arc<InMemoryEngineStore>) -> Self {
        Self {
            inner,
            target: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    fn race_cancel_of(&self, id: AllocationId) {
        *self.target.lock().expect("target mutex poisoned") = Some(id);
        self.fetches.store(0, Ordering::SeqCst);
    }
}

impl EngineRepository for CancelRacingStore {
    fn insert_offer(&self, offer: Offer) -> Result<Offer, RepositoryError> {
        self.inner.insert_offer(offer)
    }

    fn update_offer(&self, offer: Offer) -> Result<(), RepositoryError> {
        self.inner.update_offer(offer)
    }

    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        self.inner.fetch_offer(id)
    }

    fn remove_offer(&self, id: &OfferId) -> Result<(), RepositoryError> {
        self.inner.remove_offer(id)
    }

    fn insert_allocation(&self, allocation: Allocation) -> Result<Allocation, RepositoryError> {
        self.inner.insert_allocation(allocation)
    }

    fn update_allocation(&self, allocation: Allocation) -> Result<(), RepositoryError> {
        self.inner.update_allocation(allocation)
    }

    fn fetch_allocation(&self, id: &AllocationId) -> Result<Option<Allocation>, RepositoryError> {
        let armed = self
            .target
            .lock()
            .expect("target mutex poisoned")
            .as_ref()
            .map_or(false, |target| target == id);
        // The first armed read is the pre-lock fetch; the second is the
        // re-read under the hotel lock. The cancel lands just before it.
        if armed && self.fetches.fetch_add(1, Ordering::SeqCst) == 1 {
            if let Some(mut cancelled) = self.inner.fetch_allocation(id)? {
                cancelled.status = AllocationStatus::Cancelled;
                self.inner.release_reservations(cancelled)?;
            }
        }
        self.inner.fetch_allocation(id)
    }

    fn remove_allocation(&self, id: &AllocationId) -> Result<(), RepositoryError> {
        self.inner.remove_allocation(id)
    }

    fn replace_capacity_for_offer(
        &self,
        offer: Offer,
        entries: Vec<CapacityEntry>,
    ) -> Result<(), RepositoryError> {
        self.inner.replace_capacity_for_offer(offer, entries)
    }

    fn capacity_between(
        &self,
        window: StayRange,
        hotel: Option<&HotelId>,
    ) -> Result<Vec<CapacityEntry>, RepositoryError> {
        self.inner.capacity_between(window, hotel)
    }

    fn commit_confirmation(
        &self,
        allocation: Allocation,
        entries: Vec<ReservationEntry>,
    ) -> Result<(), RepositoryError> {
        self.inner.commit_confirmation(allocation, entries)
    }

    fn release_reservations(&self, allocation: Allocation) -> Result<(), RepositoryError> {
        self.inner.release_reservations(allocation)
    }

    fn reservations_between(
        &self,
        window: StayRange,
        hotel: Option<&HotelId>,
    ) -> Result<Vec<ReservationEntry>, RepositoryError> {
        self.inner.reservations_between(window, hotel)
    }
}

#[test]
fn confirm_rechecks_status_under_the_hotel_lock() {
    let inner = Arc::new(InMemoryEngineStore::default());
    let store = Arc::new(CancelRacingStore::new(inner.clone()));
    let service = AccommodationService::new(store.clone(), Arc::new(directory()));

    let offer = service
        .create_offer(hotel_a(), october_window(), offer_doubles(5))
        .expect("offer created");
    service.confirm_offer(&offer.id).expect("offer confirmed");

    let allocation = service
        .create_allocation(delegation_x(), hotel_a(), october_window(), doubles(3))
        .expect("draft");
    store.race_cancel_of(allocation.id.clone());

    match service.confirm_allocation(&allocation.id) {
        Err(EngineError::Transition(TransitionError::NotConfirmable { status, .. })) => {
            assert_eq!(status, AllocationStatus::Cancelled);
        }
        other => panic!("expected the racing cancel to win, got {other:?}"),
    }

    // The cancelled state stays terminal and no reservation rows appear.
    let stored = inner
        .fetch_allocation(&allocation.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, AllocationStatus::Cancelled);
    assert!(inner.reservation_rows().is_empty());
}

#[test]
fn rejected_offers_cannot_be_confirmed() {
    let (service, _) = build_service();
    let offer = service
        .create_offer(hotel_a(), october_window(), offer_doubles(5))
        .expect("draft offer");
    service.reject_offer(&offer.id).expect("reject");

    assert!(matches!(
        service.confirm_offer(&offer.id),
        Err(EngineError::Transition(TransitionError::OfferRejected { .. }))
    ));
}
