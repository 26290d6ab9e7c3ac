use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{
    Allocation, AllocationId, CapacityEntry, DelegationId, HotelId, Offer, OfferId,
    ReservationEntry, StayRange,
};
use super::repository::{
    DelegationProfile, EngineRepository, HotelDirectory, HotelProfile, RepositoryError,
};

#[derive(Default)]
struct StoreInner {
    offers: HashMap<OfferId, Offer>,
    allocations: HashMap<AllocationId, Allocation>,
    capacity: Vec<CapacityEntry>,
    reservations: Vec<ReservationEntry>,
}

/// In-memory store backing the demo binary and the test suites. One interior
/// mutex guards all four tables, so the compound record+ledger writes are
/// naturally atomic.
#[derive(Default, Clone)]
pub struct InMemoryEngineStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryEngineStore {
    /// Raw snapshot of every reservation row; test hook for ledger
    /// assertions.
    pub fn reservation_rows(&self) -> Vec<ReservationEntry> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        guard.reservations.clone()
    }

    /// Raw snapshot of every capacity row; test hook for ledger assertions.
    pub fn capacity_rows(&self) -> Vec<CapacityEntry> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        guard.capacity.clone()
    }
}

impl EngineRepository for InMemoryEngineStore {
    fn insert_offer(&self, offer: Offer) -> Result<Offer, RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if guard.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.offers.insert(offer.id.clone(), offer.clone());
        Ok(offer)
    }

    fn update_offer(&self, offer: Offer) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if !guard.offers.contains_key(&offer.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.offers.insert(offer.id.clone(), offer);
        Ok(())
    }

    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        Ok(guard.offers.get(id).cloned())
    }

    fn remove_offer(&self, id: &OfferId) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        guard
            .offers
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_allocation(&self, allocation: Allocation) -> Result<Allocation, RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if guard.allocations.contains_key(&allocation.id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .allocations
            .insert(allocation.id.clone(), allocation.clone());
        Ok(allocation)
    }

    fn update_allocation(&self, allocation: Allocation) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if !guard.allocations.contains_key(&allocation.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.allocations.insert(allocation.id.clone(), allocation);
        Ok(())
    }

    fn fetch_allocation(&self, id: &AllocationId) -> Result<Option<Allocation>, RepositoryError> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        Ok(guard.allocations.get(id).cloned())
    }

    fn remove_allocation(&self, id: &AllocationId) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        guard
            .allocations
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn replace_capacity_for_offer(
        &self,
        offer: Offer,
        entries: Vec<CapacityEntry>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if !guard.offers.contains_key(&offer.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.capacity.retain(|entry| entry.offer_id != offer.id);
        guard.capacity.extend(entries);
        guard.offers.insert(offer.id.clone(), offer);
        Ok(())
    }

    fn capacity_between(
        &self,
        window: StayRange,
        hotel: Option<&HotelId>,
    ) -> Result<Vec<CapacityEntry>, RepositoryError> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        Ok(guard
            .capacity
            .iter()
            .filter(|entry| window.contains(entry.night))
            .filter(|entry| hotel.map_or(true, |id| *id == entry.hotel_id))
            .cloned()
            .collect())
    }

    fn commit_confirmation(
        &self,
        allocation: Allocation,
        entries: Vec<ReservationEntry>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if !guard.allocations.contains_key(&allocation.id) {
            return Err(RepositoryError::NotFound);
        }
        guard
            .reservations
            .retain(|entry| entry.allocation_id != allocation.id);
        guard.reservations.extend(entries);
        guard.allocations.insert(allocation.id.clone(), allocation);
        Ok(())
    }

    fn release_reservations(&self, allocation: Allocation) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if !guard.allocations.contains_key(&allocation.id) {
            return Err(RepositoryError::NotFound);
        }
        guard
            .reservations
            .retain(|entry| entry.allocation_id != allocation.id);
        guard.allocations.insert(allocation.id.clone(), allocation);
        Ok(())
    }

    fn reservations_between(
        &self,
        window: StayRange,
        hotel: Option<&HotelId>,
    ) -> Result<Vec<ReservationEntry>, RepositoryError> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        Ok(guard
            .reservations
            .iter()
            .filter(|entry| window.contains(entry.night))
            .filter(|entry| hotel.map_or(true, |id| *id == entry.hotel_id))
            .cloned()
            .collect())
    }
}

/// Fixed hotel catalog and delegation directory, as the upstream systems
/// would provide them.
#[derive(Default, Clone)]
pub struct StaticHotelDirectory {
    hotels: HashMap<HotelId, HotelProfile>,
    delegations: HashMap<DelegationId, DelegationProfile>,
}

impl StaticHotelDirectory {
    pub fn with_hotel(mut self, profile: HotelProfile) -> Self {
        self.hotels.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_delegation(mut self, profile: DelegationProfile) -> Self {
        self.delegations.insert(profile.id.clone(), profile);
        self
    }
}

impl HotelDirectory for StaticHotelDirectory {
    fn hotel(&self, id: &HotelId) -> Result<Option<HotelProfile>, RepositoryError> {
        Ok(self.hotels.get(id).cloned())
    }

    fn delegation(
        &self,
        id: &DelegationId,
    ) -> Result<Option<DelegationProfile>, RepositoryError> {
        Ok(self.delegations.get(id).cloned())
    }
}
