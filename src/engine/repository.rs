use super::domain::{
    Allocation, AllocationId, AllocationRoomLine, CapacityEntry, DelegationId, HotelId, Offer,
    OfferId, ReservationEntry, StayRange,
};

/// Storage abstraction so the lifecycle service and the reporting aggregator
/// can be exercised in isolation from any particular database client.
///
/// The compound methods (`replace_capacity_for_offer`, `commit_confirmation`,
/// `release_reservations`) bundle a record write with its derived-ledger
/// writes; an implementation must apply each as a single transaction that
/// either fully lands or leaves the store untouched.
pub trait EngineRepository: Send + Sync {
    fn insert_offer(&self, offer: Offer) -> Result<Offer, RepositoryError>;
    fn update_offer(&self, offer: Offer) -> Result<(), RepositoryError>;
    fn fetch_offer(&self, id: &OfferId) -> Result<Option<Offer>, RepositoryError>;
    fn remove_offer(&self, id: &OfferId) -> Result<(), RepositoryError>;

    fn insert_allocation(&self, allocation: Allocation) -> Result<Allocation, RepositoryError>;
    fn update_allocation(&self, allocation: Allocation) -> Result<(), RepositoryError>;
    fn fetch_allocation(&self, id: &AllocationId) -> Result<Option<Allocation>, RepositoryError>;
    fn remove_allocation(&self, id: &AllocationId) -> Result<(), RepositoryError>;

    /// Persist the offer record and swap every capacity row tagged with its
    /// id for the freshly expanded set, in one transaction.
    fn replace_capacity_for_offer(
        &self,
        offer: Offer,
        entries: Vec<CapacityEntry>,
    ) -> Result<(), RepositoryError>;

    /// Capacity rows whose night falls inside `window`, optionally scoped to
    /// one hotel.
    fn capacity_between(
        &self,
        window: StayRange,
        hotel: Option<&HotelId>,
    ) -> Result<Vec<CapacityEntry>, RepositoryError>;

    /// Persist the confirmed allocation and its reservation fan-out in one
    /// transaction.
    fn commit_confirmation(
        &self,
        allocation: Allocation,
        entries: Vec<ReservationEntry>,
    ) -> Result<(), RepositoryError>;

    /// Persist the allocation's new status and drop every reservation row it
    /// owns, in one transaction. Used by cancel and revert.
    fn release_reservations(&self, allocation: Allocation) -> Result<(), RepositoryError>;

    /// Reservation rows whose night falls inside `window`, optionally scoped
    /// to one hotel.
    fn reservations_between(
        &self,
        window: StayRange,
        hotel: Option<&HotelId>,
    ) -> Result<Vec<ReservationEntry>, RepositoryError>;
}

/// Error enumeration for repository failures. `Unavailable` is the
/// recoverable transport/transaction case; callers may retry, the engine
/// never does.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Directory metadata for a hotel, provided by the upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelProfile {
    pub id: HotelId,
    pub name: String,
    pub city: String,
}

/// Directory metadata for a delegation, including the room counts it asked
/// for during registration. Used only to pre-populate a new allocation's
/// breakdown, never to bypass availability checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationProfile {
    pub id: DelegationId,
    pub name: String,
    pub requested_rooms: Vec<AllocationRoomLine>,
}

/// Read-only facade over the hotel catalog and delegation directory, which
/// live outside this engine.
pub trait HotelDirectory: Send + Sync {
    fn hotel(&self, id: &HotelId) -> Result<Option<HotelProfile>, RepositoryError>;
    fn delegation(&self, id: &DelegationId)
        -> Result<Option<DelegationProfile>, RepositoryError>;
}
