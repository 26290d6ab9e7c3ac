use super::domain::{CapacityEntry, Offer, OfferStatus};

/// Safety bound on a single offer expansion. A malformed stay window never
/// fans out past a season's worth of nights.
pub(crate) const MAX_OFFER_NIGHTS: usize = 90;

/// Fan a confirmed offer out into one capacity row per (night, room line).
///
/// The output replaces every prior entry tagged with this offer's id, so
/// re-running the expansion is idempotent. Offers outside `confirmed` and
/// room lines with zero rooms contribute nothing.
pub fn expand_offer(offer: &Offer) -> Vec<CapacityEntry> {
    if offer.status != OfferStatus::Confirmed {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for night in offer.stay.nights().take(MAX_OFFER_NIGHTS) {
        for line in &offer.rooms {
            if line.rooms == 0 {
                continue;
            }
            entries.push(CapacityEntry {
                offer_id: offer.id.clone(),
                hotel_id: offer.hotel_id.clone(),
                night,
                category: line.category,
                rooms_total: line.rooms,
            });
        }
    }
    entries
}
