use std::collections::{HashMap, HashSet};

use crate::workflows::bookings::{Booking, OutOfServicePeriod};
use crate::workflows::estate::{Bed, BedId, DateRange, Premises, PremisesId, PremisesInventory, Room};

use super::domain::{BedMatch, BookingOverlap, PremisesMatch, RequiredCharacteristics, RoomMatch};

/// Beds held by a non-cancelled booking or out-of-service period during `range`.
///
/// Bookings also hold their bed for the owning premises' turnaround days after departure.
pub(crate) fn blocked_beds(
    range: &DateRange,
    bookings: &[Booking],
    out_of_service: &[OutOfServicePeriod],
    turnaround: &HashMap<PremisesId, u32>,
) -> HashSet<BedId> {
    let mut blocked = HashSet::new();

    for booking in bookings.iter().filter(|booking| booking.blocks_bed()) {
        let days = turnaround.get(&booking.premises_id).copied().unwrap_or(0);
        if booking.range().extended_by(days).overlaps(range) {
            blocked.insert(booking.bed_id.clone());
        }
    }

    for period in out_of_service.iter().filter(|period| !period.is_cancelled()) {
        if period.range().overlaps(range) {
            blocked.insert(period.bed_id.clone());
        }
    }

    blocked
}

/// Beds of one premises that are in service, unblocked, and satisfy the room requirements.
/// Premises-level requirements are checked by the caller.
pub(crate) fn available_beds<'a>(
    inventory: &'a PremisesInventory,
    required: &RequiredCharacteristics,
    range: &DateRange,
    blocked: &HashSet<BedId>,
) -> Vec<(&'a Room, &'a Bed)> {
    inventory
        .rooms
        .iter()
        .filter(|room| room.room.has_characteristics(&required.room))
        .flat_map(|room| room.beds.iter().map(move |bed| (&room.room, bed)))
        .filter(|(_, bed)| bed.in_service_on(range.start()) && !blocked.contains(&bed.id))
        .collect()
}

pub(crate) fn premises_qualifies(premises: &Premises, required: &RequiredCharacteristics) -> bool {
    premises.is_active() && premises.has_characteristics(&required.premises)
}

/// Bookings at `inventory` overlapping `range`, earliest arrival first.
pub(crate) fn booking_overlaps(
    inventory: &PremisesInventory,
    range: &DateRange,
    bookings: &[Booking],
) -> Vec<BookingOverlap> {
    let mut overlaps: Vec<BookingOverlap> = bookings
        .iter()
        .filter(|booking| {
            booking.premises_id == inventory.premises.id
                && booking.blocks_bed()
                && booking.range().overlaps(range)
        })
        .filter_map(|booking| {
            let (room, _) = inventory.locate_bed(&booking.bed_id)?;
            Some(BookingOverlap {
                booking_id: booking.id.clone(),
                crn: booking.crn.clone(),
                room_id: room.id.clone(),
                bed_id: booking.bed_id.clone(),
                arrival_date: booking.arrival_date,
                departure_date: booking.departure_date,
                days: booking.range().overlap_days(range),
            })
        })
        .collect();
    overlaps.sort_by(|a, b| {
        a.arrival_date
            .cmp(&b.arrival_date)
            .then_with(|| a.booking_id.cmp(&b.booking_id))
    });
    overlaps
}

impl From<&Premises> for PremisesMatch {
    fn from(premises: &Premises) -> Self {
        Self {
            id: premises.id.clone(),
            name: premises.name.clone(),
            postcode: premises.postcode.clone(),
            probation_delivery_unit: premises.probation_delivery_unit.clone(),
            characteristics: premises.characteristics.clone(),
        }
    }
}

impl From<&Room> for RoomMatch {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            characteristics: room.characteristics.clone(),
        }
    }
}

impl From<&Bed> for BedMatch {
    fn from(bed: &Bed) -> Self {
        Self {
            id: bed.id.clone(),
            name: bed.name.clone(),
        }
    }
}
