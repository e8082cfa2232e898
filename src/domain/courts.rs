use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::slot::courts_overlap;

/// A club and its numbered courts, seeded by the external club CRUD.
#[derive(Clone, Debug)]
pub struct Club {
    pub club_id: Uuid,
    pub courts: Vec<u32>,
}

/// A court bound to a confirmed slot for a time window.
#[derive(Clone, Copy, Debug)]
pub struct OccupiedWindow {
    pub court_id: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Lowest-numbered court of the club that is free for `[start, end)`.
///
/// Occupancy is strict overlap, so back-to-back classes may share a court.
/// The caller must evaluate this inside the same atomic unit that assigns
/// the court, or two slots could race into the same court.
pub fn lowest_free_court(
    club: &Club,
    occupied: &[OccupiedWindow],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<u32> {
    let busy: BTreeSet<u32> = occupied
        .iter()
        .filter(|w| courts_overlap(w.start, w.end, start, end))
        .map(|w| w.court_id)
        .collect();

    let mut courts = club.courts.clone();
    courts.sort_unstable();
    courts.into_iter().find(|c| !busy.contains(c))
}
