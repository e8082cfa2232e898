use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Playing-level band in tenths of a level.
///
/// Stored as integers so the domain never compares floats (`35..=45`
/// covers a 3.5–4.5 class).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelRange {
    pub min_tenths: i32,
    pub max_tenths: i32,
}

impl LevelRange {
    /// Band of half a level on each side of the given level.
    pub fn around(level_tenths: i32) -> Self {
        Self {
            min_tenths: level_tenths - 5,
            max_tenths: level_tenths + 5,
        }
    }

    pub fn contains(&self, level_tenths: i32) -> bool {
        (self.min_tenths..=self.max_tenths).contains(&level_tenths)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
    Mixed,
}

/// Level/gender classification of a slot.
///
/// New proposals start `Open`; the first booking narrows the slot to the
/// booker's attributes and the slot stays that way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Open,
    Set { level: LevelRange, gender: Gender },
}

/// One group-size variant of a slot.
///
/// Options are mutually exclusive: only one of them can win the race.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupOption {
    pub group_size: u8,
    /// Seats of this option may be paid with points (set by an instructor
    /// subsidy).
    pub accepts_points_only: bool,
}

impl GroupOption {
    pub fn required_seats(&self) -> u32 {
        self.group_size as u32
    }
}

/// A bookable instructor/time/club unit.
///
/// `court_id` is the sole confirmation signal: `None` while the slot is an
/// open proposal, `Some` once an option won the race and a court was bound.
/// A confirmed slot never returns to `None`.
#[derive(Clone, Debug)]
pub struct ClassSlot {
    pub slot_id: Uuid,
    pub instructor_id: Uuid,
    pub club_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub classification: Classification,
    pub options: Vec<GroupOption>,
    pub court_id: Option<u32>,
    /// Seats vacated after confirmation, resellable for points only.
    pub available_recycled_seats: u32,
    pub recycled_seats_only_points: bool,
}

impl ClassSlot {
    /// A fresh open proposal, as the external slot generator supplies them.
    pub fn proposal(
        instructor_id: Uuid,
        club_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        group_sizes: &[u8],
    ) -> Self {
        let mut options: Vec<GroupOption> = group_sizes
            .iter()
            .map(|&group_size| GroupOption {
                group_size,
                accepts_points_only: false,
            })
            .collect();
        options.sort_by_key(|o| o.group_size);
        Self {
            slot_id: Uuid::new_v4(),
            instructor_id,
            club_id,
            start,
            end,
            classification: Classification::Open,
            options,
            court_id: None,
            available_recycled_seats: 0,
            recycled_seats_only_points: false,
        }
    }

    /// An open, unclassified copy of this slot at the same time/instructor.
    pub fn open_clone(&self) -> Self {
        let mut clone = Self::proposal(
            self.instructor_id,
            self.club_id,
            self.start,
            self.end,
            &[],
        );
        clone.options = self
            .options
            .iter()
            .map(|o| GroupOption {
                group_size: o.group_size,
                accepts_points_only: false,
            })
            .collect();
        clone
    }

    pub fn is_confirmed(&self) -> bool {
        self.court_id.is_some()
    }

    pub fn option(&self, group_size: u8) -> Option<&GroupOption> {
        self.options.iter().find(|o| o.group_size == group_size)
    }

    pub fn option_mut(&mut self, group_size: u8) -> Option<&mut GroupOption> {
        self.options.iter_mut().find(|o| o.group_size == group_size)
    }

    pub fn has_recycled_seats(&self) -> bool {
        self.available_recycled_seats > 0
    }

    /// Strict interval overlap; back-to-back slots do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        courts_overlap(self.start, self.end, start, end)
    }
}

pub(crate) fn courts_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Read model of one option for listing/calendar views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionSnapshot {
    pub group_size: u8,
    pub occupied_seats: u32,
    pub required_seats: u32,
    pub accepts_points_only: bool,
}

/// Read model of a slot for listing/calendar views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub slot_id: Uuid,
    pub court_id: Option<u32>,
    /// Level/gender band the calendar displays; narrowed by the first
    /// booking.
    pub classification: Classification,
    pub options: Vec<OptionSnapshot>,
    pub has_recycled_slots: bool,
    pub available_recycled_slots: u32,
    pub recycled_slots_only_points: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use speculoos::prelude::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 3, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_level_range_around() {
        let range = LevelRange::around(35);
        assert_that!(range.contains(30)).is_true();
        assert_that!(range.contains(40)).is_true();
        assert_that!(range.contains(46)).is_false();
        assert_that!(range.contains(29)).is_false();
    }

    #[test]
    fn test_back_to_back_slots_do_not_overlap() {
        let slot = ClassSlot::proposal(Uuid::new_v4(), Uuid::new_v4(), at(10), at(11), &[1, 2]);
        assert_that!(slot.overlaps(at(11), at(12))).is_false();
        assert_that!(slot.overlaps(at(9), at(10))).is_false();
        assert_that!(slot.overlaps(at(10), at(11))).is_true();
        assert_that!(slot.overlaps(at(9), at(12))).is_true();
    }

    #[test]
    fn test_open_clone_resets_classification_and_subsidies() {
        let mut slot =
            ClassSlot::proposal(Uuid::new_v4(), Uuid::new_v4(), at(10), at(11), &[2, 4]);
        slot.classification = Classification::Set {
            level: LevelRange::around(30),
            gender: Gender::Mixed,
        };
        slot.option_mut(2).unwrap().accepts_points_only = true;

        let clone = slot.open_clone();

        assert_that!(clone.slot_id).is_not_equal_to(slot.slot_id);
        assert_that!(clone.classification).is_equal_to(Classification::Open);
        assert_that!(clone.court_id).is_none();
        assert_that!(clone.option(2).unwrap().accepts_points_only).is_false();
        assert_that!(clone.options).has_length(2);
    }
}
