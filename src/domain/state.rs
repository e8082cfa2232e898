use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::booking::{Booking, BookingStatus, HeldAmount, PaymentMethod};
use super::courts::{lowest_free_court, Club, OccupiedWindow};
use super::ledger::PlayerLedger;
use super::slot::{ClassSlot, Classification, LevelRange, OptionSnapshot, SlotSnapshot};
use super::{Error, PlayerProfile};

/// Input for a booking creation, assembled by the command layer from the
/// identity and pricing collaborators.
#[derive(Clone, Debug)]
pub struct NewBooking {
    pub player: PlayerProfile,
    pub slot_id: Uuid,
    pub group_size: u8,
    pub amount: HeldAmount,
}

/// Result of a cancellation, as surfaced to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CancelOutcome {
    /// Hold returned to the player (in the method the booking was paid).
    pub refunded_amount: i64,
    /// Points granted in place of a refund when a confirmed seat is vacated.
    pub points_granted: i64,
    /// A confirmed seat was freed into the recycled market.
    pub slot_freed: bool,
}

/// The whole bookable world: slots, bookings, ledgers and clubs.
///
/// Every public operation is the body of one atomic unit. The store
/// adapter runs it against a clone of the state and commits the clone only
/// on success, so any `Err` leaves the authoritative state untouched.
#[derive(Clone, Debug, Default)]
pub struct EngineState {
    slots: HashMap<Uuid, ClassSlot>,
    bookings: HashMap<Uuid, Booking>,
    ledgers: HashMap<Uuid, PlayerLedger>,
    clubs: HashMap<Uuid, Club>,
}

impl EngineState {
    // ---- seeding contracts for the external collaborators ----

    /// Club CRUD lives elsewhere; the engine only needs the court numbers.
    pub fn register_club(&mut self, club: Club) {
        self.clubs.insert(club.club_id, club);
    }

    /// The proposal generator publishes new open slots.
    pub fn publish_slot(&mut self, slot: ClassSlot) {
        self.slots.insert(slot.slot_id, slot);
    }

    /// Seed a player's ledger with an opening balance.
    pub fn open_ledger(&mut self, ledger: PlayerLedger) {
        self.ledgers.insert(ledger.player_id, ledger);
    }

    // ---- queries ----

    pub fn slot(&self, slot_id: Uuid) -> Result<&ClassSlot, Error> {
        self.slots.get(&slot_id).ok_or(Error::SlotNotFound(slot_id))
    }

    pub fn booking(&self, booking_id: Uuid) -> Result<&Booking, Error> {
        self.bookings
            .get(&booking_id)
            .ok_or(Error::BookingNotFound(booking_id))
    }

    pub fn ledger(&self, player_id: Uuid) -> Option<&PlayerLedger> {
        self.ledgers.get(&player_id)
    }

    pub fn slots(&self) -> impl Iterator<Item = &ClassSlot> {
        self.slots.values()
    }

    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.values()
    }

    /// Seats taken on one option: non-cancelled race bookings declaring it.
    /// Recycled bookings consume vacated capacity, not race capacity.
    pub fn occupied_seats(&self, slot_id: Uuid, group_size: u8) -> u32 {
        self.bookings
            .values()
            .filter(|b| {
                b.slot_id == slot_id && b.is_active() && b.chosen_option == Some(group_size)
            })
            .map(|b| b.seats)
            .sum()
    }

    /// Read model for listing/calendar views.
    pub fn snapshot(&self, slot_id: Uuid) -> Result<SlotSnapshot, Error> {
        let slot = self.slot(slot_id)?;
        let options = slot
            .options
            .iter()
            .map(|o| OptionSnapshot {
                group_size: o.group_size,
                occupied_seats: self.occupied_seats(slot_id, o.group_size),
                required_seats: o.required_seats(),
                accepts_points_only: o.accepts_points_only,
            })
            .collect();
        Ok(SlotSnapshot {
            slot_id,
            court_id: slot.court_id,
            classification: slot.classification,
            options,
            has_recycled_slots: slot.has_recycled_seats(),
            available_recycled_slots: slot.available_recycled_seats,
            recycled_slots_only_points: slot.recycled_seats_only_points,
        })
    }

    // ---- operations (one atomic unit each) ----

    pub fn create_booking(&mut self, req: NewBooking) -> Result<Booking, Error> {
        let slot = self.slot(req.slot_id)?;
        let option = *slot
            .option(req.group_size)
            .ok_or(Error::UnknownOption {
                group_size: req.group_size,
            })?;

        let occupied = self.occupied_seats(req.slot_id, req.group_size);
        if occupied >= option.required_seats() {
            return Err(Error::OptionFull {
                group_size: req.group_size,
            });
        }
        if self.slot(req.slot_id)?.is_confirmed() {
            // The race is over and the requested option was not the winner.
            return Err(Error::SlotAlreadyConfirmed(req.slot_id));
        }
        if req.amount.method == PaymentMethod::Points && !option.accepts_points_only {
            return Err(Error::PointsNotAccepted {
                group_size: req.group_size,
            });
        }

        let booking = Booking::pending(
            req.player.player_id,
            req.slot_id,
            req.group_size,
            req.amount,
        );
        if !req.amount.is_zero() {
            self.ledger_mut(req.player.player_id).hold(
                req.amount.method,
                req.amount.value,
                "class booking",
                booking.booking_id,
            )?;
        }

        self.classify_on_first_booking(req.slot_id, &req.player);

        let booking_id = booking.booking_id;
        self.bookings.insert(booking_id, booking);
        self.resolve_slot(req.slot_id)?;

        Ok(self.booking(booking_id)?.clone())
    }

    pub fn cancel_booking(&mut self, booking_id: Uuid) -> Result<CancelOutcome, Error> {
        let booking = self.booking(booking_id)?.clone();
        match booking.status {
            BookingStatus::Cancelled => Err(Error::AlreadyCancelled(booking_id)),
            BookingStatus::Pending => {
                self.release_and_cancel(booking_id, "booking cancelled")?;
                // A cancellation can never complete an option, but the slot
                // is re-evaluated like after any other mutation.
                self.resolve_slot(booking.slot_id)?;
                Ok(CancelOutcome {
                    refunded_amount: booking.amount.value,
                    points_granted: 0,
                    slot_freed: false,
                })
            }
            BookingStatus::Confirmed => self.recycle_confirmed_seat(&booking),
        }
    }

    /// The owning instructor sponsors one seat of an open option, making
    /// the option points-redeemable. If that seat was the last one missing
    /// the resolver confirms the slot on the spot.
    pub fn subsidize_seat(
        &mut self,
        instructor_id: Uuid,
        slot_id: Uuid,
        group_size: u8,
    ) -> Result<Booking, Error> {
        let slot = self.slot(slot_id)?;
        if slot.instructor_id != instructor_id {
            return Err(Error::NotAuthorizedForSlot {
                instructor_id,
                slot_id,
            });
        }
        if slot.is_confirmed() {
            return Err(Error::SlotAlreadyConfirmed(slot_id));
        }
        let option = *slot.option(group_size).ok_or(Error::UnknownOption { group_size })?;
        if self.occupied_seats(slot_id, group_size) >= option.required_seats() {
            return Err(Error::OptionFull { group_size });
        }

        if let Some(slot) = self.slots.get_mut(&slot_id) {
            if let Some(option) = slot.option_mut(group_size) {
                option.accepts_points_only = true;
            }
        }

        let booking = Booking::subsidy(instructor_id, slot_id, group_size);
        let booking_id = booking.booking_id;
        self.bookings.insert(booking_id, booking);
        self.resolve_slot(slot_id)?;

        Ok(self.booking(booking_id)?.clone())
    }

    /// Buy vacated capacity on a confirmed slot. Points only, no race: the
    /// court is already assigned, so the booking confirms immediately.
    pub fn book_recycled_seat(
        &mut self,
        player_id: Uuid,
        slot_id: Uuid,
        seats: u32,
        points: i64,
    ) -> Result<Booking, Error> {
        if seats == 0 {
            return Err(Error::NonPositiveAmount(i64::from(seats)));
        }
        if points <= 0 {
            return Err(Error::NonPositiveAmount(points));
        }
        let slot = self.slot(slot_id)?;
        if slot.available_recycled_seats < seats {
            return Err(Error::RecycledSeatsExhausted {
                requested: seats,
                available: slot.available_recycled_seats,
            });
        }

        let amount = HeldAmount {
            method: PaymentMethod::Points,
            value: points,
        };
        let booking = Booking::recycled(player_id, slot_id, seats, amount);

        // Hold and capture in one unit so the log keeps its hold→capture
        // shape even for instantly-confirmed bookings.
        let ledger = self.ledger_mut(player_id);
        ledger.hold(
            PaymentMethod::Points,
            points,
            "recycled seat purchase",
            booking.booking_id,
        )?;
        ledger.capture(
            PaymentMethod::Points,
            points,
            "recycled seat confirmed",
            booking.booking_id,
        )?;

        if let Some(slot) = self.slots.get_mut(&slot_id) {
            slot.available_recycled_seats -= seats;
        }
        tracing::debug!(%slot_id, %player_id, seats, "recycled seats sold");

        let booking_id = booking.booking_id;
        self.bookings.insert(booking_id, booking);
        Ok(self.booking(booking_id)?.clone())
    }

    // ---- internals ----

    fn ledger_mut(&mut self, player_id: Uuid) -> &mut PlayerLedger {
        self.ledgers
            .entry(player_id)
            .or_insert_with(|| PlayerLedger::new(player_id))
    }

    /// The first booking on an all-empty slot narrows the classification to
    /// the booker and clones a fresh open proposal at the same
    /// (instructor, start) so the generic slot stays bookable. The clone is
    /// created at most once per (instructor, start).
    fn classify_on_first_booking(&mut self, slot_id: Uuid, player: &PlayerProfile) {
        let slot = match self.slots.get(&slot_id) {
            Some(slot) => slot,
            None => return,
        };
        if slot.classification != Classification::Open {
            return;
        }
        let has_active_booking = self
            .bookings
            .values()
            .any(|b| b.slot_id == slot_id && b.is_active());
        if has_active_booking {
            return;
        }

        let instructor_id = slot.instructor_id;
        let start = slot.start;
        let open_clone_exists = self.slots.values().any(|s| {
            s.slot_id != slot_id
                && s.instructor_id == instructor_id
                && s.start == start
                && !s.is_confirmed()
                && s.classification == Classification::Open
        });

        let clone = if open_clone_exists {
            None
        } else {
            Some(slot.open_clone())
        };

        if let Some(slot) = self.slots.get_mut(&slot_id) {
            slot.classification = Classification::Set {
                level: LevelRange::around(player.level_tenths),
                gender: player.gender,
            };
        }
        if let Some(clone) = clone {
            tracing::debug!(original = %slot_id, clone = %clone.slot_id, "cloned open proposal");
            self.slots.insert(clone.slot_id, clone);
        }
    }

    /// Race resolver. Runs inside the same atomic unit as the mutation
    /// that triggered it; an `Err` aborts that whole unit.
    fn resolve_slot(&mut self, slot_id: Uuid) -> Result<(), Error> {
        let slot = self.slot(slot_id)?;
        if slot.is_confirmed() {
            // Terminal for the race; later vacancies go through recycling.
            return Ok(());
        }

        // Smallest full group size wins when one mutation completes
        // several options at once. The options vec comes from the external
        // generator and carries no order guarantee.
        let winner = slot
            .options
            .iter()
            .copied()
            .filter(|o| self.occupied_seats(slot_id, o.group_size) >= o.required_seats())
            .min_by_key(|o| o.group_size);
        let winner = match winner {
            Some(option) => option.group_size,
            None => return Ok(()),
        };

        let (club_id, start, end) = (slot.club_id, slot.start, slot.end);
        let court_id = self.allocate_court(club_id, start, end, slot_id)?;

        if let Some(slot) = self.slots.get_mut(&slot_id) {
            slot.court_id = Some(court_id);
        }

        let slot_bookings: Vec<Uuid> = self
            .bookings
            .values()
            .filter(|b| b.slot_id == slot_id && b.is_active())
            .map(|b| b.booking_id)
            .collect();

        let mut confirmed_players = HashSet::new();
        for booking_id in slot_bookings {
            let booking = self.booking(booking_id)?.clone();
            if booking.chosen_option == Some(winner) {
                if !booking.amount.is_zero() {
                    self.ledger_mut(booking.player_id).capture(
                        booking.amount.method,
                        booking.amount.value,
                        "class confirmed",
                        booking_id,
                    )?;
                }
                if let Some(b) = self.bookings.get_mut(&booking_id) {
                    b.status = BookingStatus::Confirmed;
                }
                // A subsidy is a sponsorship, not a commitment of the
                // instructor's day.
                if !booking.is_instructor_subsidy {
                    confirmed_players.insert(booking.player_id);
                }
            } else {
                self.release_and_cancel(booking_id, "losing option released")?;
            }
        }

        self.cancel_same_day_pending(slot_id, start, &confirmed_players)?;

        tracing::info!(%slot_id, court_id, winner, "slot confirmed");
        Ok(())
    }

    fn allocate_court(
        &self,
        club_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_slot_id: Uuid,
    ) -> Result<u32, Error> {
        let club = self
            .clubs
            .get(&club_id)
            .ok_or(Error::NoCourtAvailable { club_id })?;

        let occupied: Vec<OccupiedWindow> = self
            .slots
            .values()
            .filter(|s| s.club_id == club_id && s.slot_id != exclude_slot_id)
            .filter_map(|s| {
                s.court_id.map(|court_id| OccupiedWindow {
                    court_id,
                    start: s.start,
                    end: s.end,
                })
            })
            .collect();

        lowest_free_court(club, &occupied, start, end)
            .ok_or(Error::NoCourtAvailable { club_id })
    }

    /// A player with a confirmed class holds no other live commitment for
    /// the same calendar day: their PENDING bookings elsewhere are
    /// released.
    fn cancel_same_day_pending(
        &mut self,
        confirmed_slot_id: Uuid,
        start: DateTime<Utc>,
        players: &HashSet<Uuid>,
    ) -> Result<(), Error> {
        let day = start.date_naive();
        let conflicting: Vec<Uuid> = self
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Pending
                    && b.slot_id != confirmed_slot_id
                    && !b.is_instructor_subsidy
                    && players.contains(&b.player_id)
            })
            .filter(|b| {
                self.slots
                    .get(&b.slot_id)
                    .map(|s| s.start.date_naive() == day)
                    .unwrap_or(false)
            })
            .map(|b| b.booking_id)
            .collect();

        for booking_id in conflicting {
            self.release_and_cancel(booking_id, "same-day conflict released")?;
        }
        Ok(())
    }

    fn release_and_cancel(&mut self, booking_id: Uuid, concept: &str) -> Result<(), Error> {
        let booking = self.booking(booking_id)?.clone();
        if !booking.amount.is_zero() {
            self.ledger_mut(booking.player_id).release(
                booking.amount.method,
                booking.amount.value,
                concept,
                booking_id,
            )?;
        }
        if let Some(b) = self.bookings.get_mut(&booking_id) {
            b.status = BookingStatus::Cancelled;
        }
        Ok(())
    }

    /// Vacating a confirmed seat: the captured amount comes back as points
    /// (the court is already bound) and the seats enter the recycled,
    /// points-only market.
    fn recycle_confirmed_seat(&mut self, booking: &Booking) -> Result<CancelOutcome, Error> {
        let points_granted = booking.amount.value;
        if points_granted > 0 {
            self.ledger_mut(booking.player_id).grant_points(
                points_granted,
                "confirmed seat converted to points",
                booking.booking_id,
            )?;
        }
        if let Some(b) = self.bookings.get_mut(&booking.booking_id) {
            b.status = BookingStatus::Cancelled;
            b.is_recycled = true;
        }
        if let Some(slot) = self.slots.get_mut(&booking.slot_id) {
            slot.available_recycled_seats += booking.seats;
            slot.recycled_seats_only_points = true;
            tracing::info!(
                slot_id = %booking.slot_id,
                available = slot.available_recycled_seats,
                "confirmed seat recycled"
            );
        }
        Ok(CancelOutcome {
            refunded_amount: 0,
            points_granted,
            slot_freed: true,
        })
    }

    // ---- consistency check ----

    /// Re-derive every cached value and report the first divergence. Meant
    /// for a periodic verification job; cheap enough to run after tests.
    pub fn verify(&self) -> Result<(), Error> {
        for ledger in self.ledgers.values() {
            ledger.verify()?;
        }

        for slot in self.slots.values() {
            for option in &slot.options {
                let occupied = self.occupied_seats(slot.slot_id, option.group_size);
                if occupied > option.required_seats() {
                    return Err(Error::Inconsistent(format!(
                        "slot {} option {} holds {} seats over its {} required",
                        slot.slot_id,
                        option.group_size,
                        occupied,
                        option.required_seats()
                    )));
                }
            }

            // Freed seats come from race bookings cancelled after
            // confirmation; active recycled bookings consume them.
            let freed: u32 = self
                .bookings
                .values()
                .filter(|b| {
                    b.slot_id == slot.slot_id
                        && b.is_recycled
                        && !b.is_active()
                        && b.chosen_option.is_some()
                })
                .map(|b| b.seats)
                .sum();
            let consumed: u32 = self
                .bookings
                .values()
                .filter(|b| {
                    b.slot_id == slot.slot_id
                        && b.is_recycled
                        && b.is_active()
                        && b.chosen_option.is_none()
                })
                .map(|b| b.seats)
                .sum();
            let derived = freed.checked_sub(consumed).ok_or_else(|| {
                Error::Inconsistent(format!(
                    "slot {} consumed more recycled seats than were freed",
                    slot.slot_id
                ))
            })?;
            if derived != slot.available_recycled_seats {
                return Err(Error::Inconsistent(format!(
                    "slot {} caches {} recycled seats but {} derive from bookings",
                    slot.slot_id, slot.available_recycled_seats, derived
                )));
            }

            if !slot.is_confirmed() && slot.available_recycled_seats != 0 {
                return Err(Error::Inconsistent(format!(
                    "open slot {} has recycled seats",
                    slot.slot_id
                )));
            }
        }

        let confirmed: Vec<&ClassSlot> =
            self.slots.values().filter(|s| s.is_confirmed()).collect();
        for (i, a) in confirmed.iter().enumerate() {
            for b in confirmed.iter().skip(i + 1) {
                if a.club_id == b.club_id
                    && a.court_id == b.court_id
                    && a.overlaps(b.start, b.end)
                {
                    return Err(Error::Inconsistent(format!(
                        "slots {} and {} share court {:?} on overlapping windows",
                        a.slot_id, b.slot_id, a.court_id
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::Gender;
    use chrono::TimeZone;
    use speculoos::prelude::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 3, hour, 0, 0).unwrap()
    }

    fn funds(value: i64) -> HeldAmount {
        HeldAmount {
            method: PaymentMethod::Funds,
            value,
        }
    }

    fn profile(level_tenths: i32) -> PlayerProfile {
        PlayerProfile {
            player_id: Uuid::new_v4(),
            level_tenths,
            gender: Gender::Mixed,
        }
    }

    struct World {
        state: EngineState,
        club_id: Uuid,
        instructor_id: Uuid,
    }

    fn world(courts: &[u32]) -> World {
        let mut state = EngineState::default();
        let club_id = Uuid::new_v4();
        state.register_club(Club {
            club_id,
            courts: courts.to_vec(),
        });
        World {
            state,
            club_id,
            instructor_id: Uuid::new_v4(),
        }
    }

    impl World {
        fn slot(&mut self, from: u32, to: u32, group_sizes: &[u8]) -> Uuid {
            let slot = ClassSlot::proposal(
                self.instructor_id,
                self.club_id,
                at(from),
                at(to),
                group_sizes,
            );
            let slot_id = slot.slot_id;
            self.state.publish_slot(slot);
            slot_id
        }

        fn player(&mut self, balance: i64) -> PlayerProfile {
            let player = profile(30);
            self.state
                .open_ledger(PlayerLedger::with_balance(player.player_id, balance, 0));
            player
        }

        fn book(&mut self, player: &PlayerProfile, slot_id: Uuid, group_size: u8) -> Booking {
            self.state
                .create_booking(NewBooking {
                    player: player.clone(),
                    slot_id,
                    group_size,
                    amount: funds(1_000),
                })
                .unwrap()
        }
    }

    #[test]
    fn test_option_completion_confirms_with_lowest_court() {
        let mut w = world(&[1, 2]);
        let slot_id = w.slot(10, 11, &[1, 2, 4]);
        let (alice, bob) = (w.player(5_000), w.player(5_000));

        let first = w.book(&alice, slot_id, 2);
        assert_that!(first.status).is_equal_to(BookingStatus::Pending);

        let second = w.book(&bob, slot_id, 2);
        assert_that!(second.status).is_equal_to(BookingStatus::Confirmed);

        let slot = w.state.slot(slot_id).unwrap();
        assert_that!(slot.court_id).contains_value(&1);
        assert_that!(w.state.verify()).is_ok();
    }

    #[test]
    fn test_losing_options_are_cancelled_and_released() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[2, 4]);
        let (alice, bob, carol) = (w.player(5_000), w.player(5_000), w.player(5_000));

        let loser = w.book(&carol, slot_id, 4);
        w.book(&alice, slot_id, 2);
        w.book(&bob, slot_id, 2);

        let loser = w.state.booking(loser.booking_id).unwrap();
        assert_that!(loser.status).is_equal_to(BookingStatus::Cancelled);
        let ledger = w.state.ledger(carol.player_id).unwrap();
        assert_that!(ledger.available(PaymentMethod::Funds)).is_equal_to(5_000);
        assert_that!(ledger.held(PaymentMethod::Funds)).is_equal_to(0);
        assert_that!(w.state.verify()).is_ok();
    }

    #[test]
    fn test_smallest_full_option_wins() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[1, 2]);
        let alice = w.player(5_000);

        // One booking of the 1-player option also leaves the 2-player
        // option short, so only the smallest modality can win here.
        let booking = w.book(&alice, slot_id, 1);

        assert_that!(booking.status).is_equal_to(BookingStatus::Confirmed);
        assert_that!(w.state.slot(slot_id).unwrap().is_confirmed()).is_true();
    }

    #[test]
    fn test_full_option_rejects_further_bookings() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[1, 4]);
        let (alice, bob) = (w.player(5_000), w.player(5_000));
        w.book(&alice, slot_id, 1);

        let res = w.state.create_booking(NewBooking {
            player: bob.clone(),
            slot_id,
            group_size: 1,
            amount: funds(1_000),
        });

        assert_that!(res)
            .is_err()
            .is_equal_to(Error::OptionFull { group_size: 1 });
        // The losing option instead sees the slot as settled.
        let res = w.state.create_booking(NewBooking {
            player: bob,
            slot_id,
            group_size: 4,
            amount: funds(1_000),
        });
        assert_that!(res)
            .is_err()
            .is_equal_to(Error::SlotAlreadyConfirmed(slot_id));
    }

    #[test]
    fn test_no_court_fails_the_whole_unit() {
        let mut w = world(&[1]);
        let blocking = w.slot(10, 11, &[1]);
        let racing = w.slot(10, 11, &[1]);
        let (alice, bob) = (w.player(5_000), w.player(5_000));
        w.book(&alice, blocking, 1);

        let res = w.state.create_booking(NewBooking {
            player: bob.clone(),
            slot_id: racing,
            group_size: 1,
            amount: funds(1_000),
        });

        assert_that!(res)
            .is_err()
            .is_equal_to(Error::NoCourtAvailable { club_id: w.club_id });
        // The caller rolls the unit back; here only the resolver ran, so
        // the slot must still be open.
        assert_that!(w.state.slot(racing).unwrap().is_confirmed()).is_false();
    }

    #[test]
    fn test_first_booking_narrows_and_clones_once() {
        let mut w = world(&[1, 2]);
        let slot_id = w.slot(10, 11, &[2, 4]);
        let alice = w.player(5_000);

        w.book(&alice, slot_id, 4);

        let slot = w.state.slot(slot_id).unwrap();
        assert_that!(slot.classification).is_equal_to(Classification::Set {
            level: LevelRange::around(30),
            gender: Gender::Mixed,
        });
        let clones: Vec<&ClassSlot> = w
            .state
            .slots()
            .filter(|s| s.slot_id != slot_id && s.start == at(10))
            .collect();
        assert_that!(clones).has_length(1);
        assert_that!(clones[0].classification).is_equal_to(Classification::Open);
        let clone_slot_id = clones[0].slot_id;

        // A second first-booking situation on the same window must not
        // clone again while the open clone exists.
        let bob = w.player(5_000);
        w.book(&bob, clone_slot_id, 4);
        let open_clones = w
            .state
            .slots()
            .filter(|s| s.start == at(10) && s.classification == Classification::Open)
            .count();
        assert_that!(open_clones).is_equal_to(1);
    }

    #[test]
    fn test_same_day_pending_bookings_are_released_on_confirmation() {
        let mut w = world(&[1, 2]);
        let slot_x = w.slot(10, 11, &[1]);
        let slot_y = w.slot(12, 13, &[2]);
        let alice = w.player(5_000);

        let on_y = w.book(&alice, slot_y, 2);
        w.book(&alice, slot_x, 1);

        let on_y = w.state.booking(on_y.booking_id).unwrap();
        assert_that!(on_y.status).is_equal_to(BookingStatus::Cancelled);
        let ledger = w.state.ledger(alice.player_id).unwrap();
        assert_that!(ledger.held(PaymentMethod::Funds)).is_equal_to(0);
        assert_that!(w.state.verify()).is_ok();
    }

    #[test]
    fn test_points_require_a_points_redeemable_option() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[2]);
        let alice = w.player(0);
        w.state
            .open_ledger(PlayerLedger::with_balance(alice.player_id, 0, 10_000));

        let res = w.state.create_booking(NewBooking {
            player: alice.clone(),
            slot_id,
            group_size: 2,
            amount: HeldAmount {
                method: PaymentMethod::Points,
                value: 800,
            },
        });
        assert_that!(res)
            .is_err()
            .is_equal_to(Error::PointsNotAccepted { group_size: 2 });

        w.state
            .subsidize_seat(w.instructor_id, slot_id, 2)
            .unwrap();
        let res = w.state.create_booking(NewBooking {
            player: alice,
            slot_id,
            group_size: 2,
            amount: HeldAmount {
                method: PaymentMethod::Points,
                value: 800,
            },
        });
        assert_that!(res).is_ok();
    }

    #[test]
    fn test_subsidy_on_last_missing_seat_confirms() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[2]);
        let alice = w.player(5_000);
        w.book(&alice, slot_id, 2);

        let subsidy = w
            .state
            .subsidize_seat(w.instructor_id, slot_id, 2)
            .unwrap();

        assert_that!(subsidy.is_instructor_subsidy).is_true();
        assert_that!(subsidy.status).is_equal_to(BookingStatus::Confirmed);
        assert_that!(w.state.slot(slot_id).unwrap().is_confirmed()).is_true();
        assert_that!(w.state.verify()).is_ok();
    }

    #[test]
    fn test_subsidy_requires_the_owning_instructor() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[2]);
        let intruder = Uuid::new_v4();

        let res = w.state.subsidize_seat(intruder, slot_id, 2);

        assert_that!(res).is_err().is_equal_to(Error::NotAuthorizedForSlot {
            instructor_id: intruder,
            slot_id,
        });
    }

    #[test]
    fn test_recycle_and_resell_a_confirmed_seat() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[2]);
        let (alice, bob) = (w.player(5_000), w.player(5_000));
        let booking = w.book(&alice, slot_id, 2);
        w.book(&bob, slot_id, 2);

        let outcome = w.state.cancel_booking(booking.booking_id).unwrap();
        assert_that!(outcome).is_equal_to(CancelOutcome {
            refunded_amount: 0,
            points_granted: 1_000,
            slot_freed: true,
        });
        let slot = w.state.slot(slot_id).unwrap();
        assert_that!(slot.available_recycled_seats).is_equal_to(1);
        assert_that!(slot.recycled_seats_only_points).is_true();
        assert_that!(w.state.verify()).is_ok();

        let carol = Uuid::new_v4();
        w.state
            .open_ledger(PlayerLedger::with_balance(carol, 0, 2_000));
        let recycled = w.state.book_recycled_seat(carol, slot_id, 1, 700).unwrap();
        assert_that!(recycled.status).is_equal_to(BookingStatus::Confirmed);
        assert_that!(recycled.is_recycled).is_true();
        assert_that!(w.state.slot(slot_id).unwrap().available_recycled_seats).is_equal_to(0);
        assert_that!(w.state.verify()).is_ok();

        let res = w.state.book_recycled_seat(carol, slot_id, 1, 700);
        assert_that!(res).is_err().is_equal_to(Error::RecycledSeatsExhausted {
            requested: 1,
            available: 0,
        });
    }

    #[test]
    fn test_cancelling_twice_reports_already_cancelled() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[4]);
        let alice = w.player(5_000);
        let booking = w.book(&alice, slot_id, 4);

        let first = w.state.cancel_booking(booking.booking_id).unwrap();
        assert_that!(first.refunded_amount).is_equal_to(1_000);

        let second = w.state.cancel_booking(booking.booking_id);
        assert_that!(second)
            .is_err()
            .is_equal_to(Error::AlreadyCancelled(booking.booking_id));
    }

    #[test]
    fn test_insufficient_funds_writes_no_state() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[2]);
        let broke = w.player(100);

        let res = w.state.create_booking(NewBooking {
            player: broke.clone(),
            slot_id,
            group_size: 2,
            amount: funds(1_000),
        });

        assert_that!(res).is_err().matches(|e| {
            matches!(e, Error::InsufficientFunds { required: 1_000, available: 100, .. })
        });
        assert_that!(w.state.bookings().count()).is_equal_to(0);
    }

    #[test]
    fn test_confirmation_spares_the_instructors_other_subsidies() {
        let mut w = world(&[1, 2]);
        let morning = w.slot(10, 11, &[2]);
        let evening = w.slot(18, 19, &[2]);
        let alice = w.player(5_000);

        let evening_subsidy = w
            .state
            .subsidize_seat(w.instructor_id, evening, 2)
            .unwrap();
        w.book(&alice, morning, 2);
        let morning_subsidy = w
            .state
            .subsidize_seat(w.instructor_id, morning, 2)
            .unwrap();
        assert_that!(morning_subsidy.status).is_equal_to(BookingStatus::Confirmed);

        // The instructor teaches several classes a day; sponsoring the
        // morning slot must not touch the evening one.
        let evening_subsidy = w.state.booking(evening_subsidy.booking_id).unwrap();
        assert_that!(evening_subsidy.status).is_equal_to(BookingStatus::Pending);
        assert_that!(w.state.verify()).is_ok();
    }

    #[test]
    fn test_recycled_purchase_rejects_non_positive_quantities() {
        let mut w = world(&[1]);
        let slot_id = w.slot(10, 11, &[2]);
        let mallory = Uuid::new_v4();
        w.state
            .open_ledger(PlayerLedger::with_balance(mallory, 0, 0));

        let res = w.state.book_recycled_seat(mallory, slot_id, 1, -5_000);
        assert_that!(res)
            .is_err()
            .is_equal_to(Error::NonPositiveAmount(-5_000));

        let res = w.state.book_recycled_seat(mallory, slot_id, 0, 700);
        assert_that!(res)
            .is_err()
            .is_equal_to(Error::NonPositiveAmount(0));

        // No balance was minted and no transaction recorded.
        let ledger = w.state.ledger(mallory).unwrap();
        assert_that!(ledger.available(PaymentMethod::Points)).is_equal_to(0);
        assert_that!(ledger.transactions().len()).is_equal_to(0);
        assert_that!(w.state.verify()).is_ok();
    }

    #[test]
    fn test_snapshot_exposes_the_narrowed_classification() {
        let mut w = world(&[1, 2]);
        let slot_id = w.slot(10, 11, &[2, 4]);
        let alice = w.player(5_000);

        let before = w.state.snapshot(slot_id).unwrap();
        assert_that!(before.classification).is_equal_to(Classification::Open);

        w.book(&alice, slot_id, 4);

        let after = w.state.snapshot(slot_id).unwrap();
        assert_that!(after.classification).is_equal_to(Classification::Set {
            level: LevelRange::around(30),
            gender: Gender::Mixed,
        });
    }

    #[test]
    fn test_smallest_of_several_full_options_wins_unsorted() {
        // A club without courts, so the first completion attempt fails
        // and (without the store's rollback) leaves a full option behind.
        let mut w = world(&[]);
        let mut slot =
            ClassSlot::proposal(w.instructor_id, w.club_id, at(10), at(11), &[1, 2]);
        slot.options.reverse();
        let slot_id = slot.slot_id;
        w.state.publish_slot(slot);
        let (alice, bob, carol) = (w.player(5_000), w.player(5_000), w.player(5_000));

        w.book(&alice, slot_id, 2);
        let res = w.state.create_booking(NewBooking {
            player: bob.clone(),
            slot_id,
            group_size: 2,
            amount: funds(1_000),
        });
        assert_that!(res)
            .is_err()
            .is_equal_to(Error::NoCourtAvailable { club_id: w.club_id });

        // The club gains a court; the next mutation finds both options
        // full and must settle on the smallest one.
        w.state.register_club(Club {
            club_id: w.club_id,
            courts: vec![1],
        });
        let booking = w.book(&carol, slot_id, 1);

        assert_that!(booking.status).is_equal_to(BookingStatus::Confirmed);
        let losers = [alice.player_id, bob.player_id];
        for player_id in losers {
            let ledger = w.state.ledger(player_id).unwrap();
            assert_that!(ledger.available(PaymentMethod::Funds)).is_equal_to(5_000);
            assert_that!(ledger.held(PaymentMethod::Funds)).is_equal_to(0);
        }
        assert_that!(w.state.verify()).is_ok();
    }
}
