use uuid::Uuid;

use super::booking::PaymentMethod;
use super::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionKind {
    /// Reserve money against a pending booking.
    Hold,
    /// Finalize a hold; the money leaves the player.
    Capture,
    /// Return a hold to the available balance.
    Release,
    /// Grant points in compensation for captured funds.
    Convert,
}

/// Immutable record of one ledger movement. Never edited, never deleted.
#[derive(Clone, Debug)]
pub struct LedgerTransaction {
    pub transaction_id: Uuid,
    pub kind: TransactionKind,
    pub method: PaymentMethod,
    pub amount: i64,
    /// Available balance for `method` right after this transaction.
    pub resulting_available: i64,
    pub concept: String,
    pub booking_id: Uuid,
}

/// Per-player running balances plus the append-only transaction log.
///
/// Every append re-derives the expected balance by replaying the log; a
/// mismatch freezes the ledger and all further writes fail until the
/// player's account is reconciled. Corruption is never auto-corrected.
#[derive(Clone, Debug)]
pub struct PlayerLedger {
    pub player_id: Uuid,
    opening_funds: i64,
    opening_points: i64,
    available_funds: i64,
    available_points: i64,
    held_funds: i64,
    held_points: i64,
    transactions: Vec<LedgerTransaction>,
    frozen: bool,
}

impl PlayerLedger {
    pub fn new(player_id: Uuid) -> Self {
        Self::with_balance(player_id, 0, 0)
    }

    /// Ledger seeded with an opening balance (top-ups are out of scope).
    pub fn with_balance(player_id: Uuid, funds: i64, points: i64) -> Self {
        Self {
            player_id,
            opening_funds: funds,
            opening_points: points,
            available_funds: funds,
            available_points: points,
            held_funds: 0,
            held_points: 0,
            transactions: Vec::default(),
            frozen: false,
        }
    }

    pub fn available(&self, method: PaymentMethod) -> i64 {
        match method {
            PaymentMethod::Funds => self.available_funds,
            PaymentMethod::Points => self.available_points,
        }
    }

    pub fn held(&self, method: PaymentMethod) -> i64 {
        match method {
            PaymentMethod::Funds => self.held_funds,
            PaymentMethod::Points => self.held_points,
        }
    }

    pub fn transactions(&self) -> &[LedgerTransaction] {
        &self.transactions
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Block `amount` against a booking. Fails if the unblocked balance
    /// does not cover it.
    pub fn hold(
        &mut self,
        method: PaymentMethod,
        amount: i64,
        concept: &str,
        booking_id: Uuid,
    ) -> Result<(), Error> {
        // A non-positive hold would mint balance instead of blocking it.
        if amount <= 0 {
            return Err(Error::NonPositiveAmount(amount));
        }
        if self.available(method) < amount {
            return Err(Error::InsufficientFunds {
                method,
                required: amount,
                available: self.available(method),
            });
        }
        self.append(TransactionKind::Hold, method, amount, concept, booking_id)
    }

    /// Finalize a hold: the held amount leaves the player for good.
    pub fn capture(
        &mut self,
        method: PaymentMethod,
        amount: i64,
        concept: &str,
        booking_id: Uuid,
    ) -> Result<(), Error> {
        self.append(TransactionKind::Capture, method, amount, concept, booking_id)
    }

    /// Undo a hold: the held amount returns to the available balance.
    pub fn release(
        &mut self,
        method: PaymentMethod,
        amount: i64,
        concept: &str,
        booking_id: Uuid,
    ) -> Result<(), Error> {
        self.append(TransactionKind::Release, method, amount, concept, booking_id)
    }

    /// Grant points compensating a captured amount (1 cent = 1 point).
    pub fn grant_points(
        &mut self,
        amount: i64,
        concept: &str,
        booking_id: Uuid,
    ) -> Result<(), Error> {
        self.append(
            TransactionKind::Convert,
            PaymentMethod::Points,
            amount,
            concept,
            booking_id,
        )
    }

    fn append(
        &mut self,
        kind: TransactionKind,
        method: PaymentMethod,
        amount: i64,
        concept: &str,
        booking_id: Uuid,
    ) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::LedgerFrozen(self.player_id));
        }

        let (available, held) = match method {
            PaymentMethod::Funds => (&mut self.available_funds, &mut self.held_funds),
            PaymentMethod::Points => (&mut self.available_points, &mut self.held_points),
        };
        match kind {
            TransactionKind::Hold => {
                *available -= amount;
                *held += amount;
            }
            TransactionKind::Capture => {
                *held -= amount;
            }
            TransactionKind::Release => {
                *held -= amount;
                *available += amount;
            }
            TransactionKind::Convert => {
                *available += amount;
            }
        }
        let resulting_available = *available;

        self.transactions.push(LedgerTransaction {
            transaction_id: Uuid::new_v4(),
            kind,
            method,
            amount,
            resulting_available,
            concept: concept.to_string(),
            booking_id,
        });

        // Balance arithmetic mismatch is fatal for this ledger.
        if let Err(err) = self.verify() {
            self.frozen = true;
            return Err(err);
        }
        Ok(())
    }

    /// Replay the transaction log from the opening balance.
    pub fn replayed_available(&self, method: PaymentMethod) -> i64 {
        let opening = match method {
            PaymentMethod::Funds => self.opening_funds,
            PaymentMethod::Points => self.opening_points,
        };
        self.transactions
            .iter()
            .filter(|t| t.method == method)
            .fold(opening, |balance, t| match t.kind {
                TransactionKind::Hold => balance - t.amount,
                TransactionKind::Capture => balance,
                TransactionKind::Release | TransactionKind::Convert => balance + t.amount,
            })
    }

    fn replayed_held(&self, method: PaymentMethod) -> i64 {
        self.transactions
            .iter()
            .filter(|t| t.method == method)
            .fold(0, |held, t| match t.kind {
                TransactionKind::Hold => held + t.amount,
                TransactionKind::Capture | TransactionKind::Release => held - t.amount,
                TransactionKind::Convert => held,
            })
    }

    /// Check the cached balances against a full replay of the log.
    pub fn verify(&self) -> Result<(), Error> {
        for method in [PaymentMethod::Funds, PaymentMethod::Points] {
            let replayed = self.replayed_available(method);
            if replayed != self.available(method) {
                return Err(Error::LedgerCorrupted {
                    player_id: self.player_id,
                    detail: format!(
                        "available {method:?} is {} but the log replays to {replayed}",
                        self.available(method)
                    ),
                });
            }
            let replayed_held = self.replayed_held(method);
            if replayed_held != self.held(method) {
                return Err(Error::LedgerCorrupted {
                    player_id: self.player_id,
                    detail: format!(
                        "held {method:?} is {} but the log replays to {replayed_held}",
                        self.held(method)
                    ),
                });
            }
            if self.held(method) < 0 {
                return Err(Error::LedgerCorrupted {
                    player_id: self.player_id,
                    detail: format!("held {method:?} is negative"),
                });
            }
        }
        Ok(())
    }
}
