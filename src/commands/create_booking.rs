use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower::Service;
use uuid::Uuid;

use crate::{
    domain::{BookingStatus, HeldAmount, NewBooking, PaymentMethod, PlayerProfile},
    ports::{player::PlayerPort, pricing::PricingPort, store::StorePort},
};

use super::{DomainLogic, Error};

/// A player reserves one seat of one group-size option of a slot.
pub struct CreateBookingRequest {
    pub player_id: Uuid,
    pub slot_id: Uuid,
    pub group_size: u8,
    pub payment: PaymentMethod,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub slot_id: Uuid,
    /// `Confirmed` when this very booking completed the option and won the
    /// race; `Pending` otherwise.
    pub status: BookingStatus,
    pub payment: PaymentMethod,
    pub amount_blocked: i64,
}

impl<S, P, R> Service<CreateBookingRequest> for DomainLogic<S, P, R>
where
    S: StorePort + 'static,
    P: PlayerPort + 'static,
    R: PricingPort + 'static,
{
    type Response = CreateBookingResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CreateBookingRequest) -> Self::Future {
        let store = self.store.clone();
        let players = self.players.clone();
        let pricing = self.pricing.clone();
        Box::pin(async move {
            // Fetch collaborator data outside the atomic unit; only the
            // store call below reads and writes contended state.
            let player = players.get_player(req.player_id).await?;
            let slot_pricing = pricing.slot_pricing(req.slot_id).await?;

            let amount = HeldAmount {
                method: req.payment,
                value: match req.payment {
                    PaymentMethod::Funds => slot_pricing.per_seat_cents(req.group_size),
                    PaymentMethod::Points => slot_pricing.seat_points,
                },
            };

            let booking = store
                .create_booking(NewBooking {
                    player: PlayerProfile {
                        player_id: player.player_id,
                        level_tenths: player.level_tenths,
                        gender: player.gender,
                    },
                    slot_id: req.slot_id,
                    group_size: req.group_size,
                    amount,
                })
                .await?;

            Ok(CreateBookingResponse {
                booking_id: booking.booking_id,
                slot_id: booking.slot_id,
                status: booking.status,
                payment: booking.amount.method,
                amount_blocked: booking.amount.value,
            })
        })
    }
}
