use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower::Service;
use uuid::Uuid;

use crate::{domain, ports::store::StorePort};

use super::{DomainLogic, Error};

pub struct CancelBookingRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CancelBookingResponse {
    /// Hold returned to the player, in the method the booking was paid.
    pub refunded_amount: i64,
    /// Points granted instead of a refund when a confirmed seat is freed.
    pub points_granted: i64,
    /// The cancellation opened recycled capacity on a confirmed slot.
    pub slot_freed: bool,
}

impl<S, P, R> Service<CancelBookingRequest> for DomainLogic<S, P, R>
where
    S: StorePort + 'static,
{
    type Response = CancelBookingResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CancelBookingRequest) -> Self::Future {
        let store = self.store.clone();
        Box::pin(async move {
            match store.cancel_booking(req.booking_id).await {
                Ok(outcome) => Ok(CancelBookingResponse {
                    refunded_amount: outcome.refunded_amount,
                    points_granted: outcome.points_granted,
                    slot_freed: outcome.slot_freed,
                }),
                // Cancelling twice is a no-op, not a failure.
                Err(crate::ports::store::Error::Domain(domain::Error::AlreadyCancelled(_))) => {
                    Ok(CancelBookingResponse::default())
                }
                Err(err) => Err(err.into()),
            }
        })
    }
}
