use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower::Service;
use uuid::Uuid;

use crate::{domain::BookingStatus, ports::store::StorePort};

use super::{DomainLogic, Error};

/// The owning instructor sponsors one seat of an open option to pull the
/// slot towards completion.
pub struct SubsidizeSeatRequest {
    pub instructor_id: Uuid,
    pub slot_id: Uuid,
    pub group_size: u8,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SubsidizeSeatResponse {
    pub booking_id: Uuid,
    /// `Confirmed` when the subsidy was the last missing seat.
    pub status: BookingStatus,
}

impl<S, P, R> Service<SubsidizeSeatRequest> for DomainLogic<S, P, R>
where
    S: StorePort + 'static,
{
    type Response = SubsidizeSeatResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: SubsidizeSeatRequest) -> Self::Future {
        let store = self.store.clone();
        Box::pin(async move {
            let booking = store
                .subsidize_seat(req.instructor_id, req.slot_id, req.group_size)
                .await?;
            Ok(SubsidizeSeatResponse {
                booking_id: booking.booking_id,
                status: booking.status,
            })
        })
    }
}
