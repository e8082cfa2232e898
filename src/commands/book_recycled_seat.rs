use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower::Service;
use uuid::Uuid;

use crate::ports::store::StorePort;

use super::{DomainLogic, Error};

/// Buy vacated capacity on an already-confirmed slot. Points only.
pub struct BookRecycledSeatRequest {
    pub player_id: Uuid,
    pub slot_id: Uuid,
    pub seats: u32,
    pub points: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub struct BookRecycledSeatResponse {
    pub booking_id: Uuid,
    pub seats: u32,
    pub points_spent: i64,
}

impl<S, P, R> Service<BookRecycledSeatRequest> for DomainLogic<S, P, R>
where
    S: StorePort + 'static,
{
    type Response = BookRecycledSeatResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: BookRecycledSeatRequest) -> Self::Future {
        let store = self.store.clone();
        Box::pin(async move {
            let booking = store
                .book_recycled_seat(req.player_id, req.slot_id, req.seats, req.points)
                .await?;
            Ok(BookRecycledSeatResponse {
                booking_id: booking.booking_id,
                seats: booking.seats,
                points_spent: booking.amount.value,
            })
        })
    }
}
