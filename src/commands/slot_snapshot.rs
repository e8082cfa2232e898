use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower::Service;
use uuid::Uuid;

use crate::{domain::SlotSnapshot, ports::store::StorePort};

use super::{DomainLogic, Error};

/// Read model for listing/calendar views.
pub struct SlotSnapshotRequest {
    pub slot_id: Uuid,
}

impl<S, P, R> Service<SlotSnapshotRequest> for DomainLogic<S, P, R>
where
    S: StorePort + 'static,
{
    type Response = SlotSnapshot;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: SlotSnapshotRequest) -> Self::Future {
        let store = self.store.clone();
        Box::pin(async move { Ok(store.slot_snapshot(req.slot_id).await?) })
    }
}
