use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};
use tracing::debug;

use crate::{
    autosave::model::{ManualSaveReply, SaveTrigger},
    draft::{DocumentSnapshot, DraftToken, SaveIdentity},
    transport::{DraftTransport, TransportError},
};

#[derive(Debug)]
pub(super) struct SaveRequest {
    pub trigger: SaveTrigger,
    pub snapshot: DocumentSnapshot,
    pub reply: Option<ManualSaveReply>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Persisted {
    Created(DraftToken),
    Updated,
}

#[derive(Debug)]
pub(super) struct Finished {
    pub request: SaveRequest,
    pub result: Result<Persisted, TransportError>,
}

struct InFlight {
    request: SaveRequest,
    call: BoxFuture<'static, Result<Persisted, TransportError>>,
}

/// Runs at most one transport call at a time.
pub(super) struct SaveExecutor<T> {
    transport: Arc<T>,
    in_flight: Option<InFlight>,
}

impl<T: DraftTransport> SaveExecutor<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            in_flight: None,
        }
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts the transport call matching `identity`.
    ///
    /// Hands the request back untouched if a call is already in flight.
    pub fn start(&mut self, request: SaveRequest, identity: &SaveIdentity) -> Result<(), SaveRequest> {
        if self.is_saving() {
            return Err(request);
        }
        let transport = Arc::clone(&self.transport);
        let snapshot = request.snapshot.clone();
        let call = match identity.token().cloned() {
            Some(token) => {
                debug!("Updating draft {token} ({})", request.trigger);
                async move {
                    transport
                        .update_draft(&token, &snapshot)
                        .await
                        .map(|()| Persisted::Updated)
                }
                .boxed()
            }
            None => {
                debug!("Creating draft ({})", request.trigger);
                async move {
                    transport
                        .create_draft(&snapshot)
                        .await
                        .map(Persisted::Created)
                }
                .boxed()
            }
        };
        self.in_flight = Some(InFlight { request, call });
        Ok(())
    }

    /// Drives the in-flight call to completion. Never resolves while idle.
    ///
    /// The executor is idle again once this returns, whatever the result.
    /// Cancel-safe: dropping the future leaves the call in flight.
    pub async fn finished(&mut self) -> Finished {
        if let Some(in_flight) = self.in_flight.as_mut() {
            let result = in_flight.call.as_mut().await;
            if let Some(InFlight { request, .. }) = self.in_flight.take() {
                return Finished { request, result };
            }
        }
        std::future::pending().await
    }

    /// Drops the in-flight call, if any, without waiting for it.
    pub fn abort(&mut self) -> Option<SaveRequest> {
        self.in_flight.take().map(|in_flight| in_flight.request)
    }
}
