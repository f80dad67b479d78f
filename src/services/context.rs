//! Per-request cancellation and deadline.

use super::backend::{BackendError, BackendResult};
use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

/// Default bound on a single backend round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Carries the transport's cancellation token and the per-call timeout into
/// every backend call made on behalf of one request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    cancel: CancellationToken,
    timeout: Duration,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self { cancel, timeout }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run one backend call, aborting it when the request is cancelled or the
    /// timeout elapses. The call future is dropped in both cases.
    pub async fn run<T, F>(&self, call: F) -> BackendResult<T>
    where
        F: Future<Output = BackendResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BackendError::Cancelled),
            res = tokio::time::timeout(self.timeout, call) => {
                res.map_err(|_| BackendError::Timeout(self.timeout))?
            }
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(CancellationToken::new(), DEFAULT_REQUEST_TIMEOUT)
    }
}
