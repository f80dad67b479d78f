//! The virtual-filesystem adapter over a [`Backend`].
//!
//! `Gateway` itself only carries the shared pieces: the backend handle, the
//! behaviour switches and the span every event is logged under. Path
//! resolution, listings and request dispatch are implemented on it in
//! `resolver`, `listing` and `handlers::dispatcher`.

use super::{backend::Backend, context::RequestContext};
use crate::{
    errors::{FsError, FsResult},
    models::{ids::OwnerId, metadata::PlacementPolicy},
};
use std::{future::Future, path::PathBuf, sync::Arc};
use tracing::Span;

/// Behaviour switches of a gateway instance.
#[derive(Clone, Debug, Default)]
pub struct GatewaySettings {
    /// Identity that owns listed buckets and everything created here.
    pub owner: OwnerId,

    /// Refuse Put/Open/Mkdir/Remove/Rmdir.
    pub read_only: bool,

    /// Placement policy for buckets created by Mkdir.
    pub container_policy: PlacementPolicy,

    /// Fail writes and Mkdir whose display name already exists instead of
    /// creating a second entry under the same name.
    pub reject_duplicate_names: bool,

    /// Where writers spill staged bytes. System temp dir when unset.
    pub staging_dir: Option<PathBuf>,
}

#[derive(Clone)]
pub struct Gateway {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) settings: GatewaySettings,
    pub(crate) log: Span,
}

impl Gateway {
    /// `log` is the span all gateway events are recorded under; readers and
    /// writers get child spans of it.
    pub fn new(backend: Arc<dyn Backend>, settings: GatewaySettings, log: Span) -> Self {
        Self {
            backend,
            settings,
            log,
        }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Issue one backend call under the request context and attach the
    /// operation and path to any failure.
    pub(crate) async fn call<T, F>(
        &self,
        ctx: &RequestContext,
        op: &'static str,
        path: &str,
        fut: F,
    ) -> FsResult<T>
    where
        F: Future<Output = super::backend::BackendResult<T>>,
    {
        ctx.run(fut).await.map_err(|err| {
            tracing::debug!(parent: &self.log, op, path, error = %err, "backend call failed");
            FsError::backend(op, path, err)
        })
    }

    /// Cheap round trip used by readiness probes.
    pub async fn probe(&self, ctx: &RequestContext) -> FsResult<usize> {
        let owner = self.settings.owner;
        let ids = self
            .call(ctx, "list_containers", "/", self.backend.list_containers(owner))
            .await?;
        Ok(ids.len())
    }
}
