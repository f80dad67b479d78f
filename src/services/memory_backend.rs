//! In-process backend.
//!
//! Keeps containers and objects in insertion-ordered maps. Used for
//! `--backend memory` dev runs and as the test double for the gateway: it
//! counts calls, can stall every call until cancelled, and can fail head
//! calls for chosen objects.

use super::backend::{
    Backend, BackendError, BackendResult, DEFAULT_MAX_CHUNK_SIZE, PayloadStream, SearchFilter,
};
use crate::models::{
    ids::{BucketId, ObjectId, OwnerId},
    metadata::{ContainerHeader, ContainerMeta, ObjectHeader, ObjectMeta},
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use indexmap::IndexMap;
use std::{
    collections::HashSet,
    io,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::RwLock;

struct StoredObject {
    meta: ObjectMeta,
    parent: Option<ObjectId>,
    payload: Bytes,
}

struct StoredContainer {
    meta: ContainerMeta,
    objects: IndexMap<ObjectId, StoredObject>,
}

#[derive(Default)]
struct MemoryState {
    containers: IndexMap<BucketId, StoredContainer>,
    failing_heads: HashSet<ObjectId>,
    last_upload_chunks: Vec<usize>,
}

pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    calls: AtomicUsize,
    stalled: AtomicBool,
    chunk_size: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            calls: AtomicUsize::new(0),
            stalled: AtomicBool::new(false),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of backend calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// While stalled, every call hangs until its caller gives up.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// Make head calls for `id` fail with an I/O error.
    pub async fn fail_head(&self, id: ObjectId) {
        self.state.write().await.failing_heads.insert(id);
    }

    /// Sizes of the chunks received by the most recent upload.
    pub async fn last_upload_chunks(&self) -> Vec<usize> {
        self.state.read().await.last_upload_chunks.clone()
    }

    /// Number of objects stored in a bucket, auxiliary ones included.
    pub async fn object_count(&self, bucket: BucketId) -> usize {
        self.state
            .read()
            .await
            .containers
            .get(&bucket)
            .map_or(0, |c| c.objects.len())
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

fn matches(object: &StoredObject, filter: &SearchFilter) -> bool {
    match filter {
        SearchFilter::Root => object.parent.is_none(),
        SearchFilter::AttributeEquals { key, value } => object
            .meta
            .attributes
            .iter()
            .any(|(k, v)| k == key.as_str() && v == value.as_str()),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn head_object(&self, bucket: BucketId, id: ObjectId) -> BackendResult<ObjectMeta> {
        self.enter().await;
        let state = self.state.read().await;
        if state.failing_heads.contains(&id) {
            return Err(BackendError::Io(io::Error::other("injected head failure")));
        }
        state
            .containers
            .get(&bucket)
            .and_then(|c| c.objects.get(&id))
            .map(|o| o.meta.clone())
            .ok_or(BackendError::NotFound)
    }

    async fn get_object_range(
        &self,
        bucket: BucketId,
        id: ObjectId,
        offset: u64,
        length: u64,
    ) -> BackendResult<Bytes> {
        self.enter().await;
        let state = self.state.read().await;
        let object = state
            .containers
            .get(&bucket)
            .and_then(|c| c.objects.get(&id))
            .ok_or(BackendError::NotFound)?;
        let size = object.payload.len() as u64;
        let end = offset.checked_add(length).filter(|end| *end <= size).ok_or(
            BackendError::OutOfRange {
                offset,
                length,
                size,
            },
        )?;
        Ok(object.payload.slice(offset as usize..end as usize))
    }

    async fn put_object(
        &self,
        header: ObjectHeader,
        mut payload: PayloadStream,
    ) -> BackendResult<ObjectId> {
        self.enter().await;
        let mut data = BytesMut::new();
        let mut chunks = Vec::new();
        while let Some(chunk) = payload.next().await {
            let chunk = chunk?;
            chunks.push(chunk.len());
            data.extend_from_slice(&chunk);
        }

        let mut state = self.state.write().await;
        let container = state
            .containers
            .get_mut(&header.bucket)
            .ok_or(BackendError::NotFound)?;
        let id = ObjectId::new();
        let meta = ObjectMeta {
            id,
            bucket: header.bucket,
            owner: header.owner,
            payload_size: data.len() as u64,
            attributes: header.attributes,
        };
        container.objects.insert(
            id,
            StoredObject {
                meta,
                parent: header.parent,
                payload: data.freeze(),
            },
        );
        state.last_upload_chunks = chunks;
        Ok(id)
    }

    async fn delete_object(&self, bucket: BucketId, id: ObjectId) -> BackendResult<()> {
        self.enter().await;
        let mut state = self.state.write().await;
        state
            .containers
            .get_mut(&bucket)
            .and_then(|c| c.objects.shift_remove(&id))
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }

    async fn search_objects(
        &self,
        bucket: BucketId,
        filters: &[SearchFilter],
    ) -> BackendResult<Vec<ObjectId>> {
        self.enter().await;
        let state = self.state.read().await;
        let container = state.containers.get(&bucket).ok_or(BackendError::NotFound)?;
        Ok(container
            .objects
            .values()
            .filter(|o| filters.iter().all(|f| matches(o, f)))
            .map(|o| o.meta.id)
            .collect())
    }

    async fn get_container(&self, id: BucketId) -> BackendResult<ContainerMeta> {
        self.enter().await;
        self.state
            .read()
            .await
            .containers
            .get(&id)
            .map(|c| c.meta.clone())
            .ok_or(BackendError::NotFound)
    }

    async fn list_containers(&self, owner: OwnerId) -> BackendResult<Vec<BucketId>> {
        self.enter().await;
        Ok(self
            .state
            .read()
            .await
            .containers
            .values()
            .filter(|c| c.meta.owner == owner)
            .map(|c| c.meta.id)
            .collect())
    }

    async fn put_container(&self, header: ContainerHeader) -> BackendResult<BucketId> {
        self.enter().await;
        let id = BucketId::new();
        let meta = ContainerMeta {
            id,
            owner: header.owner,
            policy: header.policy,
            acl: header.acl,
            attributes: header.attributes,
        };
        self.state.write().await.containers.insert(
            id,
            StoredContainer {
                meta,
                objects: IndexMap::new(),
            },
        );
        Ok(id)
    }

    async fn delete_container(&self, id: BucketId) -> BackendResult<()> {
        self.enter().await;
        self.state
            .write()
            .await
            .containers
            .shift_remove(&id)
            .map(|_| ())
            .ok_or(BackendError::NotFound)
    }

    fn max_chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Create a bucket named `name` directly in the backend.
#[cfg(test)]
pub(crate) async fn seed_bucket(backend: &MemoryBackend, owner: OwnerId, name: &str) -> BucketId {
    use crate::models::metadata::{ATTR_NAME, ATTR_TIMESTAMP, Attributes, timestamp_now};

    backend
        .put_container(ContainerHeader {
            owner,
            policy: Default::default(),
            acl: Default::default(),
            attributes: Attributes::new()
                .with(ATTR_NAME, name)
                .with(ATTR_TIMESTAMP, timestamp_now()),
        })
        .await
        .unwrap()
}

/// Store a root object named `name` directly in the backend.
#[cfg(test)]
pub(crate) async fn seed_object(
    backend: &MemoryBackend,
    owner: OwnerId,
    bucket: BucketId,
    name: &str,
    data: &'static [u8],
) -> ObjectId {
    use crate::models::metadata::{ATTR_FILE_NAME, Attributes};

    let payload: PayloadStream = futures::stream::iter(vec![Ok(Bytes::from_static(data))]).boxed();
    backend
        .put_object(
            ObjectHeader {
                bucket,
                owner,
                attributes: Attributes::new().with(ATTR_FILE_NAME, name),
                parent: None,
            },
            payload,
        )
        .await
        .unwrap()
}
