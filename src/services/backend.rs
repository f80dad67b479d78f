//! The storage backend seam.
//!
//! The gateway only ever talks to storage through [`Backend`]. Connection
//! pooling, retries and consistency are the implementation's business.

use crate::models::{
    ids::{BucketId, ObjectId, OwnerId},
    metadata::{ContainerHeader, ContainerMeta, ObjectHeader, ObjectMeta},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::{io, time::Duration};
use thiserror::Error;

/// Payload handed to [`Backend::put_object`], already split into chunks no
/// larger than [`Backend::max_chunk_size`].
pub type PayloadStream = BoxStream<'static, io::Result<Bytes>>;

/// Default upper bound for a single upload chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not found")]
    NotFound,
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("range {offset}+{length} outside payload of {size} bytes")]
    OutOfRange { offset: u64, length: u64, size: u64 },
    #[error("corrupt metadata: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Predicate for [`Backend::search_objects`]. All filters must match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchFilter {
    /// Only top-level objects; auxiliary objects with a parent are skipped.
    Root,
    AttributeEquals { key: String, value: String },
}

impl SearchFilter {
    pub fn attribute(key: impl Into<String>, value: impl Into<String>) -> Self {
        SearchFilter::AttributeEquals {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn head_object(&self, bucket: BucketId, id: ObjectId) -> BackendResult<ObjectMeta>;

    /// Fetch exactly `[offset, offset + length)` of the payload.
    async fn get_object_range(
        &self,
        bucket: BucketId,
        id: ObjectId,
        offset: u64,
        length: u64,
    ) -> BackendResult<Bytes>;

    /// Store a whole new object. The backend assigns the identifier.
    async fn put_object(
        &self,
        header: ObjectHeader,
        payload: PayloadStream,
    ) -> BackendResult<ObjectId>;

    async fn delete_object(&self, bucket: BucketId, id: ObjectId) -> BackendResult<()>;

    /// Identifiers of matching objects, in the backend's enumeration order.
    async fn search_objects(
        &self,
        bucket: BucketId,
        filters: &[SearchFilter],
    ) -> BackendResult<Vec<ObjectId>>;

    async fn get_container(&self, id: BucketId) -> BackendResult<ContainerMeta>;

    async fn list_containers(&self, owner: OwnerId) -> BackendResult<Vec<BucketId>>;

    async fn put_container(&self, header: ContainerHeader) -> BackendResult<BucketId>;

    async fn delete_container(&self, id: BucketId) -> BackendResult<()>;

    fn max_chunk_size(&self) -> usize {
        DEFAULT_MAX_CHUNK_SIZE
    }
}
