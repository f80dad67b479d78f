//! Buffered writes onto a write-once object store.
//!
//! Writes land in an anonymous staging file at any offset, so clients may
//! send blocks out of order or retry one. Nothing reaches the backend until
//! [`ObjectWriter::close`], which uploads the staged bytes as one new object.
//! A writer dropped without closing leaves nothing behind: the staging file
//! is unlinked from the start and vanishes with its handle.

use super::{
    backend::{Backend, PayloadStream},
    context::RequestContext,
};
use crate::{
    errors::{FsError, FsResult},
    models::{
        ids::{ObjectId, OwnerId},
        metadata::{ATTR_FILE_NAME, ATTR_TIMESTAMP, Attributes, ObjectHeader, timestamp_now},
        object::PendingObject,
    },
};
use bytes::Bytes;
use futures::{StreamExt, stream};
use std::{io::SeekFrom, path::Path, sync::Arc};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::Span;

pub struct ObjectWriter {
    backend: Arc<dyn Backend>,
    target: PendingObject,
    owner: OwnerId,
    path: String,
    staging: File,
    len: u64,
    log: Span,
}

impl ObjectWriter {
    /// Open a staging file for `target`, in `staging_dir` or the system temp
    /// dir.
    pub fn new(
        backend: Arc<dyn Backend>,
        target: PendingObject,
        owner: OwnerId,
        path: String,
        staging_dir: Option<&Path>,
        log: Span,
    ) -> FsResult<Self> {
        let staged = match staging_dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
        .map_err(|source| FsError::Staging {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            backend,
            target,
            owner,
            path,
            staging: File::from_std(staged),
            len: 0,
            log,
        })
    }

    pub fn target(&self) -> &PendingObject {
        &self.target
    }

    /// Bytes staged so far: the end of the furthest write.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stage `data` at `offset`. Gaps left by skipped ranges read as zeros.
    pub async fn write_at(&mut self, data: &[u8], offset: i64) -> FsResult<usize> {
        let offset = u64::try_from(offset)
            .map_err(|_| FsError::invalid(self.path.as_str(), "negative write offset"))?;
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| FsError::invalid(self.path.as_str(), "write past maximum size"))?;

        self.stage(offset, data).await.map_err(|source| FsError::Staging {
            path: self.path.clone(),
            source,
        })?;
        self.len = self.len.max(end);
        Ok(data.len())
    }

    async fn stage(&mut self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        self.staging.seek(SeekFrom::Start(offset)).await?;
        self.staging.write_all(data).await
    }

    /// Upload everything staged as a single new object.
    ///
    /// The staging file is released whether or not the upload succeeds.
    pub async fn close(self, ctx: &RequestContext) -> FsResult<ObjectId> {
        let Self {
            backend,
            target,
            owner,
            path,
            mut staging,
            len,
            log,
        } = self;

        let rewound = async {
            staging.flush().await?;
            staging.seek(SeekFrom::Start(0)).await
        }
        .await;
        if let Err(source) = rewound {
            return Err(FsError::Staging { path, source });
        }

        let attributes = Attributes::new()
            .with(ATTR_FILE_NAME, target.name.as_str())
            .with(ATTR_TIMESTAMP, timestamp_now());
        let header = ObjectHeader {
            bucket: target.bucket,
            owner,
            attributes,
            parent: None,
        };
        let chunk = backend.max_chunk_size().max(1) as u64;
        let payload = staged_chunks(staging, len, chunk);

        tracing::debug!(parent: &log, bucket = %target.bucket, name = %target.name, size = len, "uploading object");
        let id = ctx
            .run(backend.put_object(header, payload))
            .await
            .map_err(|err| FsError::backend("put_object", path.as_str(), err))?;
        tracing::info!(parent: &log, bucket = %target.bucket, name = %target.name, object = %id, size = len, "object stored");
        Ok(id)
    }
}

/// Read `len` staged bytes back as chunks of exactly `chunk` bytes (the last
/// one shorter). The file is dropped with the stream.
fn staged_chunks(file: File, len: u64, chunk: u64) -> PayloadStream {
    stream::try_unfold((file, len), move |(mut file, remaining)| async move {
        if remaining == 0 {
            return Ok::<_, std::io::Error>(None);
        }
        let want = remaining.min(chunk) as usize;
        let mut buf = vec![0u8; want];
        file.read_exact(&mut buf).await?;
        Ok(Some((Bytes::from(buf), (file, remaining - want as u64))))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{ids::BucketId, object::ObjectEntry},
        services::memory_backend::{MemoryBackend, seed_bucket},
    };

    const CONTENT: &[u8] = b"content for write test";

    async fn writer(chunk: usize) -> (Arc<MemoryBackend>, BucketId, ObjectWriter) {
        let backend = Arc::new(MemoryBackend::with_chunk_size(chunk));
        let owner = OwnerId::new();
        let bucket = seed_bucket(&backend, owner, "b1").await;
        let target = PendingObject {
            bucket,
            name: "write-test-object".into(),
        };
        let writer = ObjectWriter::new(
            backend.clone(),
            target,
            owner,
            "/b1/write-test-object".into(),
            None,
            Span::none(),
        )
        .unwrap();
        (backend, bucket, writer)
    }

    async fn stored(backend: &MemoryBackend, bucket: BucketId, id: ObjectId) -> (ObjectEntry, Vec<u8>) {
        let meta = backend.head_object(bucket, id).await.unwrap();
        let data = backend
            .get_object_range(bucket, id, 0, meta.payload_size)
            .await
            .unwrap();
        (ObjectEntry::from_meta(&meta), data.to_vec())
    }

    #[tokio::test]
    async fn sequential_writes_upload_on_close() {
        let (backend, bucket, mut writer) = writer(1024).await;
        assert!(writer.write_at(b"x", -1).await.is_err());

        let half = CONTENT.len() / 2;
        let n = writer.write_at(&CONTENT[..half], 0).await.unwrap();
        writer.write_at(&CONTENT[n..], n as i64).await.unwrap();
        assert_eq!(backend.object_count(bucket).await, 0);

        let id = writer.close(&RequestContext::default()).await.unwrap();
        let (entry, data) = stored(&backend, bucket, id).await;
        assert_eq!(data, CONTENT);
        assert_eq!(entry.name, "write-test-object");
        assert_eq!(entry.size, CONTENT.len() as u64);
    }

    #[tokio::test]
    async fn out_of_order_and_retried_writes() {
        let (backend, bucket, mut writer) = writer(1024).await;
        writer.write_at(b"world", 6).await.unwrap();
        writer.write_at(b"HELLO ", 0).await.unwrap();
        writer.write_at(b"hello ", 0).await.unwrap();
        assert_eq!(writer.len(), 11);

        let id = writer.close(&RequestContext::default()).await.unwrap();
        assert_eq!(stored(&backend, bucket, id).await.1, b"hello world");
    }

    #[tokio::test]
    async fn gaps_read_back_as_zeros() {
        let (backend, bucket, mut writer) = writer(1024).await;
        writer.write_at(b"end", 5).await.unwrap();
        let id = writer.close(&RequestContext::default()).await.unwrap();
        assert_eq!(stored(&backend, bucket, id).await.1, b"\0\0\0\0\0end");
    }

    #[tokio::test]
    async fn upload_is_split_into_backend_chunks() {
        let (backend, bucket, mut writer) = writer(8).await;
        writer.write_at(CONTENT, 0).await.unwrap();
        let id = writer.close(&RequestContext::default()).await.unwrap();

        assert_eq!(backend.last_upload_chunks().await, vec![8, 8, 6]);
        assert_eq!(stored(&backend, bucket, id).await.1, CONTENT);
    }

    #[tokio::test]
    async fn empty_object_is_stored() {
        let (backend, bucket, writer) = writer(8).await;
        assert!(writer.is_empty());
        let id = writer.close(&RequestContext::default()).await.unwrap();
        let (entry, data) = stored(&backend, bucket, id).await;
        assert_eq!(entry.size, 0);
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn dropped_writer_leaves_no_object() {
        let (backend, bucket, mut writer) = writer(8).await;
        writer.write_at(CONTENT, 0).await.unwrap();
        drop(writer);
        assert_eq!(backend.object_count(bucket).await, 0);
    }

    #[tokio::test]
    async fn upload_into_missing_bucket_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let target = PendingObject {
            bucket: BucketId::new(),
            name: "orphan".into(),
        };
        let writer = ObjectWriter::new(
            backend,
            target,
            OwnerId::new(),
            "/gone/orphan".into(),
            None,
            Span::none(),
        )
        .unwrap();
        let err = writer.close(&RequestContext::default()).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }
}
