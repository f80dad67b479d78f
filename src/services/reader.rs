//! Random-access reads over an immutable object.

use super::{backend::Backend, context::RequestContext};
use crate::{
    errors::{FsError, FsResult},
    models::object::ObjectEntry,
};
use bytes::Bytes;
use futures::{Stream, stream};
use std::sync::Arc;
use tracing::Span;

/// Outcome of one [`ObjectReader::read_at`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadAt {
    /// Bytes copied into the caller's buffer.
    pub n: usize,
    /// The read ended at the last byte of the object. Always set on a short
    /// read.
    pub eof: bool,
}

/// Reads byte ranges of one resolved object.
///
/// There is no cursor: every call names its offset and issues at most one
/// range fetch, so disjoint reads are independent of each other.
pub struct ObjectReader {
    backend: Arc<dyn Backend>,
    file: ObjectEntry,
    path: String,
    log: Span,
}

impl ObjectReader {
    pub fn new(backend: Arc<dyn Backend>, file: ObjectEntry, path: String, log: Span) -> Self {
        Self {
            backend,
            file,
            path,
            log,
        }
    }

    pub fn entry(&self) -> &ObjectEntry {
        &self.file
    }

    pub async fn read_at(
        &self,
        ctx: &RequestContext,
        buf: &mut [u8],
        offset: i64,
    ) -> FsResult<ReadAt> {
        let offset = u64::try_from(offset)
            .map_err(|_| FsError::invalid(self.path.as_str(), "negative read offset"))?;
        if offset >= self.file.size {
            return Ok(ReadAt { n: 0, eof: true });
        }
        if buf.is_empty() {
            return Ok(ReadAt { n: 0, eof: false });
        }

        let length = (buf.len() as u64).min(self.file.size - offset);
        tracing::trace!(parent: &self.log, offset, length, "range read");
        let data = ctx
            .run(
                self.backend
                    .get_object_range(self.file.bucket, self.file.id, offset, length),
            )
            .await
            .map_err(|err| FsError::backend("get_object_range", self.path.as_str(), err))?;

        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(ReadAt {
            n,
            eof: n < buf.len() || offset + n as u64 == self.file.size,
        })
    }

    /// Stream `[offset, offset + limit)` (clamped to the object) as chunks of
    /// at most `chunk` bytes, one range read per chunk.
    pub fn into_stream(
        self,
        ctx: RequestContext,
        offset: u64,
        limit: Option<u64>,
        chunk: usize,
    ) -> impl Stream<Item = FsResult<Bytes>> + Send + 'static {
        let size = self.file.size;
        let end = limit.map_or(size, |limit| offset.saturating_add(limit).min(size));
        let chunk = chunk.max(1) as u64;

        stream::try_unfold((self, ctx, offset), move |(reader, ctx, pos)| async move {
            if pos >= end {
                return Ok::<_, FsError>(None);
            }
            let want = (end - pos).min(chunk) as usize;
            let offset = i64::try_from(pos)
                .map_err(|_| FsError::invalid(reader.path.as_str(), "offset out of range"))?;
            let mut buf = vec![0u8; want];
            let read = reader.read_at(&ctx, &mut buf, offset).await?;
            if read.n == 0 {
                return Ok(None);
            }
            buf.truncate(read.n);
            let next = pos + read.n as u64;
            Ok(Some((Bytes::from(buf), (reader, ctx, next))))
        })
    }

    /// Length of `into_stream(offset, limit)` output.
    pub fn span_len(&self, offset: u64, limit: Option<u64>) -> u64 {
        let size = self.file.size;
        let end = limit.map_or(size, |limit| offset.saturating_add(limit).min(size));
        end.saturating_sub(offset)
    }
}
