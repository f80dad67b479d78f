//! Path parsing and name/identifier resolution.
//!
//! Paths have at most two levels: `/<bucket>/<object>`. Each segment is either
//! an identifier (looked up directly) or a display name (found by listing or
//! searching, which costs a full enumeration).

use super::{backend::SearchFilter, context::RequestContext, gateway::Gateway};
use crate::{
    errors::{FsError, FsResult},
    models::{
        bucket::BucketEntry,
        entry::Entry,
        ids::{BucketId, ObjectId},
        metadata::ATTR_FILE_NAME,
        object::ObjectEntry,
    },
};
use std::fmt;

pub const DELIMITER: char = '/';

/// Bucket plus object: the only nesting there is.
const MAX_DEPTH: usize = 2;

/// A validated gateway path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsPath {
    Root,
    Bucket(String),
    Object { bucket: String, object: String },
}

impl FsPath {
    /// Classify a slash-delimited path.
    ///
    /// One leading and one trailing delimiter are ignored. More than two
    /// non-empty segments is unsupported; an empty segment in between is
    /// invalid.
    pub fn parse(raw: &str) -> FsResult<Self> {
        let trimmed = raw.strip_prefix(DELIMITER).unwrap_or(raw);
        let trimmed = trimmed.strip_suffix(DELIMITER).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(FsPath::Root);
        }

        let segments: Vec<&str> = trimmed.split(DELIMITER).collect();
        let depth = segments.iter().filter(|s| !s.is_empty()).count();
        if depth > MAX_DEPTH {
            return Err(FsError::unsupported(
                raw,
                "only one level of directories is supported",
            ));
        }

        match segments.as_slice() {
            [bucket] if !bucket.is_empty() => Ok(FsPath::Bucket(bucket.to_string())),
            [bucket, object] if !bucket.is_empty() && !object.is_empty() => Ok(FsPath::Object {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            _ => Err(FsError::invalid(raw, "empty path segment")),
        }
    }

    pub fn bucket(&self) -> Option<&str> {
        match self {
            FsPath::Root => None,
            FsPath::Bucket(bucket) | FsPath::Object { bucket, .. } => Some(bucket),
        }
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsPath::Root => write!(f, "{DELIMITER}"),
            FsPath::Bucket(bucket) => write!(f, "{DELIMITER}{bucket}"),
            FsPath::Object { bucket, object } => {
                write!(f, "{DELIMITER}{bucket}{DELIMITER}{object}")
            }
        }
    }
}

impl Gateway {
    /// Fetch a bucket by identifier.
    pub(crate) async fn fetch_bucket(
        &self,
        ctx: &RequestContext,
        id: BucketId,
        path: &str,
    ) -> FsResult<BucketEntry> {
        let meta = self
            .call(ctx, "get_container", path, self.backend.get_container(id))
            .await?;
        Ok(BucketEntry::from_meta(&meta))
    }

    /// Fetch object metadata by identifier.
    pub(crate) async fn fetch_object(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        id: ObjectId,
        path: &str,
    ) -> FsResult<ObjectEntry> {
        let meta = self
            .call(ctx, "head_object", path, self.backend.head_object(bucket, id))
            .await?;
        Ok(ObjectEntry::from_meta(&meta))
    }

    /// Resolve a bucket segment: identifier first, then display name among
    /// the owner's (deduplicated) buckets.
    pub async fn resolve_bucket(&self, ctx: &RequestContext, segment: &str) -> FsResult<BucketEntry> {
        let path = format!("{DELIMITER}{segment}");
        if let Ok(id) = segment.parse::<BucketId>() {
            return self.fetch_bucket(ctx, id, &path).await;
        }

        tracing::trace!(parent: &self.log, name = segment, "resolving bucket by name");
        self.list_buckets(ctx)
            .await?
            .into_iter()
            .find(|bucket| bucket.name == segment)
            .ok_or(FsError::NotFound(path))
    }

    /// First root object in `bucket` whose display name is `name`.
    pub async fn find_object_by_name(
        &self,
        ctx: &RequestContext,
        bucket: &BucketEntry,
        name: &str,
        path: &str,
    ) -> FsResult<Option<ObjectEntry>> {
        let Some(bucket_id) = bucket.id else {
            return Ok(None);
        };
        let filters = [
            SearchFilter::Root,
            SearchFilter::attribute(ATTR_FILE_NAME, name),
        ];
        let ids = self
            .call(
                ctx,
                "search_objects",
                path,
                self.backend.search_objects(bucket_id, &filters),
            )
            .await?;

        match ids.first() {
            Some(id) => self.fetch_object(ctx, bucket_id, *id, path).await.map(Some),
            None => Ok(None),
        }
    }

    /// Resolve an object segment for stat and read: identifier first, then
    /// display-name search.
    pub async fn resolve_object(
        &self,
        ctx: &RequestContext,
        bucket: &BucketEntry,
        segment: &str,
        path: &str,
    ) -> FsResult<ObjectEntry> {
        let Some(bucket_id) = bucket.id else {
            return Err(FsError::NotFound(path.to_string()));
        };
        if let Ok(id) = segment.parse::<ObjectId>() {
            return self.fetch_object(ctx, bucket_id, id, path).await;
        }

        self.find_object_by_name(ctx, bucket, segment, path)
            .await?
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// The single entry a path names.
    pub async fn stat(&self, ctx: &RequestContext, path: &FsPath) -> FsResult<Entry> {
        match path {
            FsPath::Root => Ok(BucketEntry::root().into()),
            FsPath::Bucket(bucket) => Ok(self.resolve_bucket(ctx, bucket).await?.into()),
            FsPath::Object { bucket, object } => {
                let bucket = self.resolve_bucket(ctx, bucket).await?;
                let object = self
                    .resolve_object(ctx, &bucket, object, &path.to_string())
                    .await?;
                Ok(object.into())
            }
        }
    }
}
