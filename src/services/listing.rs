//! Directory enumeration.
//!
//! Every listing is N+1 backend calls: one enumeration, then one metadata
//! fetch per entry, issued sequentially. Entries sharing a display name are
//! collapsed to the first one enumerated. The backend's enumeration order is
//! not creation order, so which duplicate survives is not predictable.

use super::{backend::SearchFilter, context::RequestContext, gateway::Gateway, resolver::FsPath};
use crate::{
    errors::{FsError, FsResult},
    models::{
        bucket::BucketEntry,
        entry::{Entry, FileInfo},
        ids::BucketId,
        object::ObjectEntry,
    },
};
use futures::{Stream, StreamExt, TryStreamExt, stream};
use indexmap::IndexMap;

/// Collapse entries by display name, keeping the first of each and the
/// enumeration order. Stops at the first failed entry.
pub async fn first_seen_by_name<T, S>(entries: S) -> FsResult<Vec<T>>
where
    T: FileInfo,
    S: Stream<Item = FsResult<T>>,
{
    let unique = entries
        .try_fold(IndexMap::new(), |mut seen: IndexMap<String, T>, entry| async move {
            seen.entry(entry.name().to_string()).or_insert(entry);
            Ok(seen)
        })
        .await?;
    Ok(unique.into_values().collect())
}

/// A materialised directory listing, paged out with [`Listing::list_at`].
#[derive(Clone, Debug, Default)]
pub struct Listing(Vec<Entry>);

impl Listing {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self(entries)
    }

    pub fn single(entry: Entry) -> Self {
        Self(vec![entry])
    }

    /// Up to `max` entries starting at `offset`, and whether the end of the
    /// listing was reached.
    pub fn list_at(&self, offset: usize, max: usize) -> (&[Entry], bool) {
        if offset >= self.0.len() {
            return (&[], true);
        }
        let end = offset.saturating_add(max).min(self.0.len());
        let page = &self.0[offset..end];
        (page, page.len() < max)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Gateway {
    /// Every bucket owned by the configured identity, one per display name.
    pub async fn list_buckets(&self, ctx: &RequestContext) -> FsResult<Vec<BucketEntry>> {
        let owner = self.settings.owner;
        let ids = self
            .call(ctx, "list_containers", "/", self.backend.list_containers(owner))
            .await?;
        tracing::debug!(parent: &self.log, count = ids.len(), "listing buckets");

        let entries = stream::iter(ids).then(|id| async move {
            let path = format!("/{id}");
            self.fetch_bucket(ctx, id, &path).await
        });
        first_seen_by_name(entries).await
    }

    /// Every root object in a bucket, one per display name.
    pub async fn list_objects(
        &self,
        ctx: &RequestContext,
        bucket: BucketId,
        path: &str,
    ) -> FsResult<Vec<ObjectEntry>> {
        let ids = self
            .call(
                ctx,
                "search_objects",
                path,
                self.backend.search_objects(bucket, &[SearchFilter::Root]),
            )
            .await?;
        tracing::debug!(parent: &self.log, path, count = ids.len(), "listing objects");

        let entries = stream::iter(ids).then(|id| async move {
            let object_path = format!("{path}/{id}");
            self.fetch_object(ctx, bucket, id, &object_path).await
        });
        first_seen_by_name(entries).await
    }

    /// Contents of a directory path.
    pub async fn list_path(&self, ctx: &RequestContext, path: &FsPath) -> FsResult<Listing> {
        match path {
            FsPath::Root => {
                let buckets = self.list_buckets(ctx).await?;
                Ok(Listing::new(buckets.into_iter().map(Entry::from).collect()))
            }
            FsPath::Bucket(segment) => {
                let bucket = self.resolve_bucket(ctx, segment).await?;
                let Some(id) = bucket.id else {
                    return Err(FsError::NotFound(path.to_string()));
                };
                let objects = self.list_objects(ctx, id, &path.to_string()).await?;
                Ok(Listing::new(objects.into_iter().map(Entry::from).collect()))
            }
            FsPath::Object { .. } => Err(FsError::NotADirectory(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            ids::ObjectId,
            metadata::{ATTR_FILE_NAME, Attributes, ObjectHeader},
        },
        services::{
            backend::{Backend, PayloadStream},
            gateway::GatewaySettings,
            memory_backend::{MemoryBackend, seed_bucket, seed_object},
        },
    };
    use bytes::Bytes;
    use std::sync::Arc;
    use tracing::Span;

    fn gateway(backend: Arc<MemoryBackend>) -> Gateway {
        Gateway::new(backend, GatewaySettings::default(), Span::none())
    }

    #[tokio::test]
    async fn fold_keeps_first_of_each_name() {
        let (first, second) = (ObjectId::new(), ObjectId::new());
        let make = |id, name: &str| ObjectEntry {
            bucket: BucketId::new(),
            id,
            name: name.to_string(),
            file_path: None,
            size: 0,
            created: chrono::Utc::now(),
        };
        let entries = vec![
            Ok(make(first, "a")),
            Ok(make(ObjectId::new(), "b")),
            Ok(make(second, "a")),
        ];
        let unique = first_seen_by_name(stream::iter(entries)).await.unwrap();
        let names: Vec<_> = unique.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(unique[0].id, first);
    }

    #[tokio::test]
    async fn fold_stops_at_first_error() {
        let entries: Vec<FsResult<BucketEntry>> = vec![
            Ok(BucketEntry::root()),
            Err(FsError::NotFound("/x".into())),
        ];
        assert!(first_seen_by_name(stream::iter(entries)).await.is_err());
    }

    #[test]
    fn list_at_pages_and_signals_end() {
        let listing = Listing::new((0..5).map(|_| Entry::from(BucketEntry::root())).collect());
        let (page, eof) = listing.list_at(0, 2);
        assert_eq!((page.len(), eof), (2, false));
        let (page, eof) = listing.list_at(4, 2);
        assert_eq!((page.len(), eof), (1, true));
        let (page, eof) = listing.list_at(5, 2);
        assert_eq!((page.len(), eof), (0, true));
    }

    #[tokio::test]
    async fn empty_bucket_lists_empty() {
        let backend = Arc::new(MemoryBackend::new());
        seed_bucket(&backend, GatewaySettings::default().owner, "b1").await;
        let gw = gateway(backend);

        let listing = gw
            .list_path(&RequestContext::default(), &FsPath::parse("/b1").unwrap())
            .await
            .unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn duplicate_object_names_collapse_to_first() {
        let backend = Arc::new(MemoryBackend::new());
        let owner = GatewaySettings::default().owner;
        let bucket = seed_bucket(&backend, owner, "b1").await;
        let first = seed_object(&backend, owner, bucket, "same.txt", b"one").await;
        seed_object(&backend, owner, bucket, "same.txt", b"second").await;
        seed_object(&backend, owner, bucket, "other.txt", b"").await;
        let gw = gateway(backend);

        let listing = gw
            .list_path(&RequestContext::default(), &FsPath::parse("/b1").unwrap())
            .await
            .unwrap();
        let names: Vec<_> = listing.entries().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["same.txt", "other.txt"]);
        assert_eq!(listing.entries()[0].as_object().map(|o| o.id), Some(first));
    }

    #[tokio::test]
    async fn duplicate_bucket_names_collapse_to_first() {
        let backend = Arc::new(MemoryBackend::new());
        let owner = GatewaySettings::default().owner;
        let first = seed_bucket(&backend, owner, "dup").await;
        seed_bucket(&backend, owner, "dup").await;
        let gw = gateway(backend);

        let buckets = gw.list_buckets(&RequestContext::default()).await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].id, Some(first));
    }

    #[tokio::test]
    async fn auxiliary_objects_are_hidden() {
        let backend = Arc::new(MemoryBackend::new());
        let owner = GatewaySettings::default().owner;
        let bucket = seed_bucket(&backend, owner, "b1").await;
        let parent = seed_object(&backend, owner, bucket, "big.bin", b"payload").await;
        let payload: PayloadStream =
            stream::iter(vec![Ok(Bytes::from_static(b"part"))]).boxed();
        backend
            .put_object(
                ObjectHeader {
                    bucket,
                    owner,
                    attributes: Attributes::new().with(ATTR_FILE_NAME, "big.bin.part"),
                    parent: Some(parent),
                },
                payload,
            )
            .await
            .unwrap();
        let gw = gateway(backend);

        let objects = gw
            .list_objects(&RequestContext::default(), bucket, "/b1")
            .await
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, parent);
    }

    #[tokio::test]
    async fn listing_fails_fast_on_broken_entry() {
        let backend = Arc::new(MemoryBackend::new());
        let owner = GatewaySettings::default().owner;
        let bucket = seed_bucket(&backend, owner, "b1").await;
        seed_object(&backend, owner, bucket, "ok.txt", b"fine").await;
        let broken = seed_object(&backend, owner, bucket, "bad.txt", b"x").await;
        backend.fail_head(broken).await;
        let gw = gateway(backend);

        let err = gw
            .list_path(&RequestContext::default(), &FsPath::parse("/b1").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Backend { op: "head_object", .. }));
    }

    #[tokio::test]
    async fn listing_a_file_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let gw = gateway(backend.clone());
        let err = gw
            .list_path(&RequestContext::default(), &FsPath::parse("/b1/x").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotADirectory(_)));
        assert_eq!(backend.calls(), 0);
    }
}
