//! src/services/storage_service.rs
//!
//! StorageService: a durable [`Backend`] keeping container and object metadata
//! in SQLite and payloads on local disk, sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{object}`.

use super::backend::{
    Backend, BackendError, BackendResult, DEFAULT_MAX_CHUNK_SIZE, PayloadStream, SearchFilter,
};
use crate::models::{
    ids::{BucketId, ObjectId, OwnerId},
    metadata::{
        Attributes, BasicAcl, ContainerHeader, ContainerMeta, ObjectHeader, ObjectMeta,
        PlacementPolicy,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use md5::Context;
use sqlx::{FromRow, QueryBuilder, SqlitePool, sqlite::Sqlite};
use tempfile::TempPath;
use std::{
    io::{self, ErrorKind, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::Span;
use uuid::Uuid;

/// Schema applied by [`StorageService::migrate`].
const MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

#[derive(FromRow)]
struct ContainerRow {
    id: Uuid,
    owner_id: Uuid,
    policy: String,
    basic_acl: String,
    attributes: String,
}

impl TryFrom<ContainerRow> for ContainerMeta {
    type Error = BackendError;

    fn try_from(row: ContainerRow) -> BackendResult<Self> {
        let acl = BasicAcl::parse(&row.basic_acl)
            .ok_or_else(|| BackendError::Corrupt(format!("unknown basic ACL `{}`", row.basic_acl)))?;
        Ok(ContainerMeta {
            id: BucketId::from_uuid(row.id),
            owner: OwnerId::from_uuid(row.owner_id),
            policy: PlacementPolicy(row.policy),
            acl,
            attributes: parse_attributes(&row.attributes)?,
        })
    }
}

#[derive(FromRow)]
struct ObjectRow {
    id: Uuid,
    container_id: Uuid,
    owner_id: Uuid,
    payload_size: i64,
    attributes: String,
}

impl TryFrom<ObjectRow> for ObjectMeta {
    type Error = BackendError;

    fn try_from(row: ObjectRow) -> BackendResult<Self> {
        let payload_size = u64::try_from(row.payload_size)
            .map_err(|_| BackendError::Corrupt(format!("negative size for object {}", row.id)))?;
        Ok(ObjectMeta {
            id: ObjectId::from_uuid(row.id),
            bucket: BucketId::from_uuid(row.container_id),
            owner: OwnerId::from_uuid(row.owner_id),
            payload_size,
            attributes: parse_attributes(&row.attributes)?,
        })
    }
}

fn parse_attributes(raw: &str) -> BackendResult<Attributes> {
    serde_json::from_str(raw).map_err(|err| BackendError::Corrupt(format!("attributes: {err}")))
}

fn encode_attributes(attributes: &Attributes) -> BackendResult<String> {
    serde_json::to_string(attributes).map_err(|err| BackendError::Corrupt(format!("attributes: {err}")))
}

/// SQLite + local disk backend.
///
/// Enumeration order is insertion order (`seq`), so listings are stable
/// across calls.
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    max_chunk_size: usize,
    log: Span,
}

impl StorageService {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>, log: Span) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            log,
        }
    }

    /// Upper bound on upload chunks announced to writers.
    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.max_chunk_size = size.max(1);
        self
    }

    /// Apply the embedded schema. Idempotent. Returns the number of
    /// statements executed.
    pub async fn migrate(&self) -> BackendResult<usize> {
        let statements = migration_statements(MIGRATION);

        tracing::info!(parent: &self.log, count = statements.len(), "running migration statements");
        for stmt in &statements {
            tracing::debug!(parent: &self.log, sql = stmt.as_str(), "executing migration SQL");
            sqlx::query(stmt.as_str()).execute(&*self.db).await?;
        }
        Ok(statements.len())
    }

    fn bucket_root(&self, bucket: BucketId) -> PathBuf {
        self.base_path.join(bucket.to_string())
    }

    /// Two-level shard directories from MD5(bucket/object), as lowercase hex
    /// bytes (00–ff).
    fn object_shards(bucket: BucketId, id: ObjectId) -> (String, String) {
        let digest = md5::compute(format!("{bucket}/{id}"));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, bucket: BucketId, id: ObjectId) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket, id);
        let mut path = self.bucket_root(bucket);
        path.push(shard_a);
        path.push(shard_b);
        path.push(id.to_string());
        path
    }

    async fn ensure_container(&self, bucket: BucketId) -> BackendResult<()> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM containers WHERE id = ?")
            .bind(bucket.as_uuid())
            .fetch_optional(&*self.db)
            .await?;
        found.map(|_| ()).ok_or(BackendError::NotFound)
    }

    /// Recursively remove empty directories up to `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    tracing::debug!(parent: &self.log, dir = %current.display(), error = %err, "failed to prune directory");
                    break;
                }
            }
        }
    }
}

/// Split a schema script into statements. `--` comment lines are dropped
/// first so a `;` inside a comment cannot cut a statement in two.
fn migration_statements(sql: &str) -> Vec<String> {
    let code = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    code.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drain `payload` into a fresh file, returning its size and MD5.
async fn write_payload(path: &Path, payload: &mut PayloadStream) -> io::Result<(u64, String)> {
    let mut file = File::create(path).await?;
    let mut size = 0u64;
    let mut digest = Context::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        size += chunk.len() as u64;
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok((size, format!("{:x}", digest.compute())))
}

#[async_trait]
impl Backend for StorageService {
    async fn head_object(&self, bucket: BucketId, id: ObjectId) -> BackendResult<ObjectMeta> {
        sqlx::query_as::<_, ObjectRow>(
            "SELECT id, container_id, owner_id, payload_size, attributes
             FROM objects WHERE container_id = ? AND id = ?",
        )
        .bind(bucket.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&*self.db)
        .await?
        .ok_or(BackendError::NotFound)?
        .try_into()
    }

    async fn get_object_range(
        &self,
        bucket: BucketId,
        id: ObjectId,
        offset: u64,
        length: u64,
    ) -> BackendResult<Bytes> {
        let size: i64 = sqlx::query_scalar(
            "SELECT payload_size FROM objects WHERE container_id = ? AND id = ?",
        )
        .bind(bucket.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&*self.db)
        .await?
        .ok_or(BackendError::NotFound)?;
        let size = size.max(0) as u64;
        offset
            .checked_add(length)
            .filter(|end| *end <= size)
            .ok_or(BackendError::OutOfRange {
                offset,
                length,
                size,
            })?;
        if length == 0 {
            return Ok(Bytes::new());
        }

        let file_path = self.object_path(bucket, id);
        let mut file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                BackendError::Corrupt(format!("payload of object {id} is missing"))
            } else {
                BackendError::Io(err)
            }
        })?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    /// Stream the payload into a temporary file beside its final location,
    /// rename it into place, then record the metadata row.
    ///
    /// Both paths are held by [`TempPath`] guards until the row exists, so an
    /// error or a dropped future (cancellation, timeout) removes the payload.
    async fn put_object(
        &self,
        header: ObjectHeader,
        mut payload: PayloadStream,
    ) -> BackendResult<ObjectId> {
        self.ensure_container(header.bucket).await?;

        let id = ObjectId::new();
        let file_path = self.object_path(header.bucket, id);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            BackendError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;

        let staged = TempPath::from_path(parent.join(format!(".tmp-{id}")));
        let (size, checksum) = write_payload(&staged, &mut payload).await?;
        staged
            .persist(&file_path)
            .map_err(|err| BackendError::Io(err.error))?;
        let stored = TempPath::from_path(&file_path);

        sqlx::query(
            "INSERT INTO objects (
                id, container_id, owner_id, parent_id, payload_size,
                checksum, attributes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_uuid())
        .bind(header.bucket.as_uuid())
        .bind(header.owner.as_uuid())
        .bind(header.parent.map(|p| p.as_uuid()))
        .bind(size as i64)
        .bind(&checksum)
        .bind(encode_attributes(&header.attributes)?)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        stored.keep().map_err(|err| BackendError::Io(err.error))?;
        tracing::debug!(parent: &self.log, bucket = %header.bucket, object = %id, size, checksum, "payload stored");
        Ok(id)
    }

    async fn delete_object(&self, bucket: BucketId, id: ObjectId) -> BackendResult<()> {
        let result = sqlx::query("DELETE FROM objects WHERE container_id = ? AND id = ?")
            .bind(bucket.as_uuid())
            .bind(id.as_uuid())
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound);
        }

        let file_path = self.object_path(bucket, id);
        match fs::remove_file(&file_path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(BackendError::Io(err)),
        }
        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.bucket_root(bucket)).await;
        }
        Ok(())
    }

    async fn search_objects(
        &self,
        bucket: BucketId,
        filters: &[SearchFilter],
    ) -> BackendResult<Vec<ObjectId>> {
        self.ensure_container(bucket).await?;

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM objects WHERE container_id = ");
        query.push_bind(bucket.as_uuid());
        for filter in filters {
            match filter {
                SearchFilter::Root => {
                    query.push(" AND parent_id IS NULL");
                }
                SearchFilter::AttributeEquals { key, value } => {
                    query.push(
                        " AND EXISTS (SELECT 1 FROM json_each(objects.attributes) AS attr \
                         WHERE json_extract(attr.value, '$[0]') = ",
                    );
                    query.push_bind(key.clone());
                    query.push(" AND json_extract(attr.value, '$[1]') = ");
                    query.push_bind(value.clone());
                    query.push(")");
                }
            }
        }
        query.push(" ORDER BY seq");

        let ids: Vec<Uuid> = query
            .build_query_scalar()
            .fetch_all(&*self.db)
            .await?;
        Ok(ids.into_iter().map(ObjectId::from_uuid).collect())
    }

    async fn get_container(&self, id: BucketId) -> BackendResult<ContainerMeta> {
        sqlx::query_as::<_, ContainerRow>(
            "SELECT id, owner_id, policy, basic_acl, attributes FROM containers WHERE id = ?",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.db)
        .await?
        .ok_or(BackendError::NotFound)?
        .try_into()
    }

    async fn list_containers(&self, owner: OwnerId) -> BackendResult<Vec<BucketId>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM containers WHERE owner_id = ? ORDER BY seq")
                .bind(owner.as_uuid())
                .fetch_all(&*self.db)
                .await?;
        Ok(ids.into_iter().map(BucketId::from_uuid).collect())
    }

    async fn put_container(&self, header: ContainerHeader) -> BackendResult<BucketId> {
        let id = BucketId::new();
        fs::create_dir_all(self.bucket_root(id)).await?;

        sqlx::query(
            "INSERT INTO containers (id, owner_id, policy, basic_acl, attributes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_uuid())
        .bind(header.owner.as_uuid())
        .bind(&header.policy.0)
        .bind(header.acl.as_str())
        .bind(encode_attributes(&header.attributes)?)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        tracing::debug!(parent: &self.log, bucket = %id, policy = %header.policy.0, "container stored");
        Ok(id)
    }

    /// Delete the container row together with its objects, then the payload
    /// directory.
    async fn delete_container(&self, id: BucketId) -> BackendResult<()> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM objects WHERE container_id = ?")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM containers WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound);
        }
        tx.commit().await?;

        let bucket_path = self.bucket_root(id);
        if let Err(err) = fs::remove_dir_all(&bucket_path).await {
            if err.kind() != ErrorKind::NotFound {
                tracing::debug!(parent: &self.log, dir = %bucket_path.display(), error = %err, "failed to remove bucket directory after delete");
            }
        }
        Ok(())
    }

    fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::metadata::{ATTR_FILE_NAME, ATTR_NAME},
        services::context::RequestContext,
    };
    use futures::stream;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    async fn service() -> (TempDir, StorageService) {
        let dir = TempDir::new().unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let service = StorageService::new(Arc::new(pool), dir.path(), Span::none());
        service.migrate().await.unwrap();
        (dir, service)
    }

    fn payload(chunks: &[&'static [u8]]) -> PayloadStream {
        let items: Vec<io::Result<Bytes>> = chunks
            .iter()
            .copied()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        stream::iter(items).boxed()
    }

    async fn container(service: &StorageService, owner: OwnerId, name: &str) -> BucketId {
        service
            .put_container(ContainerHeader {
                owner,
                policy: PlacementPolicy::default(),
                acl: BasicAcl::PublicRead,
                attributes: Attributes::new().with(ATTR_NAME, name),
            })
            .await
            .unwrap()
    }

    async fn object(
        service: &StorageService,
        owner: OwnerId,
        bucket: BucketId,
        name: &str,
        parent: Option<ObjectId>,
        chunks: &[&'static [u8]],
    ) -> ObjectId {
        service
            .put_object(
                ObjectHeader {
                    bucket,
                    owner,
                    attributes: Attributes::new().with(ATTR_FILE_NAME, name),
                    parent,
                },
                payload(chunks),
            )
            .await
            .unwrap()
    }

    /// Every regular file below `dir`, recursively.
    fn files_under(dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .flat_map(|entry| {
                let path = entry.path();
                if path.is_dir() {
                    files_under(&path)
                } else {
                    vec![path]
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn migration_is_idempotent() {
        let (_dir, service) = service().await;
        assert!(service.migrate().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn migration_creates_both_tables() {
        let (_dir, service) = service().await;
        let mut tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('containers', 'objects')",
        )
        .fetch_all(&*service.db)
        .await
        .unwrap();
        tables.sort();
        assert_eq!(tables, ["containers", "objects"]);
    }

    #[test]
    fn semicolons_in_comments_do_not_split_statements() {
        let sql = "-- first; still a comment\nCREATE TABLE a (x INTEGER);\n\n  -- b; c\nCREATE TABLE b (y TEXT);\n";
        assert_eq!(
            migration_statements(sql),
            ["CREATE TABLE a (x INTEGER)", "CREATE TABLE b (y TEXT)"]
        );
        assert_eq!(migration_statements(MIGRATION).len(), 4);
    }

    #[tokio::test]
    async fn abandoned_upload_leaves_no_payload() {
        let (dir, service) = service().await;
        let owner = OwnerId::new();
        let bucket = container(&service, owner, "b").await;
        let stalled: PayloadStream = stream::iter(vec![Ok(Bytes::from_static(b"first chunk"))])
            .chain(stream::pending())
            .boxed();
        let header = ObjectHeader {
            bucket,
            owner,
            attributes: Attributes::new().with(ATTR_FILE_NAME, "stalled.bin"),
            parent: None,
        };

        let ctx = RequestContext::new(CancellationToken::new(), Duration::from_millis(200));
        let res = ctx.run(service.put_object(header, stalled)).await;
        assert!(matches!(res, Err(BackendError::Timeout(_))));

        let leftovers = files_under(&dir.path().join(bucket.to_string()));
        assert!(leftovers.is_empty(), "{leftovers:?}");
        assert!(service.search_objects(bucket, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn container_metadata_round_trips() {
        let (_dir, service) = service().await;
        let owner = OwnerId::new();
        let id = container(&service, owner, "photos").await;

        let meta = service.get_container(id).await.unwrap();
        assert_eq!(meta.owner, owner);
        assert_eq!(meta.acl, BasicAcl::PublicRead);
        assert_eq!(meta.policy, PlacementPolicy::default());
        assert_eq!(meta.attributes.get(ATTR_NAME), Some("photos"));
        assert!(service.bucket_root(id).is_dir());
    }

    #[tokio::test]
    async fn containers_are_listed_per_owner_in_creation_order() {
        let (_dir, service) = service().await;
        let owner = OwnerId::new();
        let a = container(&service, owner, "a").await;
        container(&service, OwnerId::new(), "other").await;
        let b = container(&service, owner, "b").await;

        assert_eq!(service.list_containers(owner).await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn chunked_upload_reads_back_by_range() {
        let (_dir, service) = service().await;
        let owner = OwnerId::new();
        let bucket = container(&service, owner, "b").await;
        let id = object(&service, owner, bucket, "f.txt", None, &[b"hello ", b"world"]).await;

        let meta = service.head_object(bucket, id).await.unwrap();
        assert_eq!(meta.payload_size, 11);
        assert_eq!(meta.attributes.get(ATTR_FILE_NAME), Some("f.txt"));

        let all = service.get_object_range(bucket, id, 0, 11).await.unwrap();
        assert_eq!(&all[..], b"hello world");
        let middle = service.get_object_range(bucket, id, 4, 3).await.unwrap();
        assert_eq!(&middle[..], b"o w");
        assert!(matches!(
            service.get_object_range(bucket, id, 8, 4).await,
            Err(BackendError::OutOfRange { size: 11, .. })
        ));

        let checksum: String = sqlx::query_scalar("SELECT checksum FROM objects WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_one(&*service.db)
            .await
            .unwrap();
        assert_eq!(checksum, format!("{:x}", md5::compute(b"hello world")));
    }

    #[tokio::test]
    async fn empty_payload_is_stored() {
        let (_dir, service) = service().await;
        let owner = OwnerId::new();
        let bucket = container(&service, owner, "b").await;
        let id = object(&service, owner, bucket, "empty", None, &[]).await;

        assert_eq!(service.head_object(bucket, id).await.unwrap().payload_size, 0);
        assert!(service.get_object_range(bucket, id, 0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_into_missing_container_fails() {
        let (_dir, service) = service().await;
        let res = service
            .put_object(
                ObjectHeader {
                    bucket: BucketId::new(),
                    owner: OwnerId::new(),
                    attributes: Attributes::new(),
                    parent: None,
                },
                payload(&[b"x"]),
            )
            .await;
        assert!(matches!(res, Err(BackendError::NotFound)));
    }

    #[tokio::test]
    async fn search_applies_root_and_attribute_filters() {
        let (_dir, service) = service().await;
        let owner = OwnerId::new();
        let bucket = container(&service, owner, "b").await;
        let a = object(&service, owner, bucket, "a", None, &[b"1"]).await;
        let b = object(&service, owner, bucket, "b", None, &[b"2"]).await;
        let link = object(&service, owner, bucket, "b", Some(b), &[b"3"]).await;

        let all = service.search_objects(bucket, &[]).await.unwrap();
        assert_eq!(all, vec![a, b, link]);

        let roots = service
            .search_objects(bucket, &[SearchFilter::Root])
            .await
            .unwrap();
        assert_eq!(roots, vec![a, b]);

        let named = service
            .search_objects(
                bucket,
                &[SearchFilter::Root, SearchFilter::attribute(ATTR_FILE_NAME, "b")],
            )
            .await
            .unwrap();
        assert_eq!(named, vec![b]);

        assert!(matches!(
            service.search_objects(BucketId::new(), &[]).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_object_removes_payload_and_prunes() {
        let (_dir, service) = service().await;
        let owner = OwnerId::new();
        let bucket = container(&service, owner, "b").await;
        let id = object(&service, owner, bucket, "f", None, &[b"data"]).await;
        let path = service.object_path(bucket, id);
        assert!(path.is_file());

        service.delete_object(bucket, id).await.unwrap();
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
        assert!(service.bucket_root(bucket).is_dir());
        assert!(matches!(
            service.delete_object(bucket, id).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_container_drops_objects_and_directory() {
        let (_dir, service) = service().await;
        let owner = OwnerId::new();
        let bucket = container(&service, owner, "b").await;
        let id = object(&service, owner, bucket, "f", None, &[b"data"]).await;

        service.delete_container(bucket).await.unwrap();
        assert!(!service.bucket_root(bucket).exists());
        assert!(matches!(
            service.head_object(bucket, id).await,
            Err(BackendError::NotFound)
        ));
        assert!(matches!(
            service.delete_container(bucket).await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn configured_chunk_size_is_reported() {
        let (_dir, service) = service().await;
        assert_eq!(service.max_chunk_size(), DEFAULT_MAX_CHUNK_SIZE);
        assert_eq!(service.with_max_chunk_size(0).max_chunk_size(), 1);
    }
}
