//! Request dispatch: protocol methods onto gateway operations.
//!
//! The protocol layer decodes a method name and path(s); `FsRequest::from_method`
//! turns them into a closed set of requests with their paths already
//! validated, and `Gateway::dispatch` carries each one out.

use crate::{
    errors::{FsError, FsResult},
    models::{
        metadata::{ATTR_NAME, ATTR_TIMESTAMP, Attributes, BasicAcl, ContainerHeader, timestamp_now},
        object::PendingObject,
    },
    services::{
        context::RequestContext,
        gateway::Gateway,
        listing::Listing,
        reader::ObjectReader,
        resolver::FsPath,
        writer::ObjectWriter,
    },
};
use std::{fmt, str::FromStr};

/// Protocol methods the gateway knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    List,
    Stat,
    Readlink,
    Get,
    Put,
    Open,
    Mkdir,
    Remove,
    Rmdir,
    Setstat,
    Rename,
    Link,
    Symlink,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::List => "List",
            Method::Stat => "Stat",
            Method::Readlink => "Readlink",
            Method::Get => "Get",
            Method::Put => "Put",
            Method::Open => "Open",
            Method::Mkdir => "Mkdir",
            Method::Remove => "Remove",
            Method::Rmdir => "Rmdir",
            Method::Setstat => "Setstat",
            Method::Rename => "Rename",
            Method::Link => "Link",
            Method::Symlink => "Symlink",
        }
    }

    /// Methods refused in read-only mode.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Method::Put | Method::Open | Method::Mkdir | Method::Remove | Method::Rmdir
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    /// Method names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Method; 13] = [
            Method::List,
            Method::Stat,
            Method::Readlink,
            Method::Get,
            Method::Put,
            Method::Open,
            Method::Mkdir,
            Method::Remove,
            Method::Rmdir,
            Method::Setstat,
            Method::Rename,
            Method::Link,
            Method::Symlink,
        ];
        ALL.into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown method `{s}`"))
    }
}

/// A decoded filesystem request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsRequest {
    List(FsPath),
    Stat(FsPath),
    Readlink(FsPath),
    Get(FsPath),
    Put(FsPath),
    Open(FsPath),
    Mkdir(FsPath),
    Remove(FsPath),
    Rmdir(FsPath),
    Setstat(FsPath),
    Rename { from: FsPath, to: FsPath },
    Link { target: FsPath, link: FsPath },
    Symlink { target: FsPath, link: FsPath },
}

impl FsRequest {
    /// Build a request from its wire form. `target` is the second path of
    /// Rename, Link and Symlink.
    pub fn from_method(method: &str, path: &str, target: Option<&str>) -> FsResult<Self> {
        let method: Method = method
            .parse()
            .map_err(|reason: String| FsError::unsupported(path, reason))?;
        let fs_path = FsPath::parse(path)?;
        let second = || -> FsResult<FsPath> {
            let raw = target.ok_or_else(|| FsError::invalid(path, "missing target path"))?;
            FsPath::parse(raw)
        };

        Ok(match method {
            Method::List => FsRequest::List(fs_path),
            Method::Stat => FsRequest::Stat(fs_path),
            Method::Readlink => FsRequest::Readlink(fs_path),
            Method::Get => FsRequest::Get(fs_path),
            Method::Put => FsRequest::Put(fs_path),
            Method::Open => FsRequest::Open(fs_path),
            Method::Mkdir => FsRequest::Mkdir(fs_path),
            Method::Remove => FsRequest::Remove(fs_path),
            Method::Rmdir => FsRequest::Rmdir(fs_path),
            Method::Setstat => FsRequest::Setstat(fs_path),
            Method::Rename => FsRequest::Rename {
                from: fs_path,
                to: second()?,
            },
            Method::Link => FsRequest::Link {
                target: second()?,
                link: fs_path,
            },
            Method::Symlink => FsRequest::Symlink {
                target: second()?,
                link: fs_path,
            },
        })
    }

    pub fn method(&self) -> Method {
        match self {
            FsRequest::List(_) => Method::List,
            FsRequest::Stat(_) => Method::Stat,
            FsRequest::Readlink(_) => Method::Readlink,
            FsRequest::Get(_) => Method::Get,
            FsRequest::Put(_) => Method::Put,
            FsRequest::Open(_) => Method::Open,
            FsRequest::Mkdir(_) => Method::Mkdir,
            FsRequest::Remove(_) => Method::Remove,
            FsRequest::Rmdir(_) => Method::Rmdir,
            FsRequest::Setstat(_) => Method::Setstat,
            FsRequest::Rename { .. } => Method::Rename,
            FsRequest::Link { .. } => Method::Link,
            FsRequest::Symlink { .. } => Method::Symlink,
        }
    }

    /// The path the request acts on.
    pub fn path(&self) -> &FsPath {
        match self {
            FsRequest::List(p)
            | FsRequest::Stat(p)
            | FsRequest::Readlink(p)
            | FsRequest::Get(p)
            | FsRequest::Put(p)
            | FsRequest::Open(p)
            | FsRequest::Mkdir(p)
            | FsRequest::Remove(p)
            | FsRequest::Rmdir(p)
            | FsRequest::Setstat(p) => p,
            FsRequest::Rename { from, .. } => from,
            FsRequest::Link { link, .. } | FsRequest::Symlink { link, .. } => link,
        }
    }
}

/// What a dispatched request hands back to the protocol layer.
pub enum FsResponse {
    Entries(Listing),
    Reader(ObjectReader),
    Writer(ObjectWriter),
    Done,
}

impl fmt::Debug for FsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsResponse::Entries(listing) => f.debug_tuple("Entries").field(&listing.len()).finish(),
            FsResponse::Reader(r) => f.debug_tuple("Reader").field(&r.entry().name).finish(),
            FsResponse::Writer(w) => f.debug_tuple("Writer").field(&w.target().name).finish(),
            FsResponse::Done => f.write_str("Done"),
        }
    }
}

impl Gateway {
    /// Carry out one request.
    pub async fn dispatch(&self, ctx: &RequestContext, request: FsRequest) -> FsResult<FsResponse> {
        let method = request.method();
        tracing::debug!(parent: &self.log, %method, path = %request.path(), "dispatch");

        if method.is_mutating() && self.settings.read_only {
            return Err(FsError::PermissionDenied(request.path().to_string()));
        }

        match request {
            FsRequest::List(path) => self.list_path(ctx, &path).await.map(FsResponse::Entries),
            FsRequest::Stat(path) => {
                let entry = self.stat(ctx, &path).await?;
                Ok(FsResponse::Entries(Listing::single(entry)))
            }
            FsRequest::Get(path) => self.open_reader(ctx, &path).await.map(FsResponse::Reader),
            FsRequest::Put(path) | FsRequest::Open(path) => {
                self.open_writer(ctx, &path).await.map(FsResponse::Writer)
            }
            FsRequest::Mkdir(path) => self.make_bucket(ctx, &path).await.map(|_| FsResponse::Done),
            FsRequest::Remove(path) | FsRequest::Rmdir(path) => {
                self.remove(ctx, &path).await.map(|_| FsResponse::Done)
            }
            FsRequest::Setstat(_) => Ok(FsResponse::Done),
            FsRequest::Readlink(path) => Err(FsError::unsupported(
                path.to_string(),
                "symbolic links are not supported",
            )),
            FsRequest::Rename { from, .. } => Err(FsError::unsupported(
                from.to_string(),
                "objects are immutable and cannot be renamed",
            )),
            FsRequest::Link { link, .. } | FsRequest::Symlink { link, .. } => Err(
                FsError::unsupported(link.to_string(), "links are not supported"),
            ),
        }
    }

    /// Reader bound to the object a path names.
    pub async fn open_reader(&self, ctx: &RequestContext, path: &FsPath) -> FsResult<ObjectReader> {
        let raw = path.to_string();
        let FsPath::Object { .. } = path else {
            return Err(FsError::NotAFile(raw));
        };
        let object = self
            .stat(ctx, path)
            .await?
            .into_object()
            .ok_or_else(|| FsError::NotAFile(raw.clone()))?;

        let span = tracing::debug_span!(parent: &self.log, "reader", path = %raw);
        Ok(ObjectReader::new(self.backend.clone(), object, raw, span))
    }

    /// Writer for a new object at `/<bucket>/<name>`.
    pub async fn open_writer(&self, ctx: &RequestContext, path: &FsPath) -> FsResult<ObjectWriter> {
        let raw = path.to_string();
        let FsPath::Object { bucket, object } = path else {
            return Err(FsError::NotAFile(raw));
        };
        let bucket = self.resolve_bucket(ctx, bucket).await?;
        let Some(bucket_id) = bucket.id else {
            return Err(FsError::NotFound(raw));
        };

        if self.settings.reject_duplicate_names
            && self
                .find_object_by_name(ctx, &bucket, object, &raw)
                .await?
                .is_some()
        {
            return Err(FsError::AlreadyExists(raw));
        }

        let span = tracing::debug_span!(parent: &self.log, "writer", path = %raw);
        ObjectWriter::new(
            self.backend.clone(),
            PendingObject {
                bucket: bucket_id,
                name: object.clone(),
            },
            self.settings.owner,
            raw,
            self.settings.staging_dir.as_deref(),
            span,
        )
    }

    /// Create a top-level bucket named after the single path segment.
    pub async fn make_bucket(&self, ctx: &RequestContext, path: &FsPath) -> FsResult<()> {
        let raw = path.to_string();
        let name = match path {
            FsPath::Bucket(name) => name,
            FsPath::Object { .. } => {
                return Err(FsError::unsupported(
                    raw,
                    "only first-level directories supported",
                ));
            }
            FsPath::Root => return Err(FsError::invalid(raw, "root always exists")),
        };

        if self.settings.reject_duplicate_names
            && self.list_buckets(ctx).await?.iter().any(|b| &b.name == name)
        {
            return Err(FsError::AlreadyExists(raw));
        }

        let header = ContainerHeader {
            owner: self.settings.owner,
            policy: self.settings.container_policy.clone(),
            acl: BasicAcl::Private,
            attributes: Attributes::new()
                .with(ATTR_NAME, name.as_str())
                .with(ATTR_TIMESTAMP, timestamp_now()),
        };
        let id = self
            .call(ctx, "put_container", &raw, self.backend.put_container(header))
            .await?;
        tracing::info!(parent: &self.log, bucket = %id, name = %name, "bucket created");
        Ok(())
    }

    /// Delete an object (found by display name) or a whole bucket.
    pub async fn remove(&self, ctx: &RequestContext, path: &FsPath) -> FsResult<()> {
        let raw = path.to_string();
        let Some(bucket_segment) = path.bucket() else {
            return Err(FsError::invalid(raw, "the root cannot be removed"));
        };
        let bucket = self.resolve_bucket(ctx, bucket_segment).await?;
        let Some(bucket_id) = bucket.id else {
            return Err(FsError::NotFound(raw));
        };

        match path {
            FsPath::Object { object, .. } => {
                let target = self
                    .find_object_by_name(ctx, &bucket, object, &raw)
                    .await?
                    .ok_or_else(|| FsError::NotFound(raw.clone()))?;
                self.call(
                    ctx,
                    "delete_object",
                    &raw,
                    self.backend.delete_object(bucket_id, target.id),
                )
                .await?;
                tracing::info!(parent: &self.log, bucket = %bucket_id, object = %target.id, "object removed");
            }
            _ => {
                self.call(
                    ctx,
                    "delete_container",
                    &raw,
                    self.backend.delete_container(bucket_id),
                )
                .await?;
                tracing::info!(parent: &self.log, bucket = %bucket_id, "bucket removed");
            }
        }
        Ok(())
    }
}
