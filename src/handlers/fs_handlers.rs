//! HTTP development transport for the filesystem gateway.
//!
//! Each request gets a child of the process shutdown token; the token is
//! cancelled when the request future is dropped (client gone) or the server
//! shuts down, which aborts any backend call still in flight.

use crate::{
    errors::{AppError, FsResult},
    handlers::dispatcher::{FsRequest, FsResponse, Method},
    models::entry::FileInfo,
    services::{
        context::RequestContext, gateway::Gateway, listing::Listing, reader::ObjectReader,
        writer::ObjectWriter,
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::SecondsFormat;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    /// Cancelled on process shutdown; every request token is a child of it.
    pub shutdown: CancellationToken,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(gateway: Gateway, shutdown: CancellationToken, request_timeout: Duration) -> Self {
        Self {
            gateway,
            shutdown,
            request_timeout,
        }
    }

    /// Context for one request, plus the guard that cancels it on drop.
    pub(crate) fn request_context(&self) -> (RequestContext, DropGuard) {
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        (RequestContext::new(token, self.request_timeout), guard)
    }
}

/// Query string accepted on `/fs`.
#[derive(Debug, Default, Deserialize)]
pub struct FsQuery {
    /// Method name; `list`, `stat` or `read` on GET.
    pub op: Option<String>,
    /// Entry offset for listings, byte offset for reads.
    pub offset: Option<u64>,
    /// Bytes to read.
    pub length: Option<u64>,
    /// Maximum entries per listing page.
    pub limit: Option<usize>,
    /// Second path of Rename, Link and Symlink.
    pub target: Option<String>,
}

/// JSON shape of one directory entry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryView {
    pub name: String,
    pub size: u64,
    pub modified: String,
    pub is_dir: bool,
    pub mode: u32,
}

impl EntryView {
    pub fn from_info(info: &impl FileInfo) -> Self {
        Self {
            name: info.name().to_string(),
            size: info.size(),
            modified: info.modified().to_rfc3339_opts(SecondsFormat::Secs, true),
            is_dir: info.is_dir(),
            mode: info.mode(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListingPage {
    pub entries: Vec<EntryView>,
    pub eof: bool,
}

/// Reply to a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,
    pub size: u64,
}

fn fs_path(path: Option<String>) -> String {
    format!("/{}", path.unwrap_or_default())
}

/// `GET /fs`
pub async fn get_root(
    State(state): State<AppState>,
    Query(q): Query<FsQuery>,
) -> Result<Response, AppError> {
    get_path(state, fs_path(None), q).await
}

/// `GET /fs/{*path}`: `?op=list|stat|read` (default `stat`).
pub async fn get_entry(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(q): Query<FsQuery>,
) -> Result<Response, AppError> {
    get_path(state, fs_path(Some(path)), q).await
}

async fn get_path(state: AppState, path: String, q: FsQuery) -> Result<Response, AppError> {
    let method = match q.op.as_deref().unwrap_or("stat") {
        "read" => Method::Get,
        "list" => Method::List,
        "stat" => Method::Stat,
        other => {
            return Err(AppError::bad_request(format!(
                "unsupported GET op `{other}` (expected list, stat or read)"
            )));
        }
    };
    let request = FsRequest::from_method(method.as_str(), &path, None)?;
    let (ctx, guard) = state.request_context();
    let response = state.gateway.dispatch(&ctx, request).await?;
    respond(&state.gateway, ctx, guard, response, method, &q).await
}

/// `PUT /fs/{*path}`: upload the request body as a new object.
pub async fn put_entry(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Body,
) -> Result<Response, AppError> {
    let request = FsRequest::from_method(Method::Put.as_str(), &fs_path(Some(path)), None)?;
    let (ctx, _guard) = state.request_context();
    let FsResponse::Writer(mut writer) = state.gateway.dispatch(&ctx, request).await? else {
        return Err(AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "upload did not produce a writer",
        ));
    };

    let mut offset: i64 = 0;
    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk
            .map_err(|err| AppError::bad_request(format!("reading request body: {err}")))?;
        let written = writer.write_at(&chunk, offset).await?;
        offset += written as i64;
    }

    finish_upload(writer, &ctx).await
}

/// `DELETE /fs/{*path}`: Remove, or `?op=Rmdir`.
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(q): Query<FsQuery>,
) -> Result<Response, AppError> {
    let method = q.op.as_deref().unwrap_or(Method::Remove.as_str());
    let request = FsRequest::from_method(method, &fs_path(Some(path)), None)?;
    if !matches!(request.method(), Method::Remove | Method::Rmdir) {
        return Err(AppError::bad_request(format!(
            "DELETE carries Remove or Rmdir, not {}",
            request.method()
        )));
    }
    let (ctx, guard) = state.request_context();
    let response = state.gateway.dispatch(&ctx, request).await?;
    respond(&state.gateway, ctx, guard, response, Method::Remove, &q).await
}

/// `POST /fs?op=<Method>`
pub async fn post_root(
    State(state): State<AppState>,
    Query(q): Query<FsQuery>,
) -> Result<Response, AppError> {
    post_path(state, fs_path(None), q).await
}

/// `POST /fs/{*path}?op=<Method>[&target=]`: any method by name.
pub async fn post_entry(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(q): Query<FsQuery>,
) -> Result<Response, AppError> {
    post_path(state, fs_path(Some(path)), q).await
}

async fn post_path(state: AppState, path: String, q: FsQuery) -> Result<Response, AppError> {
    let Some(op) = q.op.as_deref() else {
        return Err(AppError::bad_request("missing `op` query parameter"));
    };
    let request = FsRequest::from_method(op, &path, q.target.as_deref())?;
    let method = request.method();
    let (ctx, guard) = state.request_context();
    let response = state.gateway.dispatch(&ctx, request).await?;
    respond(&state.gateway, ctx, guard, response, method, &q).await
}

/// Render a dispatch result. Readers stream their bytes; writers opened
/// without a body are closed at once, storing an empty object.
async fn respond(
    gateway: &Gateway,
    ctx: RequestContext,
    guard: DropGuard,
    response: FsResponse,
    method: Method,
    q: &FsQuery,
) -> Result<Response, AppError> {
    match response {
        FsResponse::Entries(listing) if method == Method::Stat => stat_response(listing),
        FsResponse::Entries(listing) => list_response(&listing, q),
        FsResponse::Reader(reader) => {
            let chunk = gateway.backend().max_chunk_size();
            Ok(read_response(reader, ctx, guard, q, chunk))
        }
        FsResponse::Writer(writer) => finish_upload(writer, &ctx).await,
        FsResponse::Done => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

fn stat_response(listing: Listing) -> Result<Response, AppError> {
    let entry = listing
        .entries()
        .first()
        .map(EntryView::from_info)
        .ok_or_else(|| AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "stat returned no entry"))?;
    Ok(Json(entry).into_response())
}

fn list_response(listing: &Listing, q: &FsQuery) -> Result<Response, AppError> {
    let offset = entry_offset(q.offset)?;
    let (page, eof) = listing.list_at(offset, q.limit.unwrap_or(usize::MAX));
    Ok(Json(ListingPage {
        entries: page.iter().map(EntryView::from_info).collect(),
        eof,
    })
    .into_response())
}

/// Listing offsets index into memory, so they must fit a `usize`.
fn entry_offset(offset: Option<u64>) -> Result<usize, AppError> {
    let offset = offset.unwrap_or(0);
    usize::try_from(offset)
        .map_err(|_| AppError::bad_request(format!("listing offset {offset} out of range")))
}

fn read_response(
    reader: ObjectReader,
    ctx: RequestContext,
    guard: DropGuard,
    q: &FsQuery,
    chunk: usize,
) -> Response {
    let offset = q.offset.unwrap_or(0);
    let content_length = reader.span_len(offset, q.length);
    // The guard rides along with the body so the request stays live until
    // the last chunk is sent or the client goes away.
    let stream = reader
        .into_stream(ctx, offset, q.length, chunk)
        .map(move |item: FsResult<_>| {
            let _live = &guard;
            item
        });

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    response
}

async fn finish_upload(writer: ObjectWriter, ctx: &RequestContext) -> Result<Response, AppError> {
    let size = writer.len();
    let id = writer.close(ctx).await?;
    Ok((
        StatusCode::CREATED,
        Json(StoredObject {
            id: id.to_string(),
            size,
        }),
    )
        .into_response())
}
