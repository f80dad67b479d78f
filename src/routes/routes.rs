//! Routes of the HTTP development transport.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /healthz`: liveness
//!   - `GET    /readyz`: backend and staging checks
//!
//! - **Filesystem**
//!   - `GET    /fs[/{*path}]?op=list|stat|read`: List, Stat or Get
//!   - `PUT    /fs/{*path}`: Put (request body becomes the object)
//!   - `DELETE /fs/{*path}`: Remove (`?op=Rmdir` for buckets)
//!   - `POST   /fs[/{*path}]?op=<Method>[&target=]`: any method by name
//!
//! `*path` is the gateway path without its leading slash, so
//! `/fs/photos/cat.jpg` addresses object `cat.jpg` in bucket `photos`.

use crate::handlers::{
    fs_handlers::{AppState, delete_entry, get_entry, get_root, post_entry, post_root, put_entry},
    health_handlers::{healthz, readyz},
};
use axum::{Router, routing::get};

/// Build the router. Shared state (`AppState`) is supplied by the caller.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/fs", get(get_root).post(post_root))
        .route(
            "/fs/{*path}",
            get(get_entry)
                .put(put_entry)
                .delete(delete_entry)
                .post(post_entry),
        )
}
