//! Data model of the gateway.
//!
//! Buckets surface as directories and objects as regular files. Both carry
//! the `FileInfo` capability the protocol layer needs for listings and stat
//! replies. `metadata` holds the backend-facing records they are built from.

pub mod bucket;
pub mod entry;
pub mod ids;
pub mod metadata;
pub mod object;
