//! Virtual filesystem gateway over a bucket/object store.
//!
//! Buckets appear as top-level directories and objects as files inside
//! them. [`services::gateway::Gateway`] maps filesystem requests onto a
//! [`services::backend::Backend`]; `handlers` and `routes` expose it over
//! HTTP for development.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
