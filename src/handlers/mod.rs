//! Protocol-facing layer: method dispatch plus the HTTP transport handlers.

pub mod dispatcher;
pub mod fs_handlers;
pub mod health_handlers;
