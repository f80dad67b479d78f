pub mod backend;
pub mod context;
pub mod gateway;
pub mod listing;
pub mod memory_backend;
pub mod reader;
pub mod resolver;
pub mod storage_service;
pub mod writer;
