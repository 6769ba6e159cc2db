//! Notebook to HTML conversion service.
//!
//! One `Convert` operation, served over JSON-RPC and REST through the same
//! composed handler chain.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rpc;
pub mod security;
pub mod service;

/// Crate version, stamped on responses and the endpoint registration.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use client::{ClientError, HttpClient, RpcClient};
pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rpc::RpcServer;
pub use service::{
    compose, CallContext, ConversionRequest, ConversionResponse, Handler, NotebookConverter,
    ServiceError, SharedHandler,
};
