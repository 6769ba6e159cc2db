//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (real IP, request ID, call context)
//!     → [composed handler chain]
//!     → response.rs (JSON or HTML body, error → status)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::HttpClient;
pub use request::{ClientIp, X_REQUEST_ID};
pub use server::HttpServer;
