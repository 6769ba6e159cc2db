//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing response:
//!     → headers.rs (no-cache, CORS, security headers, version stamp)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Applied uniformly to success and error responses
//! - Request size limits are enforced by the HTTP router (see `http::server`)

pub mod headers;
