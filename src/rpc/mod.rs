//! JSON-RPC transport.
//!
//! # Data Flow
//! ```text
//! POST /rpc {"jsonrpc": "2.0", "method": "<Service>.Convert", "params": {...}}
//!     → codec.rs   (envelope decode)
//!     → server.rs  (method dispatch, params → ConversionRequest)
//!     → composed handler chain
//!     → codec.rs   (result or error envelope)
//! ```

pub mod client;
pub mod codec;
pub mod server;

pub use client::RpcClient;
pub use codec::{RpcError, RpcRequest, RpcResponse};
pub use server::{Registration, RpcServer};
