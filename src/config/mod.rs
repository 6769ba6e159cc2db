//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), if any
//!     → loader.rs (locate, parse & deserialize)
//!     → CLI flags / NOTEBOOK_SERVICE_* env overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → passed by value to the transports at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    DebugConfig, HttpConfig, LogConfig, RpcConfig, SecurityConfig, ServiceConfig, TimeoutConfig,
    TracingConfig, TracingType,
};
pub use validation::ValidationError;
