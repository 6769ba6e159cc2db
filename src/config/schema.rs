//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the notebook service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name, stamped on responses and logs.
    pub name: String,

    /// Logging settings.
    pub log: LogConfig,

    /// Debug listener (metrics exposition).
    pub debug: DebugConfig,

    /// REST transport.
    pub http: HttpConfig,

    /// RPC transport.
    pub rpc: RpcConfig,

    /// Span export.
    pub tracing: TracingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "notebook-service".to_string(),
            log: LogConfig::default(),
            debug: DebugConfig::default(),
            http: HttpConfig::default(),
            rpc: RpcConfig::default(),
            tracing: TracingConfig::default(),
            timeouts: TimeoutConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Human-readable output instead of JSON lines.
    pub pretty: bool,

    /// ANSI colours in pretty output.
    pub color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            pretty: false,
            color: false,
        }
    }
}

/// Debug listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Bind address for the metrics endpoint.
    pub addr: String,

    /// Serve Prometheus metrics.
    pub metrics_enabled: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9109".to_string(),
            metrics_enabled: true,
        }
    }
}

/// REST transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:9105").
    pub addr: String,

    /// Path every route is mounted under.
    pub root: String,

    /// Registry namespace for the HTTP service.
    pub namespace: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9105".to_string(),
            root: "/".to_string(),
            namespace: "com.owncloud.web".to_string(),
        }
    }
}

/// RPC transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Bind address (e.g., "0.0.0.0:9106").
    pub addr: String,

    /// Registry namespace for the RPC service.
    pub namespace: String,

    /// Service part of the operation name (`<service>.Convert`).
    pub service: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:9106".to_string(),
            namespace: "com.owncloud.api".to_string(),
            service: "NotebookConverter".to_string(),
        }
    }
}

/// Distributed tracing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Export spans to a tracing backend.
    pub enabled: bool,

    /// Backend kind.
    #[serde(rename = "type")]
    pub kind: TracingType,

    /// Agent endpoint spans are sent to.
    pub endpoint: String,

    /// Collector endpoint; preferred over `endpoint` when set.
    pub collector: String,

    /// `service.name` resource attribute on exported spans.
    pub service: String,
}

impl TracingConfig {
    /// Where spans are exported to, if anywhere.
    pub fn export_endpoint(&self) -> Option<&str> {
        [self.collector.as_str(), self.endpoint.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|endpoint| !endpoint.is_empty())
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: TracingType::Jaeger,
            endpoint: String::new(),
            collector: String::new(),
            service: "notebook-service".to_string(),
        }
    }
}

/// Tracing backends. Both receive spans over OTLP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingType {
    Jaeger,
    Otlp,
}

impl TracingType {
    pub fn as_str(self) -> &'static str {
        match self {
            TracingType::Jaeger => "jaeger",
            TracingType::Otlp => "otlp",
        }
    }
}

impl std::str::FromStr for TracingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jaeger" => Ok(TracingType::Jaeger),
            "otlp" => Ok(TracingType::Otlp),
            other => Err(format!("unknown tracing type `{other}` (expected jaeger or otlp)")),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for one conversion, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add security response headers.
    pub enable_headers: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 8 * 1024 * 1024, // 8MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            name = "jupyter"

            [http]
            root = "/jupyter"

            [rpc]
            service = "JupyterNotebookSupport"
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "jupyter");
        assert_eq!(config.http.root, "/jupyter");
        assert_eq!(config.http.addr, "0.0.0.0:9105");
        assert_eq!(config.rpc.service, "JupyterNotebookSupport");
        assert_eq!(config.rpc.namespace, "com.owncloud.api");
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_tracing_backend_survives_round_trip() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [tracing]
            enabled = true
            type = "jaeger"
            endpoint = "localhost:6831"
            collector = "http://collector:4317"
            service = "jupyter"
            "#,
        )
        .unwrap();

        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.kind, TracingType::Jaeger);
        assert_eq!(config.tracing.endpoint, "localhost:6831");
        assert_eq!(config.tracing.export_endpoint(), Some("http://collector:4317"));

        let text = toml::to_string(&config).unwrap();
        let reread: ServiceConfig = toml::from_str(&text).unwrap();
        assert_eq!(reread.tracing.endpoint, "localhost:6831");
        assert_eq!(reread.tracing.collector, "http://collector:4317");
        assert_eq!(reread.tracing.service, "jupyter");
    }

    #[test]
    fn test_unknown_tracing_type_is_rejected() {
        let parsed = toml::from_str::<ServiceConfig>("[tracing]\ntype = \"zipkin\"\n");
        assert!(parsed.is_err());
        assert_eq!("OTLP".parse::<TracingType>(), Ok(TracingType::Otlp));
    }

    #[test]
    fn test_export_endpoint_falls_back_to_agent() {
        let mut tracing = TracingConfig::default();
        assert_eq!(tracing.export_endpoint(), None);
        tracing.endpoint = "http://agent:4317".into();
        assert_eq!(tracing.export_endpoint(), Some("http://agent:4317"));
    }
}
