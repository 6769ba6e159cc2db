//! Startup orchestration.
//!
//! # Responsibilities
//! - Pick the metrics sink
//! - Compose the handler chain exactly once
//! - Bind both listeners, then serve until shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::metrics::{self, MetricsSink, NoopMetrics, PrometheusMetrics, SinkError};
use crate::rpc::RpcServer;
use crate::service::{self, operation_name, NotebookConverter, SharedHandler};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid {field} address `{value}`")]
    Address { field: &'static str, value: String },

    #[error("failed to bind {transport} listener on {addr}: {source}")]
    Bind {
        transport: &'static str,
        addr: String,
        source: std::io::Error,
    },

    #[error("metrics: {0}")]
    Metrics(#[from] SinkError),

    #[error("{transport} server failed: {source}")]
    Serve {
        transport: &'static str,
        source: std::io::Error,
    },
}

/// Listeners for both transports, bound before any traffic is served.
pub struct Listeners {
    pub rpc: TcpListener,
    pub http: TcpListener,
}

impl Listeners {
    pub async fn bind(config: &ServiceConfig) -> Result<Self, StartupError> {
        Ok(Self {
            rpc: bind("rpc", &config.rpc.addr).await?,
            http: bind("http", &config.http.addr).await?,
        })
    }
}

async fn bind(transport: &'static str, addr: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            transport,
            addr: addr.to_string(),
            source,
        })
}

/// Install the Prometheus exporter when enabled, else discard measurements.
pub fn metrics_sink(config: &ServiceConfig) -> Result<Arc<dyn MetricsSink>, StartupError> {
    if !config.debug.metrics_enabled {
        return Ok(Arc::new(NoopMetrics));
    }

    let addr: SocketAddr = config
        .debug
        .addr
        .parse()
        .map_err(|_| StartupError::Address {
            field: "debug.addr",
            value: config.debug.addr.clone(),
        })?;
    metrics::init_metrics(addr)?;
    Ok(Arc::new(PrometheusMetrics::new()))
}

/// The chain both transports share, observed under the configured
/// operation name.
pub fn build_handler(config: &ServiceConfig, metrics: Arc<dyn MetricsSink>) -> SharedHandler {
    service::compose(
        &operation_name(&config.rpc.service),
        Arc::new(NotebookConverter::new()),
        metrics,
    )
}

/// Serve both transports on `listeners` until `shutdown` fires.
pub async fn serve(
    config: &ServiceConfig,
    handler: SharedHandler,
    listeners: Listeners,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let rpc = RpcServer::new(config, handler.clone());
    let http = HttpServer::new(config, handler);

    let rpc_shutdown = shutdown.subscribe();
    let http_shutdown = shutdown.subscribe();

    tokio::try_join!(
        async {
            rpc.run(listeners.rpc, rpc_shutdown)
                .await
                .map_err(|source| StartupError::Serve {
                    transport: "rpc",
                    source,
                })
        },
        async {
            http.run(listeners.http, http_shutdown)
                .await
                .map_err(|source| StartupError::Serve {
                    transport: "http",
                    source,
                })
        },
    )?;
    Ok(())
}

/// Run the service until SIGINT or SIGTERM.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    let metrics = metrics_sink(&config)?;
    let handler = build_handler(&config, metrics);
    let listeners = Listeners::bind(&config).await?;

    tracing::info!(
        service = %config.name,
        version = crate::VERSION,
        rpc = %config.rpc.addr,
        http = %config.http.addr,
        root = %config.http.root,
        "Service starting"
    );

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    serve(&config, handler, listeners, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::observability::metrics::Outcome;
    use crate::service::{CallContext, ConversionRequest, Handler};

    #[derive(Default)]
    struct Methods(Mutex<Vec<String>>);

    impl MetricsSink for Methods {
        fn call_started(&self, method: &str) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(method.to_owned());
            Ok(())
        }

        fn call_finished(
            &self,
            method: &str,
            _outcome: Outcome,
            _elapsed: Duration,
        ) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(method.to_owned());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_handler_observes_configured_service() {
        let mut config = ServiceConfig::default();
        config.rpc.service = "JupyterNotebookSupport".into();

        let methods = Arc::new(Methods::default());
        let handler = build_handler(&config, methods.clone());
        let request = ConversionRequest::new(serde_json::json!({"cells": []}));
        assert!(handler.convert(&CallContext::background(), request).await.is_ok());

        assert_eq!(
            *methods.0.lock().unwrap(),
            vec!["JupyterNotebookSupport.Convert"; 2]
        );
    }
}
