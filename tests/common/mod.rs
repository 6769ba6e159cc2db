//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use notebook_service::config::ServiceConfig;
use notebook_service::lifecycle::{self, Listeners, Shutdown};
use notebook_service::observability::metrics::{MetricsSink, NoopMetrics, Outcome, SinkError};
use notebook_service::service::{
    compose, CallContext, ConversionRequest, ConversionResponse, Handler, NotebookConverter,
    ServiceError, SharedHandler,
};

/// A small notebook with one cell of each kind.
pub fn sample_notebook() -> Value {
    json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {
            "title": "Sample",
            "kernelspec": {"name": "python3", "language": "python"}
        },
        "cells": [
            {"cell_type": "markdown", "source": ["# Heading\n", "Some *text*."]},
            {
                "cell_type": "code",
                "source": "print(1 + 1)",
                "outputs": [{"output_type": "stream", "name": "stdout", "text": ["2\n"]}]
            },
            {"cell_type": "raw", "source": "<raw>"}
        ]
    })
}

/// Config with every listener on an ephemeral loopback port.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.http.addr = "127.0.0.1:0".into();
    config.rpc.addr = "127.0.0.1:0".into();
    config.debug.addr = "127.0.0.1:0".into();
    config.debug.metrics_enabled = false;
    config
}

/// Operation name under the default `rpc.service`.
pub const METHOD: &str = "NotebookConverter.Convert";

/// The production chain without a metrics exporter.
pub fn chain() -> SharedHandler {
    compose(METHOD, Arc::new(NotebookConverter::new()), Arc::new(NoopMetrics))
}

/// The production chain, with metrics written to `journal`.
pub fn journalled_chain(journal: &Journal) -> SharedHandler {
    compose(
        METHOD,
        Arc::new(NotebookConverter::new()),
        Arc::new(JournalMetrics {
            journal: journal.clone(),
            fail: false,
        }),
    )
}

/// Running pair of servers.
pub struct Running {
    pub rpc: SocketAddr,
    pub http: SocketAddr,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<Result<(), lifecycle::StartupError>>,
}

impl Running {
    pub fn rpc_url(&self) -> String {
        format!("http://{}", self.rpc)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.http)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("servers did not stop")
            .expect("server task panicked");
        assert!(result.is_ok(), "{result:?}");
    }
}

/// Bind both transports on ephemeral ports and serve `handler`.
pub async fn start(config: ServiceConfig, handler: SharedHandler) -> Running {
    let rpc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let rpc_addr = rpc.local_addr().unwrap();
    let http_addr = http.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.clone();
    let task = tokio::spawn(async move {
        lifecycle::serve(&config, handler, Listeners { rpc, http }, &signal).await
    });

    Running {
        rpc: rpc_addr,
        http: http_addr,
        shutdown,
        task,
    }
}

/// Shared, ordered record of what happened during a call.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Core stand-in that journals its invocation and answers fixed HTML.
pub struct StubCore {
    pub journal: Journal,
    pub result: Result<ConversionResponse, ServiceError>,
}

impl StubCore {
    pub fn ok(journal: Journal, html: &str) -> Self {
        Self {
            journal,
            result: Ok(ConversionResponse { html: html.into() }),
        }
    }

    pub fn failing(journal: Journal, err: ServiceError) -> Self {
        Self {
            journal,
            result: Err(err),
        }
    }
}

#[async_trait]
impl Handler for StubCore {
    async fn convert(
        &self,
        _ctx: &CallContext,
        _req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        self.journal.push("core");
        self.result.clone()
    }
}

/// Core stand-in that waits for the context to end.
pub struct SlowCore {
    pub journal: Journal,
}

#[async_trait]
impl Handler for SlowCore {
    async fn convert(
        &self,
        ctx: &CallContext,
        _req: ConversionRequest,
    ) -> Result<ConversionResponse, ServiceError> {
        self.journal.push("core");
        tokio::select! {
            err = ctx.done() => {
                self.journal.push(format!("core:{}", err.kind()));
                Err(err)
            }
            _ = tokio::time::sleep(Duration::from_secs(10)) => Ok(ConversionResponse { html: "late".into() }),
        }
    }
}

/// Metrics sink that journals calls, or fails every one.
pub struct JournalMetrics {
    pub journal: Journal,
    pub fail: bool,
}

impl MetricsSink for JournalMetrics {
    fn call_started(&self, _method: &str) -> Result<(), SinkError> {
        self.journal.push("metrics:started");
        if self.fail {
            return Err(SinkError::Unavailable("sink down".into()));
        }
        Ok(())
    }

    fn call_finished(
        &self,
        _method: &str,
        outcome: Outcome,
        _elapsed: Duration,
    ) -> Result<(), SinkError> {
        self.journal.push(format!("metrics:finished:{}", outcome.as_str()));
        if self.fail {
            return Err(SinkError::Unavailable("sink down".into()));
        }
        Ok(())
    }
}
