//! Per-task driver (spec §4.4): opens a bidirectional `Execute` stream,
//! pumps operations, classifies responses, and drives the outer
//! (reconnect) / inner (in-stream retry) backoff state machine.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::DriverConfig;
use crate::error::{DriverError, DriverResult};
use crate::generators::Generator;
use crate::metrics::TaskMetrics;
use crate::operation::{now_nanos, Operation};
use crate::provider_pool::ProviderPool;
use crate::retry::TaskBackoff;
use crate::service::proto::{self, execute_response::Status};
use crate::service::ExecuteCommand;

/// Backpressure on the request channel: `Send`/`Recv` are serialized
/// (spec §5), so a single in-flight command is all the pipe needs.
const REQUEST_CHANNEL_CAPACITY: usize = 1;

enum Classification {
    Ok,
    Retry(&'static str),
    Permanent(&'static str, DriverError),
}

pub struct Task {
    name: String,
    worker_endpoint: String,
    generator: Generator,
    pool: Arc<ProviderPool>,
    metrics: TaskMetrics,
    config: DriverConfig,
    cancel: CancellationToken,
}

impl Task {
    pub fn new(
        name: String,
        worker_endpoint: String,
        generator: Generator,
        pool: Arc<ProviderPool>,
        metrics: TaskMetrics,
        config: DriverConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name,
            worker_endpoint,
            generator,
            pool,
            metrics,
            config,
            cancel,
        }
    }

    /// Drives the task to completion: generator exhaustion, a
    /// permanent failure, or cancellation. Reconnect-worthy errors are
    /// retried by the outer backoff, which re-dials and re-opens the
    /// stream; the loop never returns early on those.
    pub async fn run(mut self) {
        let mut outer_backoff = TaskBackoff::new(&self.config);
        loop {
            if self.cancel.is_cancelled() {
                info!(task = %self.name, "task cancelled");
                return;
            }
            match self.run_stream().await {
                Ok(()) => {
                    info!(task = %self.name, "generator exhausted, task done");
                    return;
                }
                Err(DriverError::Cancelled) => {
                    info!(task = %self.name, "task cancelled");
                    return;
                }
                Err(e) if e.is_permanent() => {
                    error!(task = %self.name, error = %e, "task terminated");
                    return;
                }
                Err(e) => {
                    warn!(task = %self.name, error = %e, "reconnecting");
                    tokio::select! {
                        _ = outer_backoff.wait() => {}
                        _ = self.cancel.cancelled() => {
                            info!(task = %self.name, "task cancelled during backoff");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One dial + stream lifetime: runs until the generator is
    /// exhausted (`Ok(())`), a reconnect-worthy error surfaces (caller
    /// re-dials), or a permanent error terminates the task.
    async fn run_stream(&mut self) -> DriverResult<()> {
        let mut client = self.pool.get(&self.worker_endpoint).await?;

        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let request_stream = ReceiverStream::new(rx);
        let response = client
            .execute(request_stream)
            .await
            .map_err(|status| DriverError::Reconnect(status.to_string()))?;
        let mut responses = response.into_inner();

        let mut inner_backoff = TaskBackoff::new(&self.config);

        loop {
            let Some(op) = self.generator.next().await else {
                return Ok(());
            };

            loop {
                let command = ExecuteCommand {
                    testcase: self.name.clone(),
                    operation: Some(op.clone().into()),
                };
                if tx.send(command).await.is_err() {
                    return Err(DriverError::Reconnect("stream closed on send".to_string()));
                }

                let start = Instant::now();
                let resp = match responses.message().await {
                    Ok(Some(resp)) => resp,
                    Ok(None) => {
                        return Err(DriverError::Reconnect("stream closed on recv".to_string()))
                    }
                    Err(status) => {
                        warn!(task = %self.name, error = %status, "transient recv error, retrying operation");
                        self.wait_inner(&mut inner_backoff).await?;
                        continue;
                    }
                };
                let elapsed = start.elapsed().as_secs_f64();

                match self.classify(&op, &resp) {
                    Classification::Ok => {
                        self.metrics.observe(&self.name, "Ok", elapsed);
                        inner_backoff.reset();
                        break;
                    }
                    Classification::Retry(label) => {
                        self.metrics.observe(&self.name, label, elapsed);
                        self.wait_inner(&mut inner_backoff).await?;
                        continue;
                    }
                    Classification::Permanent(label, err) => {
                        self.metrics.observe(&self.name, label, elapsed);
                        return Err(err);
                    }
                }
            }
        }
    }

    async fn wait_inner(&self, backoff: &mut TaskBackoff) -> DriverResult<()> {
        tokio::select! {
            _ = backoff.wait() => Ok(()),
            _ = self.cancel.cancelled() => Err(DriverError::Cancelled),
        }
    }

    /// Classifies one `ExecuteResponse` against the operation that
    /// produced it, applying the eventually-empty demotion (spec §4.4,
    /// §7).
    fn classify(&self, op: &Operation, resp: &proto::ExecuteResponse) -> Classification {
        match Status::try_from(resp.status) {
            Ok(Status::Ok) => Classification::Ok,
            Ok(Status::RetryableFailure) => Classification::Retry("RetryableFailure"),
            Ok(Status::NonRetryableFailure) => Classification::Permanent(
                "NonRetryableFailure",
                DriverError::NonRetryableFailure(resp.status_info.clone()),
            ),
            Ok(Status::AssertionFailure) => {
                let eventually = op
                    .assertion
                    .as_ref()
                    .map(|a| a.eventually_empty)
                    .unwrap_or(false);
                let window_ns = self.config.eventually_empty_window.as_nanos() as i64;
                let within_window = now_nanos() - op.timestamp_nanos < window_ns;
                if eventually && within_window {
                    Classification::Retry("RetryableFailure")
                } else {
                    Classification::Permanent(
                        "AssertionFailure",
                        DriverError::AssertionFailure(resp.status_info.clone()),
                    )
                }
            }
            Err(_) => Classification::Permanent(
                "UnknownStatus",
                DriverError::UnknownStatus(format!(
                    "worker returned unrecognized status code {}",
                    resp.status
                )),
            ),
        }
    }
}
