//! Error taxonomy for the workload driver.
//!
//! Three taxa, per the driver's retry policy: transient (retried by the
//! task's inner backoff), reconnect-worthy (retried by the outer backoff,
//! which re-dials and re-opens the stream), and permanent (the task
//! terminates without reconnecting).

use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// Transport-level failure on Send/Recv, or a worker-reported
    /// `RetryableFailure`, or an `AssertionFailure` demoted by the
    /// eventually-empty rule. Retried in place by the task's inner backoff.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The stream closed (EOF on Send or Recv) or the provider failed to
    /// dial or open the Execute stream. Retried by the outer backoff,
    /// which re-dials.
    #[error("reconnect required: {0}")]
    Reconnect(String),

    /// Worker reported `NonRetryableFailure`, an unrecognized status, or
    /// an `AssertionFailure` outside the eventually-empty window. The task
    /// terminates; no reconnect.
    #[error("assertion failed: {0}")]
    AssertionFailure(String),

    #[error("non-retryable failure: {0}")]
    NonRetryableFailure(String),

    #[error("worker returned unknown status: {0}")]
    UnknownStatus(String),

    #[error("unsupported test case kind: {0}")]
    UnsupportedKind(String),

    #[error("invalid action mix weights: sum must equal 100, got {0}")]
    InvalidWeights(u32),

    #[error("task cancelled")]
    Cancelled,

    #[error("metrics registration failed: {0}")]
    Metrics(String),
}

impl DriverError {
    /// True for the taxa the task's outer loop treats as fatal: the task
    /// is torn down and not resumed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            DriverError::AssertionFailure(_)
                | DriverError::NonRetryableFailure(_)
                | DriverError::UnknownStatus(_)
        )
    }

    pub fn is_reconnect(&self) -> bool {
        matches!(self, DriverError::Reconnect(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::Transient(_))
    }
}

impl From<tonic::Status> for DriverError {
    fn from(status: tonic::Status) -> Self {
        DriverError::Transient(status.message().to_string())
    }
}

impl From<tonic::transport::Error> for DriverError {
    fn from(err: tonic::transport::Error) -> Self {
        DriverError::Reconnect(err.to_string())
    }
}
