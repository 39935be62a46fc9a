//! Domain-level operation/assertion types and their wire conversions.
//!
//! Generators produce these, not the generated `proto` types directly,
//! so that a retried operation can be re-converted to the identical
//! wire message without regenerating its `timestamp` — the eventual
//! assertion's deadline is measured from the *first* emission (spec
//! §4.4, §9).

use std::time::{SystemTime, UNIX_EPOCH};

use crate::service::proto;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    Floor,
    Ceiling,
    Higher,
    Lower,
}

impl From<Comparison> for i32 {
    fn from(c: Comparison) -> Self {
        let wire = match c {
            Comparison::Equal => proto::Comparison::Equal,
            Comparison::Floor => proto::Comparison::Floor,
            Comparison::Ceiling => proto::Comparison::Ceiling,
            Comparison::Higher => proto::Comparison::Higher,
            Comparison::Lower => proto::Comparison::Lower,
        };
        wire as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    KeyCreated,
    KeyModified,
    KeyDeleted,
    KeyRangeDeleted,
}

impl From<NotificationType> for i32 {
    fn from(t: NotificationType) -> Self {
        let wire = match t {
            NotificationType::KeyCreated => proto::NotificationType::KeyCreated,
            NotificationType::KeyModified => proto::NotificationType::KeyModified,
            NotificationType::KeyDeleted => proto::NotificationType::KeyDeleted,
            NotificationType::KeyRangeDeleted => proto::NotificationType::KeyRangeDeleted,
        };
        wire as i32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    pub watch_notification: Option<bool>,
    pub bypass_if_assert_key_exists: Option<bool>,
}

impl From<Precondition> for proto::Precondition {
    fn from(p: Precondition) -> Self {
        proto::Precondition {
            watch_notification: p.watch_notification,
            bypass_if_assert_key_exists: p.bypass_if_assert_key_exists,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub value: Vec<u8>,
}

impl From<Record> for proto::Record {
    fn from(r: Record) -> Self {
        proto::Record {
            key: r.key,
            value: r.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub notification_type: NotificationType,
    pub key: Option<String>,
    pub key_start: Option<String>,
    pub key_end: Option<String>,
}

impl From<Notification> for proto::Notification {
    fn from(n: Notification) -> Self {
        proto::Notification {
            r#type: n.notification_type.into(),
            key: n.key,
            key_start: n.key_start,
            key_end: n.key_end,
        }
    }
}

/// The oracle. Any subset of fields may be set, per spec §3.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assertion {
    pub empty_records: bool,
    pub eventually_empty: bool,
    pub records: Vec<Record>,
    pub notification: Option<Notification>,
    pub key: Option<String>,
    pub value: Option<Vec<u8>>,
    pub partition_key: Option<String>,
}

impl Assertion {
    pub fn empty() -> Self {
        Self {
            empty_records: true,
            ..Default::default()
        }
    }

    pub fn eventually_empty() -> Self {
        Self {
            eventually_empty: true,
            ..Default::default()
        }
    }

    pub fn records(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn notification(notification: Notification) -> Self {
        Self {
            notification: Some(notification),
            ..Default::default()
        }
    }
}

impl From<Assertion> for proto::Assertion {
    fn from(a: Assertion) -> Self {
        proto::Assertion {
            empty_records: a.empty_records,
            eventually_empty: a.eventually_empty,
            records: a.records.into_iter().map(Into::into).collect(),
            notification: a.notification.map(Into::into),
            key: a.key,
            value: a.value,
            partition_key: a.partition_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    Put {
        key: String,
        value: Vec<u8>,
        ephemeral: bool,
        partition_key: Option<String>,
        sequence_key_delta: Vec<i64>,
    },
    Delete {
        key: String,
    },
    DeleteRange {
        key_start: String,
        key_end: String,
    },
    Get {
        key: String,
        comparison: Comparison,
    },
    List {
        key_start: String,
        key_end: String,
    },
    Scan {
        key_start: String,
        key_end: String,
    },
    SessionRestart,
}

/// A single emitted command, carrying its own oracle. `sequence` is
/// task-local and monotonic; `timestamp_nanos` is wall-clock at first
/// emission and MUST be preserved verbatim across retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub sequence: i64,
    pub timestamp_nanos: i64,
    pub precondition: Option<Precondition>,
    pub assertion: Option<Assertion>,
    pub kind: OperationKind,
}

impl Operation {
    pub fn new(sequence: i64, kind: OperationKind) -> Self {
        Self {
            sequence,
            timestamp_nanos: now_nanos(),
            precondition: None,
            assertion: None,
            kind,
        }
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertion = Some(assertion);
        self
    }
}

/// Wall-clock nanoseconds since epoch, used to stamp a freshly generated
/// operation. Never called again for the same operation on retry.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

impl From<Operation> for proto::Operation {
    fn from(op: Operation) -> Self {
        let inner = match op.kind {
            OperationKind::Put {
                key,
                value,
                ephemeral,
                partition_key,
                sequence_key_delta,
            } => proto::operation::Operation::Put(proto::OperationPut {
                key,
                value,
                ephemeral,
                partition_key,
                sequence_key_delta,
            }),
            OperationKind::Delete { key } => {
                proto::operation::Operation::Delete(proto::OperationDelete { key })
            }
            OperationKind::DeleteRange { key_start, key_end } => {
                proto::operation::Operation::DeleteRange(proto::OperationDeleteRange {
                    key_start,
                    key_end,
                })
            }
            OperationKind::Get { key, comparison } => {
                proto::operation::Operation::Get(proto::OperationGet {
                    key,
                    comparison: i32::from(comparison),
                })
            }
            OperationKind::List { key_start, key_end } => {
                proto::operation::Operation::List(proto::OperationList { key_start, key_end })
            }
            OperationKind::Scan { key_start, key_end } => {
                proto::operation::Operation::Scan(proto::OperationScan { key_start, key_end })
            }
            OperationKind::SessionRestart => proto::operation::Operation::SessionRestart(
                proto::OperationSessionRestart {},
            ),
        };
        proto::Operation {
            sequence: op.sequence,
            timestamp: op.timestamp_nanos,
            precondition: op.precondition.map(Into::into),
            assertion: op.assertion.map(Into::into),
            operation: Some(inner),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn retried_operation_keeps_original_timestamp() {
        let op = Operation::new(
            0,
            OperationKind::Delete {
                key: "k".to_string(),
            },
        );
        let first = op.timestamp_nanos;
        // Simulate a retry: the same `Operation` value is converted
        // again, not regenerated.
        let wire_a: proto::Operation = op.clone().into();
        let wire_b: proto::Operation = op.into();
        assert_eq!(wire_a.timestamp, first);
        assert_eq!(wire_a.timestamp, wire_b.timestamp);
    }

    #[test]
    fn put_converts_to_the_put_oneof_variant() {
        let op = Operation::new(
            1,
            OperationKind::Put {
                key: "k".to_string(),
                value: b"v".to_vec(),
                ephemeral: true,
                partition_key: None,
                sequence_key_delta: vec![1, 2, 3],
            },
        );
        let wire: proto::Operation = op.into();
        match wire.operation {
            Some(proto::operation::Operation::Put(put)) => {
                assert_eq!(put.key, "k");
                assert!(put.ephemeral);
                assert_eq!(put.sequence_key_delta, vec![1, 2, 3]);
            }
            other => panic!("expected Put, got {other:?}"),
        }
    }
}
