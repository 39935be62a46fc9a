//! MetadataNotification generator (spec §4.3.3): watch-notification
//! semantics over an init phase, then a steady `{Put:34, Delete:33,
//! DeleteRange:33}` mix.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::action_mix::ActionMix;
use crate::config::TestCaseDescriptor;
use crate::error::DriverResult;
use crate::operation::{
    Assertion, Notification, NotificationType, Operation, OperationKind, Precondition,
};

use super::GeneratorContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SteadyAction {
    Put,
    Delete,
    DeleteRange,
}

enum Phase {
    Init { next_index: i64 },
    Steady,
}

pub struct MetadataNotification {
    ctx: GeneratorContext,
    key_space: i64,
    keys: HashSet<i64>,
    phase: Phase,
    mix: ActionMix<SteadyAction>,
    rng: StdRng,
}

impl MetadataNotification {
    pub fn new(tc: &TestCaseDescriptor, cancel: CancellationToken) -> DriverResult<Self> {
        let mix = ActionMix::new([
            (SteadyAction::Put, 34),
            (SteadyAction::Delete, 33),
            (SteadyAction::DeleteRange, 33),
        ])?;
        Ok(Self {
            ctx: GeneratorContext::new(tc.name.clone(), tc.op_rate, tc.duration, cancel),
            key_space: tc.key_space(),
            keys: HashSet::new(),
            phase: Phase::Init { next_index: 0 },
            mix,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn name(&self) -> &str {
        "metadata-notification"
    }

    pub async fn next(&mut self) -> Option<Operation> {
        self.ctx.gate().await?;
        match self.phase {
            Phase::Init { next_index } if next_index < self.key_space => {
                self.phase = Phase::Init {
                    next_index: next_index + 1,
                };
                Some(self.emit_put(next_index, true))
            }
            Phase::Init { .. } => {
                self.phase = Phase::Steady;
                self.next_steady()
            }
            Phase::Steady => self.next_steady(),
        }
    }

    fn next_steady(&mut self) -> Option<Operation> {
        let action = self.mix.next();
        let index = self.rng.gen_range(0..self.key_space.max(1));
        Some(match action {
            SteadyAction::Put => self.emit_put(index, false),
            SteadyAction::Delete => self.emit_delete(index),
            SteadyAction::DeleteRange => self.emit_delete_range(index),
        })
    }

    fn emit_put(&mut self, index: i64, is_init: bool) -> Operation {
        let task = self.ctx.task_name().to_string();
        let key = fmt_key(&task, index);
        let notification_type = if !is_init && self.keys.contains(&index) {
            NotificationType::KeyModified
        } else {
            NotificationType::KeyCreated
        };
        self.keys.insert(index);
        let seq = self.ctx.next_sequence();
        Operation::new(
            seq,
            OperationKind::Put {
                key: key.clone(),
                value: b"notification".to_vec(),
                ephemeral: false,
                partition_key: None,
                sequence_key_delta: Vec::new(),
            },
        )
        .with_precondition(Precondition {
            watch_notification: Some(true),
            bypass_if_assert_key_exists: None,
        })
        .with_assertion(Assertion::notification(Notification {
            notification_type,
            key: Some(key),
            key_start: None,
            key_end: None,
        }))
    }

    /// Deleting a non-existent key produces no notification, so the
    /// assertion is attached only when the bit was set beforehand.
    fn emit_delete(&mut self, index: i64) -> Operation {
        let task = self.ctx.task_name().to_string();
        let key = fmt_key(&task, index);
        let existed = self.keys.remove(&index);
        let seq = self.ctx.next_sequence();
        let op = Operation::new(seq, OperationKind::Delete { key: key.clone() }).with_precondition(
            Precondition {
                watch_notification: Some(true),
                bypass_if_assert_key_exists: None,
            },
        );
        if existed {
            op.with_assertion(Assertion::notification(Notification {
                notification_type: NotificationType::KeyDeleted,
                key: Some(key),
                key_start: None,
                key_end: None,
            }))
        } else {
            op
        }
    }

    fn emit_delete_range(&mut self, index: i64) -> Operation {
        let task = self.ctx.task_name().to_string();
        let span = self.rng.gen_range(0..100);
        let end_index = index + span;
        for i in index..end_index {
            self.keys.remove(&i);
        }
        let key_start = fmt_key(&task, index);
        let key_end = fmt_key(&task, end_index);
        let seq = self.ctx.next_sequence();
        Operation::new(
            seq,
            OperationKind::DeleteRange {
                key_start: key_start.clone(),
                key_end: key_end.clone(),
            },
        )
        .with_precondition(Precondition {
            watch_notification: Some(true),
            bypass_if_assert_key_exists: None,
        })
        .with_assertion(Assertion::notification(Notification {
            notification_type: NotificationType::KeyRangeDeleted,
            key: None,
            key_start: Some(key_start),
            key_end: Some(key_end),
        }))
    }
}

/// Zero-padded to 20 digits, per spec §6's example (E3).
fn fmt_key(task: &str, index: i64) -> String {
    format!("/notification/{task}/{index:020}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn descriptor(key_space: i64) -> TestCaseDescriptor {
        let mut properties = HashMap::new();
        properties.insert("keySpace".to_string(), key_space.to_string());
        TestCaseDescriptor {
            name: "tc".to_string(),
            kind: crate::config::TestCaseKind::MetadataNotification,
            worker_endpoint: "worker-tc.default.svc.cluster.local:6666".to_string(),
            op_rate: 1000,
            duration: Duration::from_secs(30),
            properties,
        }
    }

    #[tokio::test]
    async fn first_put_is_created_then_modified_on_repeat() {
        let mut g = MetadataNotification::new(&descriptor(1), CancellationToken::new()).unwrap();
        let first = g.next().await.unwrap();
        let notification = first.assertion.unwrap().notification.unwrap();
        assert_eq!(notification.notification_type, NotificationType::KeyCreated);
        assert_eq!(notification.key.as_deref(), Some("/notification/tc/00000000000000000000"));

        let second = g.emit_put(0, false);
        let notification = second.assertion.unwrap().notification.unwrap();
        assert_eq!(notification.notification_type, NotificationType::KeyModified);
    }

    #[tokio::test]
    async fn delete_of_unset_key_has_no_assertion() {
        let mut g = MetadataNotification::new(&descriptor(1), CancellationToken::new()).unwrap();
        let op = g.emit_delete(7);
        assert!(op.assertion.is_none());
    }

    #[tokio::test]
    async fn delete_of_tracked_key_asserts_deleted_notification() {
        let mut g = MetadataNotification::new(&descriptor(1), CancellationToken::new()).unwrap();
        g.keys.insert(3);
        let op = g.emit_delete(3);
        let notification = op.assertion.unwrap().notification.unwrap();
        assert_eq!(notification.notification_type, NotificationType::KeyDeleted);
    }
}
