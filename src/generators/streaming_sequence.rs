//! StreamingSequence generator (spec §4.3.4): append-only
//! sequence-keyed writes, bypassing the operation when the assertion
//! key already exists.

use rand::RngCore;
use tokio_util::sync::CancellationToken;

use crate::config::TestCaseDescriptor;
use crate::operation::{Assertion, Operation, OperationKind, Precondition};

use super::GeneratorContext;

pub struct StreamingSequence {
    ctx: GeneratorContext,
    seq: i64,
}

impl StreamingSequence {
    pub fn new(tc: &TestCaseDescriptor, cancel: CancellationToken) -> Self {
        Self {
            ctx: GeneratorContext::new(tc.name.clone(), tc.op_rate, tc.duration, cancel),
            seq: 0,
        }
    }

    pub fn name(&self) -> &str {
        "streaming-sequence"
    }

    pub async fn next(&mut self) -> Option<Operation> {
        self.ctx.gate().await?;
        self.seq += 1;
        let seq = self.seq;
        let task = self.ctx.task_name().to_string();

        let mut value = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut value);
        let value = value.to_vec();

        let assertion_key = format!(
            "{task}-{:020}-{:020}-{:020}",
            seq,
            seq * 2,
            seq * 3
        );

        let operation_sequence = self.ctx.next_sequence();
        Some(
            Operation::new(
                operation_sequence,
                OperationKind::Put {
                    key: task.clone(),
                    value: value.clone(),
                    ephemeral: false,
                    partition_key: Some(task.clone()),
                    sequence_key_delta: vec![1, 2, 3],
                },
            )
            .with_precondition(Precondition {
                watch_notification: None,
                bypass_if_assert_key_exists: Some(true),
            })
            .with_assertion(Assertion {
                key: Some(assertion_key),
                value: Some(value),
                partition_key: Some(task),
                ..Default::default()
            }),
        )
    }
}
