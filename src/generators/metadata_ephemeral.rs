//! MetadataEphemeral generator (spec §4.3.2): ephemeral-key lifetime
//! across a write / restart / verify cycle, gated by an
//! `eventually_empty` oracle since reaping happens asynchronously.

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::TestCaseDescriptor;
use crate::operation::{Assertion, Operation, OperationKind};

use super::GeneratorContext;

pub struct MetadataEphemeral {
    ctx: GeneratorContext,
    checkpoint_num: u64,
    counter: u64,
    checkpoint: u64,
    check_ephemeral: bool,
}

impl MetadataEphemeral {
    pub fn new(tc: &TestCaseDescriptor, cancel: CancellationToken) -> Self {
        let checkpoint_num = tc.checkpoint_num().max(1);
        let checkpoint = rand::thread_rng().gen_range(0..checkpoint_num);
        Self {
            ctx: GeneratorContext::new(tc.name.clone(), tc.op_rate, tc.duration, cancel),
            checkpoint_num,
            counter: 0,
            checkpoint,
            check_ephemeral: false,
        }
    }

    pub fn name(&self) -> &str {
        "metadata-ephemeral"
    }

    pub async fn next(&mut self) -> Option<Operation> {
        self.ctx.gate().await?;
        let task = self.ctx.task_name().to_string();

        if self.counter < self.checkpoint {
            let key = format!("/ephemeral/{task}/{}", self.counter);
            self.counter += 1;
            let seq = self.ctx.next_sequence();
            return Some(Operation::new(
                seq,
                OperationKind::Put {
                    key,
                    value: Vec::new(),
                    ephemeral: true,
                    partition_key: None,
                    sequence_key_delta: Vec::new(),
                },
            ));
        }

        if !self.check_ephemeral {
            self.check_ephemeral = true;
            let seq = self.ctx.next_sequence();
            return Some(Operation::new(seq, OperationKind::SessionRestart));
        }

        let key_start = format!("/ephemeral/{task}/");
        let key_end = format!("/ephemeral/{task}//");
        self.check_ephemeral = false;
        self.counter = 0;
        self.checkpoint = rand::thread_rng().gen_range(0..self.checkpoint_num);
        let seq = self.ctx.next_sequence();
        Some(
            Operation::new(seq, OperationKind::List { key_start, key_end })
                .with_assertion(Assertion::eventually_empty()),
        )
    }
}
