//! BasicKV generator (spec §4.3.1): sequential init Puts followed by a
//! steady phase sampled uniformly across ten actions against the
//! mirrored key space.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::action_mix::ActionMix;
use crate::config::TestCaseDescriptor;
use crate::error::DriverResult;
use crate::mirror::{Entry, StateMirror};
use crate::operation::{Assertion, Comparison, Operation, OperationKind, Record};

use super::GeneratorContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Action {
    Put,
    Delete,
    Get,
    GetFloor,
    GetCeiling,
    GetHigher,
    GetLower,
    List,
    Scan,
    DeleteRange,
}

enum Phase {
    Init { next_index: i64 },
    Steady,
}

pub struct BasicKv {
    ctx: GeneratorContext,
    key_space: i64,
    mirror: StateMirror,
    phase: Phase,
    mix: ActionMix<Action>,
    rng: StdRng,
}

impl BasicKv {
    pub fn new(tc: &TestCaseDescriptor, cancel: CancellationToken) -> DriverResult<Self> {
        let mix = ActionMix::new([
            (Action::Put, 10),
            (Action::Delete, 10),
            (Action::Get, 10),
            (Action::GetFloor, 10),
            (Action::GetCeiling, 10),
            (Action::GetHigher, 10),
            (Action::GetLower, 10),
            (Action::List, 10),
            (Action::Scan, 10),
            (Action::DeleteRange, 10),
        ])?;
        Ok(Self {
            ctx: GeneratorContext::new(tc.name.clone(), tc.op_rate, tc.duration, cancel),
            key_space: tc.key_space(),
            mirror: StateMirror::new(),
            phase: Phase::Init { next_index: 0 },
            mix,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn name(&self) -> &str {
        "basic-kv"
    }

    pub async fn next(&mut self) -> Option<Operation> {
        self.ctx.gate().await?;
        match self.phase {
            Phase::Init { next_index } if next_index < self.key_space => {
                self.phase = Phase::Init {
                    next_index: next_index + 1,
                };
                Some(self.emit_put(next_index))
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
            Action::Put => self.emit_put(index),
            Action::Delete => self.emit_delete(index),
            Action::DeleteRange => self.emit_delete_range(index),
            Action::Get => self.emit_get(index, Comparison::Equal),
            Action::GetFloor => self.emit_get(index, Comparison::Floor),
            Action::GetCeiling => self.emit_get(index, Comparison::Ceiling),
            Action::GetHigher => self.emit_get(index, Comparison::Higher),
            Action::GetLower => self.emit_get(index, Comparison::Lower),
            Action::List => self.emit_list(index),
            Action::Scan => self.emit_scan(index),
        })
    }

    fn emit_put(&mut self, index: i64) -> Operation {
        let task = self.ctx.task_name().to_string();
        let key = fmt_key(&task, index);
        let value = fmt_value(&task);
        self.mirror.put(key.clone(), value.clone());
        let seq = self.ctx.next_sequence();
        Operation::new(
            seq,
            OperationKind::Put {
                key,
                value: value.into_bytes(),
                ephemeral: false,
                partition_key: None,
                sequence_key_delta: Vec::new(),
            },
        )
    }

    fn emit_delete(&mut self, index: i64) -> Operation {
        let task = self.ctx.task_name().to_string();
        let key = fmt_key(&task, index);
        self.mirror.delete(&key);
        let seq = self.ctx.next_sequence();
        Operation::new(seq, OperationKind::Delete { key })
    }

    /// No oracle attached — deliberate per spec §9 Open Question #1.
    fn emit_delete_range(&mut self, index: i64) -> Operation {
        let task = self.ctx.task_name().to_string();
        let span = self.rng.gen_range(0..100);
        let key_start = fmt_key(&task, index);
        let key_end = fmt_key(&task, index + span);
        self.mirror.delete_range(&key_start, &key_end);
        let seq = self.ctx.next_sequence();
        Operation::new(seq, OperationKind::DeleteRange { key_start, key_end })
    }

    fn emit_get(&mut self, index: i64, comparison: Comparison) -> Operation {
        let task = self.ctx.task_name().to_string();
        let key = fmt_key(&task, index);
        let assertion = match comparison {
            Comparison::Equal => match self.mirror.get(&key) {
                Some(value) => Assertion::records(vec![Record {
                    key: key.clone(),
                    value: value.clone().into_bytes(),
                }]),
                None => Assertion::empty(),
            },
            Comparison::Floor => entry_assertion(self.mirror.floor(&key)),
            Comparison::Ceiling => entry_assertion(self.mirror.ceiling(&key)),
            Comparison::Higher => entry_assertion(self.mirror.higher(&key)),
            Comparison::Lower => entry_assertion(self.mirror.lower(&key)),
        };
        let seq = self.ctx.next_sequence();
        Operation::new(seq, OperationKind::Get { key, comparison }).with_assertion(assertion)
    }

    fn emit_list(&mut self, index: i64) -> Operation {
        let task = self.ctx.task_name().to_string();
        let span = self.rng.gen_range(0..100);
        let key_start = fmt_key(&task, index);
        let key_end = fmt_key(&task, index + span);
        let records = self
            .mirror
            .list(&key_start, &key_end)
            .into_iter()
            .map(|key| Record {
                key,
                value: Vec::new(),
            })
            .collect();
        let seq = self.ctx.next_sequence();
        Operation::new(
            seq,
            OperationKind::List {
                key_start,
                key_end,
            },
        )
        .with_assertion(Assertion::records(records))
    }

    fn emit_scan(&mut self, index: i64) -> Operation {
        let task = self.ctx.task_name().to_string();
        let span = self.rng.gen_range(0..100);
        let key_start = fmt_key(&task, index);
        let key_end = fmt_key(&task, index + span);
        let records = self
            .mirror
            .range_scan(&key_start, &key_end)
            .into_iter()
            .map(|entry| Record {
                key: entry.key,
                value: entry.value.into_bytes(),
            })
            .collect();
        let seq = self.ctx.next_sequence();
        Operation::new(
            seq,
            OperationKind::Scan {
                key_start,
                key_end,
            },
        )
        .with_assertion(Assertion::records(records))
    }
}

fn entry_assertion(entry: Option<Entry>) -> Assertion {
    match entry {
        Some(entry) => Assertion::records(vec![Record {
            key: entry.key,
            value: entry.value.into_bytes(),
        }]),
        None => Assertion::empty(),
    }
}

/// Zero-padded to 20 digits so lexicographic byte order matches
/// numeric order (spec §4.3.1, §6).
fn fmt_key(task: &str, index: i64) -> String {
    format!("{task}-{index:020}")
}

fn fmt_value(task: &str) -> String {
    format!("{task}-{}", Uuid::new_v4())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn descriptor(key_space: i64) -> TestCaseDescriptor {
        use std::collections::HashMap;
        use std::time::Duration;
        let mut properties = HashMap::new();
        properties.insert("keySpace".to_string(), key_space.to_string());
        TestCaseDescriptor {
            name: "test".to_string(),
            kind: crate::config::TestCaseKind::Basic,
            worker_endpoint: "worker-test.default.svc.cluster.local:6666".to_string(),
            op_rate: 1000,
            duration: Duration::from_secs(1),
            properties,
        }
    }

    #[tokio::test]
    async fn init_phase_emits_sequential_zero_padded_puts() {
        let tc = descriptor(3);
        let mut g = BasicKv::new(&tc, CancellationToken::new()).unwrap();
        for i in 0..3 {
            let op = g.next().await.expect("init put");
            match op.kind {
                OperationKind::Put { key, value, .. } => {
                    assert_eq!(key, format!("test-{i:020}"));
                    assert!(String::from_utf8(value).unwrap().starts_with("test-"));
                }
                other => panic!("expected Put, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn delete_range_carries_no_assertion() {
        let tc = descriptor(0);
        let mut g = BasicKv::new(&tc, CancellationToken::new()).unwrap();
        let op = g.emit_delete_range(0);
        assert!(op.assertion.is_none());
    }

    #[tokio::test]
    async fn get_against_known_key_returns_exact_record() {
        let tc = descriptor(0);
        let mut g = BasicKv::new(&tc, CancellationToken::new()).unwrap();
        g.mirror.put("test-00000000000000000005", "value-5");
        let op = g.emit_get(5, Comparison::Equal);
        let assertion = op.assertion.unwrap();
        assert_eq!(assertion.records.len(), 1);
        assert_eq!(assertion.records[0].key, "test-00000000000000000005");
        assert!(!assertion.empty_records);
    }

    #[tokio::test]
    async fn get_against_missing_key_asserts_empty() {
        let tc = descriptor(0);
        let mut g = BasicKv::new(&tc, CancellationToken::new()).unwrap();
        let op = g.emit_get(42, Comparison::Equal);
        assert!(op.assertion.unwrap().empty_records);
    }
}
