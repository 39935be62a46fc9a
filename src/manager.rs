//! Task manager: the driver's top-level handle (spec §4.5).
//!
//! Owns the provider pool and metrics registration shared by every
//! task, and makes `apply` idempotent per test case name so a resource
//! reconciler can call it repeatedly without spawning duplicate tasks
//! (spec §4.5, E6).

// ACCEPTABLE: tasks-map lock poisoning is unrecoverable.
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prometheus::Registry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DriverConfig;
use crate::error::DriverResult;
use crate::generators::Generator;
use crate::metrics::TaskMetrics;
use crate::provider_pool::ProviderPool;
use crate::task::Task;

struct TaskEntry {
    _handle: JoinHandle<()>,
    done: watch::Receiver<bool>,
    cancel: CancellationToken,
}

/// Spawns and tracks one [`Task`] per admitted test case.
pub struct TaskManager {
    config: DriverConfig,
    pool: Arc<ProviderPool>,
    metrics: TaskMetrics,
    root_cancel: CancellationToken,
    tasks: Mutex<HashMap<String, TaskEntry>>,
}

impl TaskManager {
    pub fn new(config: DriverConfig) -> DriverResult<Arc<Self>> {
        Self::with_registry(config, prometheus::default_registry())
    }

    /// As [`Self::new`], registering into a caller-supplied registry —
    /// used by tests so repeated construction across test cases doesn't
    /// collide in the process-global default registry.
    pub fn with_registry(config: DriverConfig, registry: &Registry) -> DriverResult<Arc<Self>> {
        let pool = ProviderPool::new(config.clone());
        let metrics = TaskMetrics::with_registry(registry)?;
        Ok(Arc::new(Self {
            config,
            pool,
            metrics,
            root_cancel: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }))
    }

    /// Admits a test case by `name`, spawning a task against
    /// `worker_endpoint` if one by this name isn't already running. A
    /// second `apply` for the same name is a no-op and `factory` is not
    /// invoked — the resource layer may call this on every reconcile
    /// pass (spec §2, §4.5, E6). `factory` builds the generator for the
    /// new task, receiving the per-task cancellation token so the
    /// generator's own cancellation is derived from the task's rather
    /// than sharing a single global handle (spec §9).
    pub fn apply(
        self: &Arc<Self>,
        name: &str,
        worker_endpoint: &str,
        factory: impl FnOnce(CancellationToken) -> DriverResult<Generator>,
    ) -> DriverResult<()> {
        let mut tasks = self.tasks.lock().expect("tasks lock poisoned");
        if tasks.contains_key(name) {
            return Ok(());
        }

        let cancel = self.root_cancel.child_token();
        let generator = factory(cancel.clone())?;
        let task = Task::new(
            name.to_string(),
            worker_endpoint.to_string(),
            generator,
            Arc::clone(&self.pool),
            self.metrics.clone(),
            self.config.clone(),
            cancel.clone(),
        );

        let (done_tx, done_rx) = watch::channel(false);
        let task_name = name.to_string();
        let endpoint = worker_endpoint.to_string();
        let handle = tokio::spawn(async move {
            task.run().await;
            let _ = done_tx.send(true);
        });

        info!(task = %task_name, endpoint = %endpoint, "task admitted");
        tasks.insert(
            task_name,
            TaskEntry {
                _handle: handle,
                done: done_rx,
                cancel,
            },
        );
        Ok(())
    }

    /// Awaits completion of a previously admitted task. Returns
    /// immediately if it has already finished; `None` if no task by
    /// this name was ever admitted.
    pub async fn wait_task(&self, name: &str) -> Option<()> {
        let mut done = {
            let tasks = self.tasks.lock().expect("tasks lock poisoned");
            tasks.get(name)?.done.clone()
        };
        while !*done.borrow() {
            if done.changed().await.is_err() {
                break;
            }
        }
        Some(())
    }

    /// Cancels the generator-specific token for a single task without
    /// tearing down the rest of the driver.
    pub fn cancel_task(&self, name: &str) {
        let tasks = self.tasks.lock().expect("tasks lock poisoned");
        if let Some(entry) = tasks.get(name) {
            entry.cancel.cancel();
        }
    }

    /// Cancels every admitted task. Tasks observe cancellation at their
    /// next rate-limiter gate or backoff sleep and wind down promptly.
    pub fn shutdown(&self) {
        self.root_cancel.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::TestCaseDescriptor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn descriptor(name: &str) -> TestCaseDescriptor {
        TestCaseDescriptor {
            name: name.to_string(),
            kind: crate::config::TestCaseKind::StreamingSequence,
            worker_endpoint: "127.0.0.1:0".to_string(),
            op_rate: 1,
            duration: Duration::from_millis(1),
            properties: Default::default(),
        }
    }

    #[tokio::test]
    async fn apply_is_idempotent_by_name() {
        let manager = TaskManager::with_registry(DriverConfig::default(), &Registry::new()).unwrap();
        let tc = descriptor("idempotent-tc");
        manager
            .apply(&tc.name, &tc.worker_endpoint, |cancel| {
                Generator::from_descriptor(&tc, cancel)
            })
            .unwrap();
        manager
            .apply(&tc.name, &tc.worker_endpoint, |cancel| {
                Generator::from_descriptor(&tc, cancel)
            })
            .unwrap();
        assert_eq!(manager.tasks.lock().unwrap().len(), 1);
        manager.shutdown();
    }

    /// E6: "call `Apply("t", ep, f)` twice; exactly one task is created
    /// and `f` is invoked exactly once" (spec §8).
    #[tokio::test]
    async fn factory_runs_exactly_once_across_repeated_apply() {
        let manager = TaskManager::with_registry(DriverConfig::default(), &Registry::new()).unwrap();
        let tc = descriptor("factory-once-tc");
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let tc = &tc;
            manager
                .apply(&tc.name, &tc.worker_endpoint, move |cancel| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Generator::from_descriptor(tc, cancel)
                })
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        manager.shutdown();
    }

    #[tokio::test]
    async fn wait_task_returns_none_for_unknown_name() {
        let manager = TaskManager::with_registry(DriverConfig::default(), &Registry::new()).unwrap();
        assert!(manager.wait_task("never-admitted").await.is_none());
    }
}
