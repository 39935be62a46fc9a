//! Test-case descriptor: the input the resource layer hands the driver.
//!
//! Also carries the driver's own ambient configuration (backoff and
//! provider-pool keepalive parameters) — not part of the admitted
//! resource, but needed to construct a [`crate::manager::TaskManager`].

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_OP_RATE: u32 = 10;
const DEFAULT_DURATION_SECS: u64 = 10 * 60;
const DEFAULT_KEY_SPACE: i64 = 1000;
const DEFAULT_CHECKPOINT_NUM: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCaseKind {
    Basic,
    SecondaryIndex,
    StreamingSequence,
    MetadataEphemeral,
    MetadataNotification,
    MetadataVersionId,
}

/// Declarative test case admitted from the resource layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseDescriptor {
    pub name: String,
    pub kind: TestCaseKind,
    pub worker_endpoint: String,

    #[serde(default = "default_op_rate")]
    pub op_rate: u32,

    #[serde(default = "default_duration", with = "duration_secs")]
    pub duration: Duration,

    #[serde(default)]
    pub properties: HashMap<String, String>,
}

fn default_op_rate() -> u32 {
    DEFAULT_OP_RATE
}

fn default_duration() -> Duration {
    Duration::from_secs(DEFAULT_DURATION_SECS)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl TestCaseDescriptor {
    /// `keySpace` property, default 1000.
    pub fn key_space(&self) -> i64 {
        self.properties
            .get("keySpace")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_KEY_SPACE)
    }

    /// `checkpointNum` property, default 1000.
    pub fn checkpoint_num(&self) -> u64 {
        self.properties
            .get("checkpointNum")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CHECKPOINT_NUM)
    }
}

/// Outer/inner backoff and provider-pool parameters, per spec §4.4/§4.6.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Initial delay for both the outer (reconnect) and inner
    /// (in-stream retry) exponential backoffs.
    pub backoff_initial: Duration,
    /// Ceiling each backoff's delay grows toward.
    pub backoff_max: Duration,
    /// Multiplier applied to the current delay on each failed attempt.
    pub backoff_multiplier: f64,
    /// Keepalive ping interval for pooled worker channels.
    pub keepalive_interval: Duration,
    /// Keepalive ping timeout for pooled worker channels.
    pub keepalive_timeout: Duration,
    /// Window during which an `eventually_empty` assertion failure is
    /// demoted to retryable rather than terminating the task.
    pub eventually_empty_window: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            backoff_initial: Duration::from_millis(500),
            backoff_max: Duration::from_secs(60),
            backoff_multiplier: 1.5,
            keepalive_interval: Duration::from_secs(10),
            keepalive_timeout: Duration::from_secs(5),
            eventually_empty_window: Duration::from_secs(5 * 60),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn descriptor(properties: HashMap<String, String>) -> TestCaseDescriptor {
        TestCaseDescriptor {
            name: "tc".to_string(),
            kind: TestCaseKind::Basic,
            worker_endpoint: "worker-tc.default.svc.cluster.local:6666".to_string(),
            op_rate: default_op_rate(),
            duration: default_duration(),
            properties,
        }
    }

    #[test]
    fn defaults_apply_when_properties_absent() {
        let tc = descriptor(HashMap::new());
        assert_eq!(tc.key_space(), 1000);
        assert_eq!(tc.checkpoint_num(), 1000);
        assert_eq!(tc.op_rate, 10);
        assert_eq!(tc.duration, Duration::from_secs(600));
    }

    #[test]
    fn properties_parse_when_present() {
        let mut props = HashMap::new();
        props.insert("keySpace".to_string(), "42".to_string());
        props.insert("checkpointNum".to_string(), "7".to_string());
        let tc = descriptor(props);
        assert_eq!(tc.key_space(), 42);
        assert_eq!(tc.checkpoint_num(), 7);
    }

    #[test]
    fn malformed_property_falls_back_to_default() {
        let mut props = HashMap::new();
        props.insert("keySpace".to_string(), "not-a-number".to_string());
        let tc = descriptor(props);
        assert_eq!(tc.key_space(), 1000);
    }
}
