//! Trace records for brick invocations.
//!
//! The execution engine emits one entry when a brick starts and one exit
//! when it settles. Records are immutable once created; the debugger UI
//! consumes them keyed by `(modComponentId, instanceId, callBranches)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{InstanceId, ModComponentId, RegistryId};

/// One level of a pipeline call path: which sub-pipeline property was
/// entered and the iteration counter within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Branch {
    /// Sub-pipeline key, e.g. `body`, `if`, `else`.
    pub key: String,
    /// Zero-based iteration counter (always 0 for non-loop branches).
    pub counter: u64,
}

impl Branch {
    pub fn new(key: impl Into<String>, counter: u64) -> Self {
        Self {
            key: key.into(),
            counter,
        }
    }
}

/// Record of one brick invocation starting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    pub mod_component_id: ModComponentId,
    pub instance_id: InstanceId,
    pub brick_id: RegistryId,
    /// Call path from the root pipeline down to this step's pipeline.
    pub call_branches: Vec<Branch>,
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the resolved input the brick received.
    pub input: Value,
}

/// How a traced invocation settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "value")]
pub enum TraceOutcome {
    /// The brick completed and produced this output.
    Output(Value),
    /// The brick failed with this rendered error message.
    Error(String),
    /// The run was cancelled while this brick was in flight.
    Cancelled,
}

/// Record of one brick invocation settling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceExit {
    pub mod_component_id: ModComponentId,
    pub instance_id: InstanceId,
    pub call_branches: Vec<Branch>,
    pub timestamp: DateTime<Utc>,
    pub outcome: TraceOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_wire_format_is_tagged() {
        let outcome = TraceOutcome::Output(json!({"n": 1}));
        let wire = serde_json::to_value(&outcome).unwrap();
        assert_eq!(wire, json!({"status": "output", "value": {"n": 1}}));

        let cancelled = serde_json::to_value(TraceOutcome::Cancelled).unwrap();
        assert_eq!(cancelled, json!({"status": "cancelled"}));
    }

    #[test]
    fn entry_round_trips() {
        let entry = TraceEntry {
            mod_component_id: ModComponentId::new("mc-1"),
            instance_id: InstanceId::new("step-1"),
            brick_id: RegistryId::from_parts("core", "identity"),
            call_branches: vec![Branch::new("body", 2)],
            timestamp: Utc::now(),
            input: json!({"value": true}),
        };
        let wire = serde_json::to_value(&entry).unwrap();
        let back: TraceEntry = serde_json::from_value(wire).unwrap();
        assert_eq!(back, entry);
    }
}
