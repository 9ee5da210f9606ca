//! Session-owned trace store.
//!
//! The engine emits `TraceEntry`/`TraceExit` records through the platform;
//! the standard sink is a `TraceSession` owned by the embedding host. The
//! store is append-only — records are never mutated, exits are paired with
//! their entry by `(modComponentId, instanceId, callBranches)` — and is
//! garbage-collected per mod component via [`TraceSession::clear`].

use parking_lot::Mutex;

use brickflow_types::{InstanceId, ModComponentId, TraceEntry, TraceExit};

/// One brick invocation: its entry and, once settled, its exit.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub entry: TraceEntry,
    pub exit: Option<TraceExit>,
}

/// Trace store for one debugging session.
#[derive(Debug, Default)]
pub struct TraceSession {
    records: Mutex<Vec<TraceRecord>>,
}

impl TraceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry record for a starting invocation.
    pub fn enter(&self, entry: TraceEntry) {
        self.records.lock().push(TraceRecord { entry, exit: None });
    }

    /// Pair an exit with its open entry.
    ///
    /// Matches the most recent unsettled entry with the same component,
    /// instance, and call branch; an exit with no matching entry is
    /// dropped.
    pub fn exit(&self, exit: TraceExit) {
        let mut records = self.records.lock();
        if let Some(record) = records.iter_mut().rev().find(|r| {
            r.exit.is_none()
                && r.entry.mod_component_id == exit.mod_component_id
                && r.entry.instance_id == exit.instance_id
                && r.entry.call_branches == exit.call_branches
        }) {
            record.exit = Some(exit);
        }
    }

    /// Snapshot of all records, in entry order.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Records for one mod component, in entry order.
    pub fn records_for(&self, mod_component_id: &ModComponentId) -> Vec<TraceRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| &r.entry.mod_component_id == mod_component_id)
            .cloned()
            .collect()
    }

    /// Records for one brick placement within a component.
    pub fn records_for_instance(
        &self,
        mod_component_id: &ModComponentId,
        instance_id: &InstanceId,
    ) -> Vec<TraceRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| {
                &r.entry.mod_component_id == mod_component_id
                    && &r.entry.instance_id == instance_id
            })
            .cloned()
            .collect()
    }

    /// Drop every record belonging to a mod component.
    pub fn clear(&self, mod_component_id: &ModComponentId) {
        self.records
            .lock()
            .retain(|r| &r.entry.mod_component_id != mod_component_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brickflow_types::{Branch, RegistryId, TraceOutcome};
    use chrono::Utc;
    use serde_json::json;

    fn entry(component: &str, instance: &str, branches: Vec<Branch>) -> TraceEntry {
        TraceEntry {
            mod_component_id: ModComponentId::new(component),
            instance_id: InstanceId::new(instance),
            brick_id: RegistryId::from_parts("test", "brick"),
            call_branches: branches,
            timestamp: Utc::now(),
            input: json!({}),
        }
    }

    fn exit(component: &str, instance: &str, branches: Vec<Branch>) -> TraceExit {
        TraceExit {
            mod_component_id: ModComponentId::new(component),
            instance_id: InstanceId::new(instance),
            call_branches: branches,
            timestamp: Utc::now(),
            outcome: TraceOutcome::Output(json!(1)),
        }
    }

    #[test]
    fn exit_pairs_with_matching_entry() {
        let session = TraceSession::new();
        session.enter(entry("mc", "a", vec![]));
        session.exit(exit("mc", "a", vec![]));

        let records = session.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].exit.is_some());
    }

    #[test]
    fn exit_matches_call_branch() {
        let session = TraceSession::new();
        session.enter(entry("mc", "a", vec![Branch::new("body", 0)]));
        session.enter(entry("mc", "a", vec![Branch::new("body", 1)]));
        session.exit(exit("mc", "a", vec![Branch::new("body", 0)]));

        let records = session.records();
        assert!(records[0].exit.is_some());
        assert!(records[1].exit.is_none());
    }

    #[test]
    fn unmatched_exit_is_dropped() {
        let session = TraceSession::new();
        session.exit(exit("mc", "a", vec![]));
        assert!(session.records().is_empty());
    }

    #[test]
    fn clear_is_per_component() {
        let session = TraceSession::new();
        session.enter(entry("one", "a", vec![]));
        session.enter(entry("two", "b", vec![]));

        session.clear(&ModComponentId::new("one"));
        let records = session.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entry.mod_component_id.as_str(), "two");
    }

    #[test]
    fn records_for_instance_filters() {
        let session = TraceSession::new();
        session.enter(entry("mc", "a", vec![]));
        session.enter(entry("mc", "b", vec![]));
        session.enter(entry("mc", "a", vec![Branch::new("body", 0)]));

        let for_a = session.records_for_instance(&ModComponentId::new("mc"), &InstanceId::new("a"));
        assert_eq!(for_a.len(), 2);
    }
}
