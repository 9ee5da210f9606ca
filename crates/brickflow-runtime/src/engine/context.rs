//! Execution context passed to bricks.

use serde_json::Value;

use brickflow_types::{Branch, BrickPipeline, ModComponentId, WindowTarget};

use crate::brick::BrickError;
use crate::platform::PlatformProtocol;
use crate::scope::Scope;

use super::{PipelineEngine, RunShared};

/// Per-step execution context.
///
/// Gives a brick read access to the current scope, the targeting computed
/// for this step, the platform capabilities, and a way to run sub-pipeline
/// config properties (control-flow bricks).
pub struct BrickContext<'a> {
    pub(crate) engine: &'a PipelineEngine,
    pub(crate) shared: &'a RunShared,
    pub(crate) branches: &'a [Branch],
    pub(crate) path: &'a str,
    /// Variable bindings visible to this step.
    pub scope: &'a Scope,
    /// Root element reference for this step, after `rootMode` is applied;
    /// `None` targets the whole document.
    pub root: Option<String>,
    /// Browser context this step targets.
    pub window: WindowTarget,
}

impl<'a> BrickContext<'a> {
    /// The platform capability surface.
    pub fn platform(&self) -> &dyn PlatformProtocol {
        self.engine.platform()
    }

    /// The mod component this run belongs to.
    pub fn mod_component_id(&self) -> &ModComponentId {
        &self.shared.mod_component_id
    }

    /// Whether the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancellation.is_cancelled()
    }

    /// Error out if the run has been cancelled.
    pub fn check_cancelled(&self) -> Result<(), BrickError> {
        if self.is_cancelled() {
            Err(BrickError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a sub-pipeline config property.
    ///
    /// The nested pipeline gets a forked child scope seeded with `bindings`
    /// (loop variables, error bindings); its `outputKey` writes never leak
    /// back into this step's scope. The call branch is extended with
    /// `(branch_key, counter)` so trace records distinguish iterations.
    pub async fn run_sub_pipeline(
        &self,
        pipeline: &BrickPipeline,
        branch_key: &str,
        counter: u64,
        bindings: Vec<(String, Value)>,
    ) -> Result<Value, BrickError> {
        let mut child = self.scope.child();
        for (name, value) in bindings {
            child.set(name, value);
        }
        let mut branches = self.branches.to_vec();
        branches.push(Branch::new(branch_key, counter));
        let prefix = format!("{}.config.{}.__value__", self.path, branch_key);
        self.engine
            .run_segment(pipeline, &mut child, self.shared, &branches, &prefix)
            .await
            .map_err(BrickError::from)
    }
}
