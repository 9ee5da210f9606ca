//! Generic pipeline traversal.
//!
//! Visits every `BrickConfig` in a pipeline in deterministic depth-first
//! order: array order at every level, with sub-pipelines visited
//! immediately after their owning block and before following siblings.
//! Sub-pipelines are discovered two ways: any config property whose value
//! is a pipeline expression, and the special-cased document renderer body
//! (see [`document`]). Traversal never mutates its input.

mod document;

pub use document::DOCUMENT_BRICK_ID;

use brickflow_types::{BrickConfig, Expression, InstanceId};

/// Context passed to the visitor for each visited block.
#[derive(Debug)]
pub struct BlockVisit<'a> {
    /// The visited block.
    pub block: &'a BrickConfig,
    /// Index of the block within its containing pipeline.
    pub index: usize,
    /// Dot-path locating the block within the root pipeline, e.g. `"0"` or
    /// `"0.config.body.__value__.1"`.
    pub path: String,
    /// Dot-path of the containing pipeline (empty at the root).
    pub pipeline_path: String,
    /// The containing pipeline array.
    pub pipeline: &'a [BrickConfig],
    /// `instanceId` of the nearest ancestor block owning this pipeline as a
    /// sub-pipeline; `None` at the root.
    pub parent_instance_id: Option<&'a InstanceId>,
}

/// Callbacks invoked during traversal.
pub trait PipelineVisitor {
    /// Called for every block, in traversal order.
    fn visit_block(&mut self, visit: &BlockVisit<'_>);

    /// Called before descending into a discovered sub-pipeline; return
    /// `false` to skip it entirely.
    fn enter_sub_pipeline(&mut self, parent: &BrickConfig, property: &str) -> bool {
        let _ = (parent, property);
        true
    }
}

/// Traverse a pipeline, invoking the visitor for every block.
pub fn traverse_pipeline(pipeline: &[BrickConfig], visitor: &mut dyn PipelineVisitor) {
    walk(pipeline, "", None, visitor);
}

/// Closure-based traversal for callers that only need `visit_block`.
pub fn for_each_block<F>(pipeline: &[BrickConfig], visit: F)
where
    F: FnMut(&BlockVisit<'_>),
{
    struct FnVisitor<F>(F);

    impl<F: FnMut(&BlockVisit<'_>)> PipelineVisitor for FnVisitor<F> {
        fn visit_block(&mut self, visit: &BlockVisit<'_>) {
            (self.0)(visit);
        }
    }

    traverse_pipeline(pipeline, &mut FnVisitor(visit));
}

pub(crate) fn walk(
    pipeline: &[BrickConfig],
    pipeline_path: &str,
    parent_instance_id: Option<&InstanceId>,
    visitor: &mut dyn PipelineVisitor,
) {
    for (index, block) in pipeline.iter().enumerate() {
        let path = join_index(pipeline_path, index);

        visitor.visit_block(&BlockVisit {
            block,
            index,
            path: path.clone(),
            pipeline_path: pipeline_path.to_owned(),
            pipeline,
            parent_instance_id,
        });

        // Generic pipeline-valued config properties, in deterministic
        // (sorted) property order.
        for (property, value) in &block.config {
            if let Expression::Pipeline(sub) = value {
                if visitor.enter_sub_pipeline(block, property) {
                    let sub_path = format!("{path}.config.{property}.__value__");
                    walk(sub, &sub_path, block.instance_id.as_ref(), visitor);
                }
            }
        }

        // Document renderer bodies embed pipelines inside element trees.
        if block.id.as_str() == DOCUMENT_BRICK_ID {
            document::walk_body(block, &path, visitor);
        }
    }
}

fn join_index(pipeline_path: &str, index: usize) -> String {
    if pipeline_path.is_empty() {
        index.to_string()
    } else {
        format!("{pipeline_path}.{index}")
    }
}
