//! The pipeline execution engine.
//!
//! Dispatches the steps of a pipeline sequentially: each step's brick is
//! resolved through the registry, its config is resolved against the
//! current scope, the brick runs through the platform, and its output is
//! bound under the step's `outputKey` for later steps. Sub-pipelines run
//! in forked child scopes, so bindings never leak across sibling branches,
//! and concurrent runs share nothing mutable.
//!
//! Cancellation is cooperative: the token is checked between steps and
//! raced against the in-flight brick call. A cancelled run records a
//! trace-exit marked cancelled for the step in flight, records nothing for
//! steps that never started, and surfaces [`PipelineError::Cancelled`]
//! unwrapped.

mod context;

pub use context::BrickContext;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use brickflow_types::{
    Branch, BrickConfig, Expression, InstanceId, ModComponentId, RegistryId, RootMode, TraceEntry,
    TraceExit, TraceOutcome,
};

use crate::brick::{BrickError, BrickInput, BrickKind};
use crate::eval::{embedded_expression, is_truthy};
use crate::panels::PanelEntry;
use crate::platform::PlatformProtocol;
use crate::registry::{BrickRegistry, RegistryError};
use crate::scope::Scope;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pipeline run failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step failed; carries the context needed to locate it.
    #[error("step {path} ({brick}) failed: {source}")]
    Step {
        brick: RegistryId,
        instance_id: Option<InstanceId>,
        path: String,
        #[source]
        source: BrickError,
    },

    /// The run was cancelled. Never wrapped, never telemetry-worthy.
    #[error("pipeline run cancelled")]
    Cancelled,

    /// A step's brick id was not found in the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// The business-rule message, if this wraps an expected failure.
    pub fn business_message(&self) -> Option<&str> {
        match self {
            PipelineError::Step {
                source: BrickError::Business(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}

/// Options for one pipeline run.
pub struct RunOptions {
    /// The mod component this run belongs to (trace/state key).
    pub mod_component_id: ModComponentId,
    /// Initial variable scope (reader output, mod options, `@input`).
    pub scope: Scope,
    /// Root element reference inherited from the triggering context.
    pub root: Option<String>,
    /// Cancellation token; checked between steps and raced against each
    /// brick call.
    pub cancellation: CancellationToken,
}

impl RunOptions {
    pub fn new(mod_component_id: impl Into<ModComponentId>) -> Self {
        Self {
            mod_component_id: mod_component_id.into(),
            scope: Scope::new(),
            root: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// State shared by every step of one run.
pub(crate) struct RunShared {
    pub mod_component_id: ModComponentId,
    pub root: Option<String>,
    pub cancellation: CancellationToken,
}

/// The pipeline interpreter.
pub struct PipelineEngine {
    registry: Arc<dyn BrickRegistry>,
    platform: Arc<dyn PlatformProtocol>,
}

impl PipelineEngine {
    pub fn new(registry: Arc<dyn BrickRegistry>, platform: Arc<dyn PlatformProtocol>) -> Self {
        Self { registry, platform }
    }

    /// The platform this engine dispatches into.
    pub fn platform(&self) -> &dyn PlatformProtocol {
        &*self.platform
    }

    /// The registry this engine resolves bricks from.
    pub fn registry(&self) -> &dyn BrickRegistry {
        &*self.registry
    }

    /// Run a pipeline to completion.
    ///
    /// Returns the output of the last executed non-effect step, or null
    /// for an empty pipeline.
    pub async fn run(
        &self,
        pipeline: &[BrickConfig],
        options: RunOptions,
    ) -> Result<Value, PipelineError> {
        let RunOptions {
            mod_component_id,
            mut scope,
            root,
            cancellation,
        } = options;
        debug!(component = %mod_component_id, steps = pipeline.len(), "starting pipeline run");
        let shared = RunShared {
            mod_component_id,
            root,
            cancellation,
        };
        self.run_segment(pipeline, &mut scope, &shared, &[], "").await
    }

    /// Run one pipeline segment (the root pipeline or a sub-pipeline).
    pub(crate) fn run_segment<'a>(
        &'a self,
        pipeline: &'a [BrickConfig],
        scope: &'a mut Scope,
        shared: &'a RunShared,
        branches: &'a [Branch],
        path_prefix: &'a str,
    ) -> BoxFuture<'a, Result<Value, PipelineError>> {
        Box::pin(async move {
            let mut last_output = Value::Null;

            for (index, block) in pipeline.iter().enumerate() {
                if shared.cancellation.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }

                let path = if path_prefix.is_empty() {
                    index.to_string()
                } else {
                    format!("{path_prefix}.{index}")
                };

                let brick = self.registry.lookup(&block.id).await?;

                if let Some(condition) = &block.condition {
                    let value = self
                        .resolve(condition, scope)
                        .await
                        .map_err(|source| step_error(block, &path, source))?;
                    if !is_truthy(&value) {
                        debug!(brick = %block.id, %path, "condition falsy; skipping step");
                        continue;
                    }
                }

                let mut input = BrickInput::default();
                for (property, value) in &block.config {
                    match value {
                        Expression::Pipeline(sub) => {
                            input.pipelines.insert(property.clone(), sub.clone());
                        }
                        other => {
                            let resolved = self
                                .resolve(other, scope)
                                .await
                                .map_err(|source| step_error(block, &path, source))?;
                            input.args.insert(property.clone(), resolved);
                        }
                    }
                }

                let root = match block.root_mode.unwrap_or_default() {
                    RootMode::Inherit => shared.root.clone(),
                    RootMode::Document => None,
                };

                if let Some(instance_id) = &block.instance_id {
                    self.platform
                        .trace_enter(TraceEntry {
                            mod_component_id: shared.mod_component_id.clone(),
                            instance_id: instance_id.clone(),
                            brick_id: block.id.clone(),
                            call_branches: branches.to_vec(),
                            timestamp: Utc::now(),
                            input: Value::Object(input.args.clone()),
                        })
                        .await;
                }

                debug!(brick = %block.id, %path, kind = ?brick.kind(), "dispatching brick");

                let mut ctx = BrickContext {
                    engine: self,
                    shared,
                    branches,
                    path: &path,
                    scope: &*scope,
                    root,
                    window: block.window.unwrap_or_default(),
                };

                let outcome = tokio::select! {
                    _ = shared.cancellation.cancelled() => None,
                    result = brick.run(input, &mut ctx) => Some(result),
                };

                match outcome {
                    None => {
                        // Cancelled while the brick was in flight.
                        self.trace_exit(block, shared, branches, TraceOutcome::Cancelled)
                            .await;
                        return Err(PipelineError::Cancelled);
                    }
                    Some(Ok(value)) => {
                        let output = match brick.kind() {
                            BrickKind::Effect => Value::Null,
                            BrickKind::Renderer => {
                                let mut entry = PanelEntry::new(
                                    shared.mod_component_id.clone(),
                                    value.clone(),
                                );
                                if let Some(label) = &block.label {
                                    entry = entry.with_heading(label.clone());
                                }
                                if let Err(err) = self.platform.show_panel(entry).await {
                                    let err = BrickError::Platform(err);
                                    self.trace_exit(
                                        block,
                                        shared,
                                        branches,
                                        TraceOutcome::Error(err.to_string()),
                                    )
                                    .await;
                                    return Err(step_error(block, &path, err));
                                }
                                value
                            }
                            BrickKind::Reader | BrickKind::Transform => value,
                        };
                        self.trace_exit(
                            block,
                            shared,
                            branches,
                            TraceOutcome::Output(output.clone()),
                        )
                        .await;
                        if let Some(key) = &block.output_key {
                            scope.set(format!("@{key}"), output.clone());
                        }
                        last_output = output;
                    }
                    Some(Err(err)) if err.is_cancelled() => {
                        self.trace_exit(block, shared, branches, TraceOutcome::Cancelled)
                            .await;
                        return Err(PipelineError::Cancelled);
                    }
                    Some(Err(err)) => {
                        self.trace_exit(
                            block,
                            shared,
                            branches,
                            TraceOutcome::Error(err.to_string()),
                        )
                        .await;
                        return Err(step_error(block, &path, err));
                    }
                }
            }

            Ok(last_output)
        })
    }

    async fn trace_exit(
        &self,
        block: &BrickConfig,
        shared: &RunShared,
        branches: &[Branch],
        outcome: TraceOutcome,
    ) {
        if let Some(instance_id) = &block.instance_id {
            self.platform
                .trace_exit(TraceExit {
                    mod_component_id: shared.mod_component_id.clone(),
                    instance_id: instance_id.clone(),
                    call_branches: branches.to_vec(),
                    timestamp: Utc::now(),
                    outcome,
                })
                .await;
        }
    }

    /// Resolve a non-pipeline expression against the scope, rendering
    /// templates through the platform capability.
    async fn resolve(&self, expr: &Expression, scope: &Scope) -> Result<Value, BrickError> {
        match expr {
            Expression::Literal(value) => self.resolve_json(value, scope).await,
            Expression::Var(path) => Ok(scope.resolve_path(path).unwrap_or(Value::Null)),
            Expression::Template { engine, template } => {
                let context = scope.flatten();
                let rendered = self
                    .platform
                    .render_template(*engine, template, &context)
                    .await?;
                Ok(Value::String(rendered))
            }
            // Pipelines are control flow; the engine recurses via
            // BrickContext::run_sub_pipeline instead of resolving them.
            Expression::Pipeline(_) => Ok(Value::Null),
        }
    }

    /// Resolve expression objects embedded inside a literal JSON tree.
    fn resolve_json<'a>(
        &'a self,
        value: &'a Value,
        scope: &'a Scope,
    ) -> BoxFuture<'a, Result<Value, BrickError>> {
        Box::pin(async move {
            match value {
                Value::Object(map) => {
                    if let Some(expr) = embedded_expression(map) {
                        return self.resolve(&expr, scope).await;
                    }
                    let mut resolved = Map::with_capacity(map.len());
                    for (key, member) in map {
                        resolved.insert(key.clone(), self.resolve_json(member, scope).await?);
                    }
                    Ok(Value::Object(resolved))
                }
                Value::Array(items) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(self.resolve_json(item, scope).await?);
                    }
                    Ok(Value::Array(resolved))
                }
                other => Ok(other.clone()),
            }
        })
    }
}

fn step_error(block: &BrickConfig, path: &str, source: BrickError) -> PipelineError {
    PipelineError::Step {
        brick: block.id.clone(),
        instance_id: block.instance_id.clone(),
        path: path.to_owned(),
        source,
    }
}
