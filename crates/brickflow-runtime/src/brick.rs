//! The brick trait: one reusable unit of automation logic.
//!
//! Capabilities form a closed set — [`BrickKind`] — and every brick exposes
//! a single `run` entry point. The engine branches on the declared kind
//! (effects discard output, renderer output is routed to a panel); it never
//! probes for capability methods structurally.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use brickflow_types::{BrickPipeline, InputSchema, RegistryId};

use crate::engine::{BrickContext, PipelineError};
use crate::templates::TemplateError;

/// The closed set of brick capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrickKind {
    /// Reads data from the host environment (page, element, state).
    Reader,
    /// Produces an output value from its inputs.
    Transform,
    /// Mutates the host environment; produces no output.
    Effect,
    /// Produces a payload displayed in a host panel.
    Renderer,
}

/// Brick execution failure.
#[derive(Debug, Error)]
pub enum BrickError {
    /// A config template failed to parse or render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// An expected, user-actionable failure (e.g. "no elements found").
    /// Shown as a message, never reported to telemetry as a crash.
    #[error("{0}")]
    Business(String),

    /// The resolved input violated the brick's contract.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A platform capability call failed.
    #[error("platform call failed: {0}")]
    Platform(#[from] anyhow::Error),

    /// A nested pipeline run failed (control-flow bricks).
    #[error(transparent)]
    SubPipeline(Box<PipelineError>),

    /// The run was cancelled while this brick was in flight.
    #[error("brick run cancelled")]
    Cancelled,
}

impl BrickError {
    /// An expected business-rule failure.
    pub fn business(message: impl Into<String>) -> Self {
        BrickError::Business(message.into())
    }

    /// Whether this error is (or wraps) a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            BrickError::Cancelled => true,
            BrickError::SubPipeline(inner) => matches!(**inner, PipelineError::Cancelled),
            _ => false,
        }
    }
}

impl From<PipelineError> for BrickError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Cancelled => BrickError::Cancelled,
            other => BrickError::SubPipeline(Box::new(other)),
        }
    }
}

/// Resolved input handed to a brick: plain values plus any pipeline-valued
/// properties (kept unresolved for control-flow bricks to run).
#[derive(Debug, Clone, Default)]
pub struct BrickInput {
    /// Resolved config values by property name.
    pub args: Map<String, Value>,
    /// Unresolved sub-pipelines by property name.
    pub pipelines: BTreeMap<String, BrickPipeline>,
}

impl BrickInput {
    /// Get a resolved argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Get a resolved argument as a string slice.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }

    /// Get a required string argument.
    pub fn require_str(&self, name: &str) -> Result<&str, BrickError> {
        self.get_str(name)
            .ok_or_else(|| BrickError::InvalidInput(format!("missing required property {name:?}")))
    }

    /// Get a sub-pipeline property.
    pub fn pipeline(&self, name: &str) -> Option<&BrickPipeline> {
        self.pipelines.get(name)
    }

    /// Get a required sub-pipeline property.
    pub fn require_pipeline(&self, name: &str) -> Result<&BrickPipeline, BrickError> {
        self.pipeline(name)
            .ok_or_else(|| BrickError::InvalidInput(format!("missing required pipeline {name:?}")))
    }
}

/// A single reusable unit of automation logic, identified by registry id.
#[async_trait]
pub trait Brick: Send + Sync {
    /// The brick's registry id.
    fn id(&self) -> &RegistryId;

    /// The brick's capability.
    fn kind(&self) -> BrickKind;

    /// The brick's declared input schema.
    fn schema(&self) -> InputSchema;

    /// Execute the brick with resolved input.
    async fn run(&self, input: BrickInput, ctx: &mut BrickContext<'_>) -> Result<Value, BrickError>;
}
