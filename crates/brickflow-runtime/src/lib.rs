//! brickflow-runtime: the brick pipeline interpreter.
//!
//! This crate provides:
//!
//! - **Lexer / Parser**: template tag tokenization and free-variable
//!   extraction with position-indexed lookup
//! - **Scope**: layered variable frames with dotted-path resolution
//! - **Templates**: nunjucks- and mustache-style rendering of `@`-sigiled
//!   variable references
//! - **Eval**: expression-to-value resolution against a scope
//! - **Walker**: deterministic depth-first pipeline traversal, including
//!   document renderer element trees
//! - **Upgrade**: v1/v2 → v3 schema migration of legacy string configs
//! - **Registry / Brick / Platform**: the external collaborator boundaries
//! - **Engine**: sequential async dispatch with tracing and cancellation
//! - **Bricks**: the built-in control-flow, data, effect, and renderer
//!   bricks

pub mod brick;
pub mod bricks;
pub mod engine;
pub mod eval;
pub mod lexer;
pub mod panels;
pub mod parser;
pub mod platform;
pub mod registry;
pub mod scope;
pub mod templates;
pub mod trace;
pub mod upgrade;
pub mod walker;

pub use brick::{Brick, BrickError, BrickInput, BrickKind};
pub use engine::{BrickContext, PipelineEngine, PipelineError, RunOptions};
pub use eval::{is_truthy, resolve_expression};
pub use panels::{PanelEntry, PanelSession};
pub use parser::{parse_template, parse_template_variables, variable_at_position, VariableGraph};
pub use platform::{PlatformProtocol, RequestConfig};
pub use registry::{BrickRegistry, InMemoryRegistry, RegistryError};
pub use scope::Scope;
pub use templates::{TemplateError, TemplateRenderer};
pub use trace::{TraceRecord, TraceSession};
pub use upgrade::{
    load_pipeline, upgrade_pipeline_to_v3, upgrade_pipeline_with, upgrade_string_to_expression,
    UpgradeError, UpgradeOverrides,
};
pub use walker::{for_each_block, traverse_pipeline, BlockVisit, PipelineVisitor};
