//! brickflow-types: the wire-format data model for brick pipelines.
//!
//! This crate provides:
//!
//! - **Identifiers**: registry ids (`@scope/name`) and opaque correlation ids
//! - **Expression**: the tagged value union (literal / var / template / pipeline)
//! - **Config**: `BrickConfig` steps and `BrickPipeline` sequences
//! - **Schema**: the JSON-Schema subset that describes brick inputs
//! - **Document**: renderer element trees with embedded sub-pipelines
//! - **Trace**: immutable records of brick invocations

pub mod config;
pub mod document;
pub mod expression;
pub mod id;
pub mod schema;
pub mod trace;

pub use config::{ApiVersion, BrickConfig, BrickPipeline, RootMode, WindowTarget};
pub use document::ElementNode;
pub use expression::{Expression, TemplateEngine};
pub use id::{IdError, InstanceId, ModComponentId, RegistryId};
pub use schema::{AdditionalProperties, InputSchema, SchemaItems, FORMAT_SELECTOR};
pub use trace::{Branch, TraceEntry, TraceExit, TraceOutcome};
