//! The platform protocol: host capabilities the engine dispatches into.
//!
//! The runtime is a library embedded in a host (content script, background
//! worker, headless harness). Everything that touches the outside world —
//! network, sandboxed JS, shared state, panels, trace storage — goes
//! through this trait. The runtime calls these capabilities; it does not
//! implement them, apart from the standard template renderer that
//! implementations are expected to delegate to.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use brickflow_types::{ModComponentId, TemplateEngine, TraceEntry, TraceExit};

use crate::panels::PanelEntry;
use crate::templates::TemplateError;

/// Declarative HTTP request forwarded to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_owned()
}

impl RequestConfig {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

/// Host capabilities available to bricks and the engine.
///
/// Capability calls return `anyhow::Result` — the host's failures are
/// opaque to the runtime and get wrapped at the step boundary. Template
/// calls return typed [`TemplateError`]s so template failures stay
/// distinguishable from brick-logic errors.
#[async_trait]
pub trait PlatformProtocol: Send + Sync {
    /// Perform an HTTP request.
    async fn request(&self, config: RequestConfig) -> anyhow::Result<Value>;

    /// Show a form and resolve with the submitted values.
    async fn form(&self, definition: Value) -> anyhow::Result<Value>;

    /// Run untrusted JavaScript in the host sandbox.
    async fn run_sandboxed_javascript(&self, code: &str, data: Value) -> anyhow::Result<Value>;

    /// Read shared state for a mod component.
    async fn get_state(
        &self,
        mod_component_id: &ModComponentId,
        namespace: &str,
    ) -> anyhow::Result<Value>;

    /// Merge values into shared state, returning the updated state.
    async fn set_state(
        &self,
        mod_component_id: &ModComponentId,
        namespace: &str,
        values: Value,
    ) -> anyhow::Result<Value>;

    /// Render a template against an `@`-keyed context.
    async fn render_template(
        &self,
        engine: TemplateEngine,
        template: &str,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError>;

    /// Check a template for syntax errors (edit-time validation).
    async fn validate_template(
        &self,
        engine: TemplateEngine,
        template: &str,
    ) -> Result<(), TemplateError>;

    /// Display a renderer payload in a host panel.
    async fn show_panel(&self, entry: PanelEntry) -> anyhow::Result<()>;

    /// Record the start of a brick invocation.
    async fn trace_enter(&self, entry: TraceEntry);

    /// Record the end of a brick invocation.
    async fn trace_exit(&self, exit: TraceExit);
}
