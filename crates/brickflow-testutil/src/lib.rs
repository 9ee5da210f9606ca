//! Shared test scaffolding for brickflow.
//!
//! Provides a recording [`TestPlatform`], canned bricks with predictable
//! behavior, and a JSON dot-path resolver used by traversal tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use brickflow_runtime::brick::{Brick, BrickError, BrickInput, BrickKind};
use brickflow_runtime::engine::BrickContext;
use brickflow_runtime::panels::{PanelEntry, PanelSession};
use brickflow_runtime::platform::{PlatformProtocol, RequestConfig};
use brickflow_runtime::templates::{TemplateError, TemplateRenderer};
use brickflow_runtime::trace::{TraceRecord, TraceSession};
use brickflow_types::{
    InputSchema, ModComponentId, RegistryId, TemplateEngine, TraceEntry, TraceExit,
};

/// Install a test tracing subscriber honoring `RUST_LOG`; repeated calls
/// are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Platform fake: renders templates with the standard renderer, keeps
/// state in memory, records every request/form/sandbox call, and collects
/// traces and panels in session stores.
#[derive(Default)]
pub struct TestPlatform {
    renderer: TemplateRenderer,
    traces: TraceSession,
    panels: PanelSession,
    state: Mutex<HashMap<(ModComponentId, String), Value>>,
    requests: Mutex<Vec<RequestConfig>>,
    request_responses: Mutex<Vec<Value>>,
    sandbox_calls: Mutex<Vec<(String, Value)>>,
    form_responses: Mutex<Vec<Value>>,
}

impl TestPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next `request` call. With no queued
    /// responses, requests echo `{"url": ...}`.
    pub fn push_request_response(&self, response: Value) {
        self.request_responses.lock().push(response);
    }

    /// Queue a response for the next `form` call.
    pub fn push_form_response(&self, response: Value) {
        self.form_responses.lock().push(response);
    }

    /// Requests performed so far.
    pub fn requests(&self) -> Vec<RequestConfig> {
        self.requests.lock().clone()
    }

    /// Sandbox invocations performed so far.
    pub fn sandbox_calls(&self) -> Vec<(String, Value)> {
        self.sandbox_calls.lock().clone()
    }

    /// Trace records collected so far.
    pub fn trace_records(&self) -> Vec<TraceRecord> {
        self.traces.records()
    }

    /// The trace session itself, for clear/filter assertions.
    pub fn traces(&self) -> &TraceSession {
        &self.traces
    }

    /// Panels shown so far.
    pub fn panels(&self) -> Vec<PanelEntry> {
        self.panels.entries()
    }
}

#[async_trait]
impl PlatformProtocol for TestPlatform {
    async fn request(&self, config: RequestConfig) -> anyhow::Result<Value> {
        let url = config.url.clone();
        self.requests.lock().push(config);
        let mut responses = self.request_responses.lock();
        if responses.is_empty() {
            Ok(json!({"url": url}))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn form(&self, _definition: Value) -> anyhow::Result<Value> {
        let mut responses = self.form_responses.lock();
        if responses.is_empty() {
            Ok(json!({}))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn run_sandboxed_javascript(&self, code: &str, data: Value) -> anyhow::Result<Value> {
        self.sandbox_calls.lock().push((code.to_owned(), data.clone()));
        Ok(json!({"code": code, "data": data}))
    }

    async fn get_state(
        &self,
        mod_component_id: &ModComponentId,
        namespace: &str,
    ) -> anyhow::Result<Value> {
        let state = self.state.lock();
        Ok(state
            .get(&(mod_component_id.clone(), namespace.to_owned()))
            .cloned()
            .unwrap_or_else(|| json!({})))
    }

    async fn set_state(
        &self,
        mod_component_id: &ModComponentId,
        namespace: &str,
        values: Value,
    ) -> anyhow::Result<Value> {
        let mut state = self.state.lock();
        let key = (mod_component_id.clone(), namespace.to_owned());
        let entry = state.entry(key).or_insert_with(|| json!({}));
        if let (Value::Object(existing), Value::Object(incoming)) = (&mut *entry, values) {
            for (k, v) in incoming {
                existing.insert(k, v);
            }
        }
        Ok(entry.clone())
    }

    async fn render_template(
        &self,
        engine: TemplateEngine,
        template: &str,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        self.renderer.render(engine, template, context)
    }

    async fn validate_template(
        &self,
        engine: TemplateEngine,
        template: &str,
    ) -> Result<(), TemplateError> {
        self.renderer.validate(engine, template)
    }

    async fn show_panel(&self, entry: PanelEntry) -> anyhow::Result<()> {
        self.panels.upsert(entry);
        Ok(())
    }

    async fn trace_enter(&self, entry: TraceEntry) {
        self.traces.enter(entry);
    }

    async fn trace_exit(&self, exit: TraceExit) {
        self.traces.exit(exit);
    }
}

/// Transform brick that echoes its `message` argument as output.
pub struct EchoBrick {
    id: RegistryId,
}

impl EchoBrick {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("test", "echo"),
        }
    }
}

impl Default for EchoBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for EchoBrick {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property("message", InputSchema::string())
            .require("message")
    }

    async fn run(
        &self,
        input: BrickInput,
        _ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        Ok(input.get("message").cloned().unwrap_or(Value::Null))
    }
}

/// Brick that always fails with a business-rule error.
pub struct FailBrick {
    id: RegistryId,
}

impl FailBrick {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("test", "fail"),
        }
    }
}

impl Default for FailBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for FailBrick {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object().property("message", InputSchema::string())
    }

    async fn run(
        &self,
        input: BrickInput,
        _ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let message = input.get_str("message").unwrap_or("no elements found");
        Err(BrickError::business(message))
    }
}

/// Transform brick that sleeps before completing, for cancellation tests.
pub struct SlowBrick {
    id: RegistryId,
    delay: std::time::Duration,
}

impl SlowBrick {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            id: RegistryId::from_parts("test", "slow"),
            delay,
        }
    }
}

#[async_trait]
impl Brick for SlowBrick {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
    }

    async fn run(
        &self,
        _input: BrickInput,
        _ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!("done"))
    }
}

/// Transform brick that records every input it receives; output is the
/// input object. Useful for scope-isolation assertions.
#[derive(Clone)]
pub struct RecordingBrick {
    id: RegistryId,
    seen: Arc<Mutex<Vec<Map<String, Value>>>>,
}

impl RecordingBrick {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("test", "recording"),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Inputs received so far, in call order.
    pub fn seen(&self) -> Vec<Map<String, Value>> {
        self.seen.lock().clone()
    }
}

impl Default for RecordingBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for RecordingBrick {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object().additional(InputSchema::default())
    }

    async fn run(
        &self,
        input: BrickInput,
        _ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        self.seen.lock().push(input.args.clone());
        Ok(Value::Object(input.args))
    }
}

/// Resolve a dot-path (as produced by the pipeline walker) against a JSON
/// value: `"1.config.body.__value__.0"` walks object keys and array
/// indices.
pub fn resolve_json_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
