//! Data bricks: readers and transforms over platform capabilities.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use brickflow_types::{InputSchema, RegistryId};

use crate::brick::{Brick, BrickError, BrickInput, BrickKind};
use crate::engine::BrickContext;
use crate::platform::RequestConfig;

/// `@core/identity` — return the resolved input unchanged.
///
/// Useful for materializing a computed object under an `outputKey`.
pub struct Identity {
    id: RegistryId,
}

impl Identity {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "identity"),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for Identity {
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
        Ok(Value::Object(input.args))
    }
}

/// `@core/http-request` — perform an HTTP request through the platform.
pub struct HttpRequest {
    id: RegistryId,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "http-request"),
        }
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for HttpRequest {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property("url", InputSchema::string().describe("Request URL"))
            .property("method", InputSchema::string().describe("HTTP method"))
            .property(
                "headers",
                InputSchema::object().additional(InputSchema::string()),
            )
            .property("data", InputSchema::default().describe("Request body"))
            .require("url")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let url = input.require_str("url")?.to_owned();
        let method = input.get_str("method").unwrap_or("GET").to_owned();
        let headers: BTreeMap<String, String> = match input.get("headers") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
                .collect(),
            _ => BTreeMap::new(),
        };
        let config = RequestConfig {
            url,
            method,
            headers,
            body: input.get("data").cloned(),
        };
        Ok(ctx.platform().request(config).await?)
    }
}

/// `@core/run-js` — run user JavaScript in the host sandbox.
pub struct RunJavascript {
    id: RegistryId,
}

impl RunJavascript {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "run-js"),
        }
    }
}

impl Default for RunJavascript {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for RunJavascript {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property(
                "function",
                InputSchema::string().describe("Function body to run in the sandbox"),
            )
            .property("arguments", InputSchema::object().additional(InputSchema::default()))
            .require("function")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let code = input.require_str("function")?;
        let data = input.get("arguments").cloned().unwrap_or(Value::Null);
        Ok(ctx.platform().run_sandboxed_javascript(code, data).await?)
    }
}

/// `@core/form` — show a host form and return the submitted values.
pub struct FormBrick {
    id: RegistryId,
}

impl FormBrick {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "form"),
        }
    }
}

impl Default for FormBrick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for FormBrick {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property(
                "schema",
                InputSchema::object().describe("Form field definitions"),
            )
            .require("schema")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let definition = input
            .get("schema")
            .cloned()
            .ok_or_else(|| BrickError::InvalidInput("missing required property \"schema\"".into()))?;
        Ok(ctx.platform().form(definition).await?)
    }
}

/// `@core/get-state` — read shared state for the current mod component.
pub struct GetState {
    id: RegistryId,
}

impl GetState {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "get-state"),
        }
    }
}

impl Default for GetState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for GetState {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Reader
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object().property(
            "namespace",
            InputSchema::string().describe("State namespace"),
        )
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let namespace = input.get_str("namespace").unwrap_or("mod");
        let component = ctx.mod_component_id().clone();
        Ok(ctx.platform().get_state(&component, namespace).await?)
    }
}

/// `@core/set-state` — merge values into shared state, returning the
/// updated state.
pub struct SetState {
    id: RegistryId,
}

impl SetState {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "set-state"),
        }
    }
}

impl Default for SetState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for SetState {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property("data", InputSchema::object().additional(InputSchema::default()))
            .property(
                "namespace",
                InputSchema::string().describe("State namespace"),
            )
            .require("data")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let data = input
            .get("data")
            .cloned()
            .ok_or_else(|| BrickError::InvalidInput("missing required property \"data\"".into()))?;
        let namespace = input.get_str("namespace").unwrap_or("mod");
        let component = ctx.mod_component_id().clone();
        Ok(ctx.platform().set_state(&component, namespace, data).await?)
    }
}
