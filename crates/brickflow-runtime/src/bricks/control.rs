//! Control-flow bricks: branching, loops, and error handling.

use async_trait::async_trait;
use serde_json::{json, Value};

use brickflow_types::{InputSchema, RegistryId};

use crate::brick::{Brick, BrickError, BrickInput, BrickKind};
use crate::engine::BrickContext;
use crate::eval::is_truthy;

/// `@core/if-else` — run one of two sub-pipelines based on a condition.
pub struct IfElse {
    id: RegistryId,
}

impl IfElse {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "if-else"),
        }
    }
}

impl Default for IfElse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for IfElse {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property(
                "condition",
                InputSchema::default().describe("Condition to test"),
            )
            .property("if", InputSchema::pipeline())
            .property("else", InputSchema::pipeline())
            .require("condition")
            .require("if")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let condition = input.get("condition").is_some_and(is_truthy);
        if condition {
            let pipeline = input.require_pipeline("if")?;
            ctx.run_sub_pipeline(pipeline, "if", 0, Vec::new()).await
        } else if let Some(pipeline) = input.pipeline("else") {
            ctx.run_sub_pipeline(pipeline, "else", 0, Vec::new()).await
        } else {
            Ok(Value::Null)
        }
    }
}

/// `@core/for-each` — run a sub-pipeline once per element, binding each
/// element under `@elementKey` (default `@element`).
pub struct ForEach {
    id: RegistryId,
}

impl ForEach {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "for-each"),
        }
    }
}

impl Default for ForEach {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for ForEach {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property(
                "elements",
                InputSchema::array(InputSchema::default()).describe("Elements to iterate over"),
            )
            .property("body", InputSchema::pipeline())
            .property(
                "elementKey",
                InputSchema::string().describe("Loop variable name, without the @ sigil"),
            )
            .require("elements")
            .require("body")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let elements = match input.get("elements") {
            Some(Value::Array(elements)) => elements.clone(),
            Some(other) => {
                return Err(BrickError::InvalidInput(format!(
                    "elements must be an array, got {other}"
                )))
            }
            None => return Err(BrickError::InvalidInput("missing elements".to_owned())),
        };
        let body = input.require_pipeline("body")?;
        let key = input.get_str("elementKey").unwrap_or("element");

        let mut last = Value::Null;
        for (counter, element) in elements.into_iter().enumerate() {
            ctx.check_cancelled()?;
            last = ctx
                .run_sub_pipeline(
                    body,
                    "body",
                    counter as u64,
                    vec![(format!("@{key}"), element)],
                )
                .await?;
        }
        Ok(last)
    }
}

/// `@core/try-except` — run a sub-pipeline, routing step failures to an
/// error-handling sub-pipeline instead of aborting the run.
pub struct TryExcept {
    id: RegistryId,
}

impl TryExcept {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "try-except"),
        }
    }
}

impl Default for TryExcept {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for TryExcept {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property("try", InputSchema::pipeline())
            .property("except", InputSchema::pipeline())
            .property(
                "errorKey",
                InputSchema::string().describe("Error binding name, without the @ sigil"),
            )
            .require("try")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let attempt = input.require_pipeline("try")?;
        match ctx.run_sub_pipeline(attempt, "try", 0, Vec::new()).await {
            Ok(value) => Ok(value),
            // Cancellation is a signal, not an error to handle.
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                let Some(handler) = input.pipeline("except") else {
                    return Ok(Value::Null);
                };
                let key = input.get_str("errorKey").unwrap_or("error");
                let binding = json!({"message": err.to_string()});
                ctx.run_sub_pipeline(handler, "except", 0, vec![(format!("@{key}"), binding)])
                    .await
            }
        }
    }
}
