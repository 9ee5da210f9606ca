//! Renderer bricks.

use async_trait::async_trait;
use serde_json::{json, Value};

use brickflow_types::{InputSchema, RegistryId};

use crate::brick::{Brick, BrickError, BrickInput, BrickKind};
use crate::engine::BrickContext;
use crate::walker::DOCUMENT_BRICK_ID;

/// `@core/document` — render a declarative element tree in a panel.
///
/// The body is an element tree; embedded variable and template expressions
/// arrive already resolved, while embedded sub-pipelines stay raw and are
/// run by the host on interaction (button clicks, list items). The tree
/// walker special-cases this brick's body when traversing pipelines.
pub struct DocumentRenderer {
    id: RegistryId,
}

impl DocumentRenderer {
    pub fn new() -> Self {
        Self {
            // Kept in sync with the walker's special case by construction.
            id: RegistryId::from_parts("core", "document"),
        }
    }
}

impl Default for DocumentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for DocumentRenderer {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Renderer
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property(
                "body",
                InputSchema::array(InputSchema::object()).describe("Document element tree"),
            )
            .require("body")
    }

    async fn run(
        &self,
        input: BrickInput,
        _ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let body = match input.get("body") {
            Some(body @ Value::Array(_)) => body.clone(),
            Some(other) => {
                return Err(BrickError::InvalidInput(format!(
                    "body must be an element array, got {other}"
                )))
            }
            None => return Err(BrickError::InvalidInput("missing body".to_owned())),
        };
        Ok(json!({"type": "document", "body": body}))
    }
}
