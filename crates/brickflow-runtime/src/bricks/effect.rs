//! Effect bricks.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use brickflow_types::{InputSchema, RegistryId};

use crate::brick::{Brick, BrickError, BrickInput, BrickKind};
use crate::engine::BrickContext;

/// `@core/log` — log a message for debugging. Effects produce no output.
pub struct LogEffect {
    id: RegistryId,
}

impl LogEffect {
    pub fn new() -> Self {
        Self {
            id: RegistryId::from_parts("core", "log"),
        }
    }
}

impl Default for LogEffect {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brick for LogEffect {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Effect
    }

    fn schema(&self) -> InputSchema {
        InputSchema::object()
            .property("message", InputSchema::string().describe("Message to log"))
            .property("data", InputSchema::default().describe("Value to log alongside"))
            .require("message")
    }

    async fn run(
        &self,
        input: BrickInput,
        ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        let message = input.require_str("message")?;
        match input.get("data") {
            Some(data) => info!(
                target: "brickflow::bricks",
                component = %ctx.mod_component_id(),
                %data,
                "{message}",
            ),
            None => info!(
                target: "brickflow::bricks",
                component = %ctx.mod_component_id(),
                "{message}",
            ),
        }
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_an_effect() {
        let log = LogEffect::new();
        assert_eq!(log.kind(), BrickKind::Effect);
        assert_eq!(log.id().as_str(), "@core/log");
    }
}
