//! Built-in bricks.
//!
//! The core control-flow, data, effect, and renderer bricks that ship with
//! the runtime. Everything else comes from the external registry.

mod control;
mod data;
mod effect;
mod render;

pub use control::{ForEach, IfElse, TryExcept};
pub use data::{FormBrick, GetState, HttpRequest, Identity, RunJavascript, SetState};
pub use effect::LogEffect;
pub use render::DocumentRenderer;

use crate::registry::InMemoryRegistry;

/// Register all built-in bricks with the registry.
pub fn register_builtins(registry: &mut InMemoryRegistry) {
    registry.register(IfElse::new());
    registry.register(ForEach::new());
    registry.register(TryExcept::new());
    registry.register(Identity::new());
    registry.register(HttpRequest::new());
    registry.register(FormBrick::new());
    registry.register(RunJavascript::new());
    registry.register(GetState::new());
    registry.register(SetState::new());
    registry.register(LogEffect::new());
    registry.register(DocumentRenderer::new());
}
