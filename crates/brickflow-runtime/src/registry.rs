//! Brick registry: lookup of brick implementations by registry id.
//!
//! The registry is an external collaborator in production (backed by a
//! package service); the runtime only depends on this trait. An in-memory
//! implementation is provided for built-ins, embedding, and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use brickflow_types::RegistryId;

use crate::brick::Brick;

/// Registry lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No brick is registered under the id. Fatal to upgrade and execution
    /// of the referencing step.
    #[error("unknown brick: {0}")]
    UnknownBrick(RegistryId),
}

/// Async lookup of bricks by `@scope/name` id.
#[async_trait]
pub trait BrickRegistry: Send + Sync {
    /// Look up a brick, erroring on a miss.
    async fn lookup(&self, id: &RegistryId) -> Result<Arc<dyn Brick>, RegistryError>;

    /// Look up a brick, returning `None` on a miss.
    async fn find(&self, id: &RegistryId) -> Option<Arc<dyn Brick>> {
        self.lookup(id).await.ok()
    }
}

/// Registry backed by a plain map.
#[derive(Default)]
pub struct InMemoryRegistry {
    bricks: HashMap<RegistryId, Arc<dyn Brick>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a brick under its own id, replacing any previous entry.
    pub fn register(&mut self, brick: impl Brick + 'static) {
        self.register_arc(Arc::new(brick));
    }

    /// Register an already-shared brick.
    pub fn register_arc(&mut self, brick: Arc<dyn Brick>) {
        self.bricks.insert(brick.id().clone(), brick);
    }

    /// Whether a brick is registered under the id.
    pub fn contains(&self, id: &RegistryId) -> bool {
        self.bricks.contains_key(id)
    }

    /// Ids of all registered bricks, sorted.
    pub fn ids(&self) -> Vec<&RegistryId> {
        let mut ids: Vec<_> = self.bricks.keys().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl BrickRegistry for InMemoryRegistry {
    async fn lookup(&self, id: &RegistryId) -> Result<Arc<dyn Brick>, RegistryError> {
        self.bricks
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownBrick(id.clone()))
    }
}
