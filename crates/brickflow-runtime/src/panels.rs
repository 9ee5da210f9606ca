//! Session-owned panel store.
//!
//! Panels shown by renderer bricks live in a `PanelSession` owned by the
//! embedding host — created per content-script session and torn down on
//! navigation. State is explicit and passed by reference; there is no
//! module-level store.

use parking_lot::Mutex;
use serde_json::Value;

use brickflow_types::ModComponentId;

/// One panel entry: the rendered payload for a mod component.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelEntry {
    pub mod_component_id: ModComponentId,
    /// Panel heading, usually the brick label.
    pub heading: Option<String>,
    /// Renderer payload to display.
    pub payload: Value,
}

impl PanelEntry {
    pub fn new(mod_component_id: ModComponentId, payload: Value) -> Self {
        Self {
            mod_component_id,
            heading: None,
            payload,
        }
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }
}

/// Panel store for one host session.
#[derive(Debug, Default)]
pub struct PanelSession {
    panels: Mutex<Vec<PanelEntry>>,
}

impl PanelSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the panel for an entry's mod component.
    ///
    /// A re-run of the same component updates its panel in place, keeping
    /// the panel's position.
    pub fn upsert(&self, entry: PanelEntry) {
        let mut panels = self.panels.lock();
        match panels
            .iter_mut()
            .find(|p| p.mod_component_id == entry.mod_component_id)
        {
            Some(existing) => *existing = entry,
            None => panels.push(entry),
        }
    }

    /// Remove the panel for a mod component, if present.
    pub fn remove(&self, mod_component_id: &ModComponentId) -> Option<PanelEntry> {
        let mut panels = self.panels.lock();
        let index = panels
            .iter()
            .position(|p| &p.mod_component_id == mod_component_id)?;
        Some(panels.remove(index))
    }

    /// Snapshot of all current panels, in display order.
    pub fn entries(&self) -> Vec<PanelEntry> {
        self.panels.lock().clone()
    }

    /// Drop every panel (session teardown / navigation).
    pub fn clear(&self) {
        self.panels.lock().clear();
    }
}
