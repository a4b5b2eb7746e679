//! SCXML document model.
//!
//! Only the flat subset produced by the converter is modelled: top-level
//! `<state>`/`<final>` elements with `<invoke>` and `<transition>` children.
//!
//! - [`reader`] – Parse SCXML text into a [`ScxmlDocument`]

pub mod reader;

use serde::{Deserialize, Serialize};

pub const SCXML_NAMESPACE: &str = "http://www.w3.org/2005/07/scxml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScxmlDocument {
    /// `name` attribute of the root element.
    pub name: Option<String>,
    /// Id of the initial state.
    pub initial: Option<String>,
    pub datamodel: Option<String>,
    pub version: String,
    pub states: Vec<ScxmlState>,
}

impl ScxmlDocument {
    pub fn new() -> Self {
        Self {
            name: None,
            initial: None,
            datamodel: None,
            version: "1.0".to_string(),
            states: Vec::new(),
        }
    }

    pub fn state(&self, id: &str) -> Option<&ScxmlState> {
        self.states.iter().find(|s| s.id == id)
    }

    /// The declared initial state, or the first state in document order.
    pub fn initial_state(&self) -> Option<&str> {
        self.initial
            .as_deref()
            .or_else(|| self.states.first().map(|s| s.id.as_str()))
    }
}

impl Default for ScxmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScxmlState {
    pub id: String,
    /// `<final>` instead of `<state>`.
    pub is_final: bool,
    pub invokes: Vec<Invoke>,
    pub transitions: Vec<ScxmlTransition>,
}

impl ScxmlState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_final: false,
            invokes: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

/// `<invoke id="…"/>`: a behaviour that runs while its state is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoke {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScxmlTransition {
    /// Space separated event descriptors; `None` for an eventless transition.
    pub event: Option<String>,
    /// `None` for a targetless transition.
    pub target: Option<String>,
    pub cond: Option<String>,
}

/// SCXML event descriptor matching: a descriptor matches an event name when
/// it equals it or is a `.`-separated prefix of it. `*` matches every event,
/// and a trailing `.*` or `.` on the descriptor is ignored.
pub fn event_matches(descriptors: &str, event: &str) -> bool {
    descriptors.split_whitespace().any(|descriptor| {
        if descriptor == "*" {
            return true;
        }
        let descriptor = descriptor
            .strip_suffix(".*")
            .or_else(|| descriptor.strip_suffix('.'))
            .unwrap_or(descriptor);
        match event.strip_prefix(descriptor) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    })
}
