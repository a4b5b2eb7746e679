//! Minimal SCXML interpreter for flat state machines.
//!
//! Follows the SCXML run-time rules that apply to documents without compound
//! states: an external event selects the first transition of the active state,
//! in document order, whose event descriptor matches and whose `cond` holds;
//! eventless transitions are then taken until none is enabled. Invocations of
//! a state are started on entry and cancelled on exit. Events received in a
//! final state, or matching no transition, are discarded.

use crate::convert::{SysmlToScxml, find_state_machine};
use crate::error::InterpreterError;
use crate::parser::load_model;
use crate::scxml::reader::parse_scxml;
use crate::scxml::*;
use anyhow::Context;
use camino::Utf8Path;
use serde::Serialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};

/// Upper bound on consecutive eventless transitions in one macrostep.
pub const MAX_EVENTLESS_STEPS: usize = 100;

/// Decides whether a transition's `cond` holds.
pub type GuardFn = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One taken transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    /// Triggering event; `None` for an eventless transition.
    pub event: Option<String>,
    pub source: String,
    pub target: String,
    /// Invocations cancelled by leaving `source`.
    pub cancelled: Vec<String>,
    /// Invocations started by entering `target`.
    pub started: Vec<String>,
}

pub struct Interpreter {
    document: ScxmlDocument,
    state_index: HashMap<String, usize>,
    current: usize,
    active_invokes: Vec<String>,
    history: Vec<Step>,
    guard: GuardFn,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("current", &self.current_state())
            .field("active_invokes", &self.active_invokes)
            .field("steps", &self.history.len())
            .finish()
    }
}

impl Interpreter {
    /// Start a machine. Conditions are not evaluated: every `cond` holds.
    /// The first condition met logs a warning.
    pub fn new(document: ScxmlDocument) -> Result<Self, InterpreterError> {
        let warned = AtomicBool::new(false);
        Self::with_guard(document, move |cond| {
            if !warned.swap(true, Ordering::Relaxed) {
                tracing::warn!(cond, "conditions are not evaluated, assuming true");
            }
            true
        })
    }

    /// Start a machine with a custom `cond` evaluator.
    pub fn with_guard(
        document: ScxmlDocument,
        guard: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Result<Self, InterpreterError> {
        let state_index = validate(&document)?;
        let initial = document
            .initial_state()
            .ok_or(InterpreterError::EmptyDocument)?
            .to_string();
        let current = *state_index
            .get(&initial)
            .ok_or_else(|| InterpreterError::UnknownInitial {
                state: initial.clone(),
            })?;
        let mut interp = Interpreter {
            document,
            state_index,
            current,
            active_invokes: Vec::new(),
            history: Vec::new(),
            guard: Box::new(guard),
        };
        let started = interp.enter(current);
        tracing::debug!(state = %initial, ?started, "machine started");
        interp.settle()?;
        Ok(interp)
    }

    pub fn document(&self) -> &ScxmlDocument {
        &self.document
    }

    pub fn current_state(&self) -> &str {
        &self.document.states[self.current].id
    }

    pub fn active_invocations(&self) -> &[String] {
        &self.active_invokes
    }

    pub fn is_in_final_state(&self) -> bool {
        self.document.states[self.current].is_final
    }

    /// All steps taken so far, oldest first.
    pub fn history(&self) -> &[Step] {
        &self.history
    }

    /// Event descriptors of the active state's event transitions.
    pub fn enabled_events(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for t in &self.document.states[self.current].transitions {
            if let Some(ref ev) = t.event {
                for descriptor in ev.split_whitespace() {
                    if !out.contains(&descriptor) {
                        out.push(descriptor);
                    }
                }
            }
        }
        out
    }

    /// Process one external event. Returns the steps taken, empty when the
    /// event was discarded.
    pub fn send(&mut self, event: &str) -> Result<Vec<Step>, InterpreterError> {
        if self.is_in_final_state() {
            tracing::debug!(event, state = self.current_state(), "machine is final, event discarded");
            return Ok(Vec::new());
        }
        let start = self.history.len();
        let selected = self.document.states[self.current]
            .transitions
            .iter()
            .position(|t| {
                t.event.as_deref().is_some_and(|ev| event_matches(ev, event))
                    && t.cond.as_deref().is_none_or(|c| (self.guard)(c))
            });
        match selected {
            Some(idx) => {
                self.take(idx, Some(event));
                self.settle()?;
            }
            None => {
                tracing::debug!(event, state = self.current_state(), "no transition, event discarded");
            }
        }
        Ok(self.history[start..].to_vec())
    }

    /// Take eventless transitions until none is enabled.
    fn settle(&mut self) -> Result<(), InterpreterError> {
        for _ in 0..MAX_EVENTLESS_STEPS {
            if self.is_in_final_state() {
                return Ok(());
            }
            let selected = self.document.states[self.current]
                .transitions
                .iter()
                .position(|t| t.event.is_none() && t.cond.as_deref().is_none_or(|c| (self.guard)(c)));
            match selected {
                Some(idx) => self.take(idx, None),
                None => return Ok(()),
            }
        }
        Err(InterpreterError::EventlessLoop {
            state: self.current_state().to_string(),
            steps: MAX_EVENTLESS_STEPS,
        })
    }

    fn take(&mut self, transition: usize, event: Option<&str>) {
        let source_idx = self.current;
        let target = self.document.states[source_idx].transitions[transition]
            .target
            .clone();
        let source = self.document.states[source_idx].id.clone();
        let step = match target {
            // Targetless: no state change, invocations keep running.
            None => Step {
                event: event.map(|e| e.to_string()),
                source: source.clone(),
                target: source,
                cancelled: Vec::new(),
                started: Vec::new(),
            },
            Some(target) => {
                let target_idx = self.state_index[&target];
                let cancelled = std::mem::take(&mut self.active_invokes);
                let started = self.enter(target_idx);
                Step {
                    event: event.map(|e| e.to_string()),
                    source,
                    target,
                    cancelled,
                    started,
                }
            }
        };
        tracing::debug!(
            event = ?step.event,
            source = %step.source,
            target = %step.target,
            "transition taken"
        );
        self.history.push(step);
    }

    fn enter(&mut self, state: usize) -> Vec<String> {
        self.current = state;
        let started: Vec<String> = self.document.states[state]
            .invokes
            .iter()
            .map(|i| i.id.clone())
            .collect();
        self.active_invokes = started.clone();
        started
    }
}

/// Load the document to run: an `.scxml` file as is, any other input through
/// [`load_model`] and conversion of the selected machine.
pub fn load_document(input: &Utf8Path, machine: Option<&str>) -> anyhow::Result<ScxmlDocument> {
    if input.extension() == Some("scxml") {
        let text = std::fs::read_to_string(input.as_std_path())
            .with_context(|| format!("Failed to read {}", input))?;
        return parse_scxml(&text, Some(input.as_str()));
    }
    let model = load_model(input)?;
    let machine_ref = find_state_machine(&model, machine)?;
    Ok(SysmlToScxml::new(&model, &machine_ref)?.into_document())
}

/// One event per line, trimmed; blank lines are skipped.
pub fn read_events(reader: impl BufRead) -> std::io::Result<Vec<String>> {
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let event = line.trim();
        if !event.is_empty() {
            events.push(event.to_string());
        }
    }
    Ok(events)
}

fn validate(document: &ScxmlDocument) -> Result<HashMap<String, usize>, InterpreterError> {
    if document.states.is_empty() {
        return Err(InterpreterError::EmptyDocument);
    }
    let mut index = HashMap::new();
    for (i, state) in document.states.iter().enumerate() {
        if index.insert(state.id.clone(), i).is_some() {
            return Err(InterpreterError::DuplicateState {
                state: state.id.clone(),
            });
        }
    }
    for state in &document.states {
        for t in &state.transitions {
            if let Some(ref target) = t.target {
                if !index.contains_key(target) {
                    return Err(InterpreterError::UnknownTarget {
                        state: state.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }
    Ok(index)
}
