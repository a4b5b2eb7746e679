//! Error types for parsing, conversion and execution.

use crate::model::Span;
use thiserror::Error;

/// A syntax error in a SysMLv2 source file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{path}:{line}:{column}: {message}")]
pub struct ParseError {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Errors raised while turning a SysMLv2 state machine into SCXML.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("model contains no state machine")]
    NoStateMachines,

    #[error("state machine not found: {name}")]
    StateMachineNotFound { name: String },

    #[error("state machine name '{name}' is ambiguous: {}", candidates.join(", "))]
    AmbiguousStateMachine { name: String, candidates: Vec<String> },

    #[error("state has no name at {span}")]
    UnnamedState { span: Span },

    #[error("duplicate state name: {name}")]
    DuplicateState { name: String },

    #[error("transition has no name at {span}")]
    UnnamedTransition { span: Span },

    #[error("transition '{transition}' has no source state")]
    MissingSource { transition: String },

    #[error("transition '{transition}' has no target state")]
    MissingTarget { transition: String },

    #[error("transition '{transition}' refers to unknown state '{state}'")]
    UnknownState { transition: String, state: String },

    #[error("initial state not found in state machine '{machine}'")]
    InitialStateNotFound { machine: String },

    #[error("initial state '{state}' is not a state of '{machine}'")]
    UnknownInitialState { machine: String, state: String },

    #[error("transition '{transition}': event type '{type_name}' not found")]
    UnresolvedEventType { transition: String, type_name: String },

    #[error("transition '{transition}': event type '{type_name}' is a {kind}, expected attribute def")]
    EventTypeNotAttribute {
        transition: String,
        type_name: String,
        kind: String,
    },

    #[error("transition '{transition}': accept payload has neither name nor type")]
    EmptyAccept { transition: String },

    #[error("transition '{transition}': '{kind}' triggers have no SCXML equivalent")]
    UnsupportedTrigger { transition: String, kind: String },
}

/// Errors from loading or running an SCXML document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("document has no states")]
    EmptyDocument,

    #[error("initial state not found: {state}")]
    UnknownInitial { state: String },

    #[error("transition in '{state}' targets unknown state '{target}'")]
    UnknownTarget { state: String, target: String },

    #[error("duplicate state id: {state}")]
    DuplicateState { state: String },

    #[error("eventless transitions did not settle after {steps} steps (last state '{state}')")]
    EventlessLoop { state: String, steps: usize },
}

impl InterpreterError {
    /// Short code for CLI output.
    pub fn error_code(&self) -> &'static str {
        match self {
            InterpreterError::EmptyDocument => "EMPTY_DOCUMENT",
            InterpreterError::UnknownInitial { .. } => "UNKNOWN_INITIAL",
            InterpreterError::UnknownTarget { .. } => "UNKNOWN_TARGET",
            InterpreterError::DuplicateState { .. } => "DUPLICATE_STATE",
            InterpreterError::EventlessLoop { .. } => "EVENTLESS_LOOP",
        }
    }
}
