//! SysMLv2 state machine to SCXML bridge.
//!
//! This crate parses the state-machine subset of the SysMLv2 textual notation
//! into strongly-typed Rust structures ([`parser::SysmlParser`]), converts a
//! state machine into an SCXML document ([`convert::SysmlToScxml`]) and can
//! execute SCXML documents ([`interpreter::Interpreter`]).
//!
//! The binary `sysmlv2x` wraps these steps in a command line tool.

pub mod convert;
pub mod error;
pub mod generator;
pub mod interpreter;
pub mod model;
pub mod options;
pub mod parser;
pub mod resolve;
pub mod scxml;

pub use convert::{SysmlToScxml, convert_model, convert_str, find_state_machine};
pub use error::{ConversionError, InterpreterError, ParseError};
pub use options::ConvertOptions;
