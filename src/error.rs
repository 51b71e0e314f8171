//! Error types for the dataflow engine.
//!
//! Uses `thiserror` for structured, matchable error variants. Every failure
//! here is a deterministic consequence of invalid use or malformed data;
//! nothing is transient and nothing is retried.

use thiserror::Error;

/// Errors produced by the graph engine, the processing nodes and the
/// workflow facade.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A required parameter was never set (or is empty).
    #[error("node '{node}' is missing required parameter '{name}'")]
    MissingParameter { node: String, name: String },

    /// A required input port has no value.
    #[error("node '{node}' is missing required input '{name}'")]
    MissingInput { node: String, name: String },

    /// The data file does not exist.
    #[error("file not found: '{path}'")]
    FileNotFound { path: String },

    /// Some other I/O failure while reading the data file.
    #[error("i/o error reading '{path}': {message}")]
    Io { path: String, message: String },

    /// A malformed row in the input file. `line` is 1-based.
    #[error("parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// An out-of-range value, a wrong port-value variant, or a port name
    /// a node does not declare.
    #[error("validation failed for node '{node}': {message}")]
    ValidationError { node: String, message: String },

    /// A node's execute returned without populating a declared output.
    #[error("node '{node}' did not produce output '{name}'")]
    MissingOutput { node: String, name: String },

    /// Two nodes may not share a name.
    #[error("a node named '{name}' already exists in the graph")]
    DuplicateName { name: String },

    /// The named node is not in the graph.
    #[error("unknown node '{name}'")]
    UnknownNode { name: String },

    /// Each input port accepts at most one feeder edge.
    #[error("input port '{port}' of node '{node}' already has a feeder")]
    PortOccupied { node: String, port: String },

    /// Adding this edge would make the graph cyclic; the edge is rejected
    /// before it is recorded.
    #[error("connecting '{src}' -> '{dst}' would introduce a cycle")]
    CycleIntroduced { src: String, dst: String },

    /// The edge set is cyclic; no topological order exists.
    #[error("graph contains a cycle, execution order is undefined")]
    CycleDetected,
}

pub type Result<T> = std::result::Result<T, FlowError>;
