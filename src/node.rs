//! Node base: identity, parameter/input/output maps and the dirty flag.
//!
//! A node is a behavior (the algorithm) plus the state the engine manages
//! around it. Behaviors declare their port schemas up front; the setters
//! validate names and variants against those schemas, and every mutation
//! marks the node dirty and drops its outputs. `get_output` treats the
//! node as a lazy function: a dirty node executes before answering.

use std::collections::HashMap;

use crate::error::{FlowError, Result};
use crate::port::{PortKind, PortValue, SpectrumHistory, Timestamp};

/// A named, typed port declaration.
pub type PortDecl = (&'static str, PortKind);

/// The algorithm half of a node.
///
/// `execute` reads inputs and parameters through the [`NodeIo`] context,
/// validates them, and emits outputs. It must fail with a validation
/// error before touching any state when inputs or parameter ranges are
/// violated.
pub trait NodeBehavior {
    fn type_name(&self) -> &'static str;

    /// Declared parameters, with their kinds.
    fn parameter_schema(&self) -> &'static [PortDecl];

    /// Declared input ports.
    fn input_schema(&self) -> &'static [PortDecl];

    /// Declared output ports.
    fn output_schema(&self) -> &'static [PortDecl];

    /// Default parameter values seeded at construction.
    fn default_parameters(&self) -> Vec<(&'static str, PortValue)> {
        Vec::new()
    }

    fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<()>;
}

/// A processing node owned by the graph.
pub struct Node {
    name: String,
    parameters: HashMap<String, PortValue>,
    inputs: HashMap<String, PortValue>,
    outputs: HashMap<String, PortValue>,
    dirty: bool,
    behavior: Box<dyn NodeBehavior>,
}

impl Node {
    /// Create a node with defaulted parameters and no outputs.
    pub fn new(name: impl Into<String>, behavior: Box<dyn NodeBehavior>) -> Self {
        let mut parameters = HashMap::new();
        for (pname, value) in behavior.default_parameters() {
            parameters.insert(pname.to_string(), value);
        }
        Self {
            name: name.into(),
            parameters,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            dirty: true,
            behavior,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.behavior.type_name()
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn declared_kind(schema: &[PortDecl], name: &str) -> Option<PortKind> {
        schema.iter().find(|(n, _)| *n == name).map(|(_, k)| *k)
    }

    /// Declared kind of an input port, if the behavior has one.
    pub fn input_kind(&self, port: &str) -> Option<PortKind> {
        Self::declared_kind(self.behavior.input_schema(), port)
    }

    /// Declared kind of an output port, if the behavior has one.
    pub fn output_kind(&self, port: &str) -> Option<PortKind> {
        Self::declared_kind(self.behavior.output_schema(), port)
    }

    /// Store a parameter. Marks the node dirty and drops its outputs.
    pub fn set_parameter(&mut self, name: &str, value: PortValue) -> Result<()> {
        let kind = Self::declared_kind(self.behavior.parameter_schema(), name).ok_or_else(|| {
            FlowError::ValidationError {
                node: self.name.clone(),
                message: format!("no parameter named '{name}'"),
            }
        })?;
        if value.kind() != kind {
            return Err(FlowError::ValidationError {
                node: self.name.clone(),
                message: format!(
                    "parameter '{name}' expects {kind}, got {}",
                    value.kind()
                ),
            });
        }
        self.parameters.insert(name.to_string(), value);
        self.dirty = true;
        self.outputs.clear();
        Ok(())
    }

    /// Store an input value. Marks the node dirty and drops its outputs.
    pub fn set_input(&mut self, name: &str, value: PortValue) -> Result<()> {
        let kind = Self::declared_kind(self.behavior.input_schema(), name).ok_or_else(|| {
            FlowError::ValidationError {
                node: self.name.clone(),
                message: format!("no input port named '{name}'"),
            }
        })?;
        if value.kind() != kind {
            return Err(FlowError::ValidationError {
                node: self.name.clone(),
                message: format!("input '{name}' expects {kind}, got {}", value.kind()),
            });
        }
        self.inputs.insert(name.to_string(), value);
        self.dirty = true;
        self.outputs.clear();
        Ok(())
    }

    pub fn get_parameter(&self, name: &str) -> Option<&PortValue> {
        self.parameters.get(name)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Read an output without executing. Used by the graph, which has
    /// already run the pass.
    pub fn peek_output(&self, name: &str) -> Result<&PortValue> {
        self.outputs.get(name).ok_or_else(|| FlowError::MissingOutput {
            node: self.name.clone(),
            name: name.to_string(),
        })
    }

    /// Read an output, executing first if the node is dirty.
    pub fn get_output(&mut self, name: &str) -> Result<&PortValue> {
        if self.dirty {
            self.execute()?;
        }
        self.peek_output(name)
    }

    /// Drop outputs and mark dirty.
    pub fn reset(&mut self) {
        self.outputs.clear();
        self.dirty = true;
    }

    /// Run the behavior. On success the outputs are replaced wholesale and
    /// the dirty flag clears; on failure prior outputs stay untouched and
    /// the node remains dirty.
    pub fn execute(&mut self) -> Result<()> {
        let mut io = NodeIo {
            node: &self.name,
            parameters: &mut self.parameters,
            inputs: &self.inputs,
            fresh: HashMap::new(),
        };
        self.behavior.execute(&mut io)?;
        let fresh = io.fresh;
        for (name, _) in self.behavior.output_schema() {
            if !fresh.contains_key(*name) {
                return Err(FlowError::MissingOutput {
                    node: self.name.clone(),
                    name: (*name).to_string(),
                });
            }
        }
        self.outputs = fresh;
        self.dirty = false;
        Ok(())
    }
}

/// Execution context handed to a behavior: read-only inputs, parameters
/// (with a narrow write path for node-held state), and an output buffer
/// that only replaces the node's outputs if the whole execute succeeds.
pub struct NodeIo<'a> {
    node: &'a str,
    parameters: &'a mut HashMap<String, PortValue>,
    inputs: &'a HashMap<String, PortValue>,
    fresh: HashMap<String, PortValue>,
}

impl<'a> NodeIo<'a> {
    pub fn node_name(&self) -> &str {
        self.node
    }

    /// Build a ValidationError against this node.
    pub fn invalid(&self, message: impl Into<String>) -> FlowError {
        FlowError::ValidationError {
            node: self.node.to_string(),
            message: message.into(),
        }
    }

    fn missing_input(&self, name: &str) -> FlowError {
        FlowError::MissingInput {
            node: self.node.to_string(),
            name: name.to_string(),
        }
    }

    fn missing_parameter(&self, name: &str) -> FlowError {
        FlowError::MissingParameter {
            node: self.node.to_string(),
            name: name.to_string(),
        }
    }

    pub fn input(&self, name: &str) -> Result<&PortValue> {
        self.inputs.get(name).ok_or_else(|| self.missing_input(name))
    }

    pub fn time_input(&self, name: &str) -> Result<&[Timestamp]> {
        self.input(name)?
            .as_time()
            .ok_or_else(|| self.invalid(format!("input '{name}' must be Time")))
    }

    pub fn real_input(&self, name: &str) -> Result<&[f64]> {
        self.input(name)?
            .as_real()
            .ok_or_else(|| self.invalid(format!("input '{name}' must be Real")))
    }

    pub fn scalar_input(&self, name: &str) -> Result<f64> {
        self.input(name)?
            .as_scalar()
            .ok_or_else(|| self.invalid(format!("input '{name}' must be Scalar")))
    }

    pub fn parameter(&self, name: &str) -> Option<&PortValue> {
        self.parameters.get(name)
    }

    pub fn scalar_param(&self, name: &str) -> Result<f64> {
        self.parameters
            .get(name)
            .ok_or_else(|| self.missing_parameter(name))?
            .as_scalar()
            .ok_or_else(|| self.invalid(format!("parameter '{name}' must be Scalar")))
    }

    /// Scalar parameter rounded to a non-negative integer.
    pub fn uint_param(&self, name: &str) -> Result<u32> {
        let v = self.scalar_param(name)?;
        if !v.is_finite() || v < 0.0 {
            return Err(self.invalid(format!("parameter '{name}' must be a non-negative integer")));
        }
        Ok(v.round() as u32)
    }

    pub fn bool_param(&self, name: &str) -> Result<bool> {
        self.parameters
            .get(name)
            .ok_or_else(|| self.missing_parameter(name))?
            .as_bool()
            .ok_or_else(|| self.invalid(format!("parameter '{name}' must be Bool")))
    }

    pub fn text_param(&self, name: &str) -> Result<&str> {
        self.parameters
            .get(name)
            .ok_or_else(|| self.missing_parameter(name))?
            .as_text()
            .ok_or_else(|| self.invalid(format!("parameter '{name}' must be Text")))
    }

    pub fn pair_param(&self, name: &str) -> Result<(f64, f64)> {
        self.parameters
            .get(name)
            .ok_or_else(|| self.missing_parameter(name))?
            .as_pair()
            .ok_or_else(|| self.invalid(format!("parameter '{name}' must be Pair")))
    }

    pub fn history_param(&self, name: &str) -> Result<&SpectrumHistory> {
        self.parameters
            .get(name)
            .ok_or_else(|| self.missing_parameter(name))?
            .as_history()
            .ok_or_else(|| self.invalid(format!("parameter '{name}' must be History")))
    }

    /// Write node-held state back into the parameter map. Does not mark
    /// the node dirty.
    pub fn store_parameter(&mut self, name: &str, value: PortValue) {
        self.parameters.insert(name.to_string(), value);
    }

    /// Emit an output. Emissions only become visible if the whole execute
    /// succeeds.
    pub fn emit(&mut self, name: &str, value: PortValue) {
        self.fresh.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Doubles its input vector; used to exercise the node lifecycle.
    struct Doubler;

    impl NodeBehavior for Doubler {
        fn type_name(&self) -> &'static str {
            "Doubler"
        }

        fn parameter_schema(&self) -> &'static [PortDecl] {
            &[("gain", PortKind::Scalar)]
        }

        fn input_schema(&self) -> &'static [PortDecl] {
            &[("value", PortKind::Real)]
        }

        fn output_schema(&self) -> &'static [PortDecl] {
            &[("value", PortKind::Real)]
        }

        fn default_parameters(&self) -> Vec<(&'static str, PortValue)> {
            vec![("gain", PortValue::Scalar(2.0))]
        }

        fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<()> {
            let gain = io.scalar_param("gain")?;
            let value = io.real_input("value")?;
            let doubled: Vec<f64> = value.iter().map(|v| v * gain).collect();
            io.emit("value", PortValue::Real(doubled));
            Ok(())
        }
    }

    #[test]
    fn test_fresh_node_is_dirty_with_defaults() {
        let node = Node::new("d", Box::new(Doubler));
        assert!(node.dirty());
        assert_eq!(node.get_parameter("gain").unwrap().as_scalar(), Some(2.0));
    }

    #[test]
    fn test_get_output_auto_executes() {
        let mut node = Node::new("d", Box::new(Doubler));
        node.set_input("value", PortValue::Real(vec![1.0, 2.0])).unwrap();
        let out = node.get_output("value").unwrap();
        assert_eq!(out.as_real().unwrap(), &[2.0, 4.0]);
        assert!(!node.dirty());
    }

    #[test]
    fn test_set_parameter_marks_dirty_and_clears_outputs() {
        let mut node = Node::new("d", Box::new(Doubler));
        node.set_input("value", PortValue::Real(vec![1.0])).unwrap();
        node.execute().unwrap();
        assert!(!node.dirty());

        node.set_parameter("gain", PortValue::Scalar(3.0)).unwrap();
        assert!(node.dirty());
        assert!(node.peek_output("value").is_err());

        let out = node.get_output("value").unwrap();
        assert_eq!(out.as_real().unwrap(), &[3.0]);
    }

    #[test]
    fn test_schema_rejects_unknown_names_and_wrong_kinds() {
        let mut node = Node::new("d", Box::new(Doubler));
        assert!(matches!(
            node.set_parameter("nope", PortValue::Scalar(1.0)),
            Err(FlowError::ValidationError { .. })
        ));
        assert!(matches!(
            node.set_parameter("gain", PortValue::Bool(true)),
            Err(FlowError::ValidationError { .. })
        ));
        assert!(matches!(
            node.set_input("value", PortValue::Scalar(1.0)),
            Err(FlowError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_missing_input_fails_execute() {
        let mut node = Node::new("d", Box::new(Doubler));
        assert!(matches!(
            node.execute(),
            Err(FlowError::MissingInput { .. })
        ));
        assert!(node.dirty());
    }

    #[test]
    fn test_reset_drops_outputs() {
        let mut node = Node::new("d", Box::new(Doubler));
        node.set_input("value", PortValue::Real(vec![1.0])).unwrap();
        node.execute().unwrap();
        node.reset();
        assert!(node.dirty());
        assert!(node.peek_output("value").is_err());
    }
}
