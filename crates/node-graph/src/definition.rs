//! Node definition schema
//!
//! A `NodeDefinition` is the declarative description of a node type: its
//! sockets, its UI controls, how default data is produced and how data is
//! validated. Definitions are immutable once handed to a registry.
//!
//! # Example
//!
//! ```ignore
//! use node_graph::{ControlConfig, ControlDefinition, ControlType, InputDefinition};
//! use node_graph::{NodeDefinition, OutputDefinition, SocketType};
//!
//! let sphere = NodeDefinition::new("Sphere3D", "Sphere", "Primitives")
//!     .with_input(InputDefinition::optional("radius", "Radius", SocketType::FloatSocket))
//!     .with_output(OutputDefinition::new("expr", "Expr", SocketType::ExprSocket))
//!     .with_control(
//!         ControlDefinition::new("radius", ControlType::Float, "Radius",
//!             ControlConfig::with_default(serde_json::json!(1.0)))
//!         .linked_to("radius"),
//!     );
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{NodeData, SocketType, ValidationResult};

/// Produces the default data for a new node from caller-supplied data
pub type DataFactory = Arc<dyn Fn(&NodeData) -> NodeData + Send + Sync>;

/// Validates a node's data payload
pub type DataValidator = Arc<dyn Fn(&NodeData) -> ValidationResult + Send + Sync>;

/// Definition of an input socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDefinition {
    /// Socket key, unique among the node's inputs
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Data type accepted by the socket
    pub socket_type: SocketType,
    /// Whether the input must be connected or supplied in data
    pub required: bool,
    /// Whether the input accepts more than one connection
    #[serde(default)]
    pub variadic: bool,
    /// Value used when the input is not connected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputDefinition {
    /// Create a new input definition
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        socket_type: SocketType,
        required: bool,
        variadic: bool,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            socket_type,
            required,
            variadic,
            default_value: None,
            description: None,
        }
    }

    /// Create a required input
    pub fn required(key: impl Into<String>, label: impl Into<String>, socket_type: SocketType) -> Self {
        Self::new(key, label, socket_type, true, false)
    }

    /// Create an optional input
    pub fn optional(key: impl Into<String>, label: impl Into<String>, socket_type: SocketType) -> Self {
        Self::new(key, label, socket_type, false, false)
    }

    /// Allow this input to accept multiple connections
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Set a default value for this input
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Definition of an output socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDefinition {
    pub key: String,
    pub label: String,
    pub socket_type: SocketType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OutputDefinition {
    /// Create a new output definition
    pub fn new(key: impl Into<String>, label: impl Into<String>, socket_type: SocketType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            socket_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Kind of UI control shown on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Float,
    Vector2,
    Vector3,
    Vector4,
    String,
    Select,
    Color,
    Checkbox,
    /// Min/max range slider
    Range,
    UniformFloat,
    UniformVector2,
    UniformVector3,
    UniformVector4,
    /// Generator-specific control (e.g. `Vector[3]`)
    #[serde(untagged)]
    Custom(String),
}

/// Parameters for a UI control
///
/// Controls are presentation metadata; the node's data payload stays
/// authoritative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlConfig {
    /// Initial value
    #[serde(default)]
    pub default_value: serde_json::Value,
    /// Minimum value(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Value>,
    /// Maximum value(s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Options for select controls
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// Display units (e.g. "px")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl ControlConfig {
    /// Config with only a default value
    pub fn with_default(default_value: serde_json::Value) -> Self {
        Self {
            default_value,
            ..Self::default()
        }
    }

    /// Set numeric bounds
    pub fn with_range(mut self, min: serde_json::Value, max: serde_json::Value) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Set the choices of a select control
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

fn default_true() -> bool {
    true
}

/// Definition of a UI control on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDefinition {
    /// Control key, unique among the node's controls
    pub key: String,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    pub label: String,
    #[serde(default)]
    pub config: ControlConfig,
    /// Input this control supplies a value for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_to_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub show_label: bool,
    /// Whether the control also exposes an input socket
    #[serde(default)]
    pub has_socket: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_type: Option<SocketType>,
}

impl ControlDefinition {
    /// Create a new control definition
    pub fn new(
        key: impl Into<String>,
        control_type: ControlType,
        label: impl Into<String>,
        config: ControlConfig,
    ) -> Self {
        Self {
            key: key.into(),
            control_type,
            label: label.into(),
            config,
            linked_to_input: None,
            description: None,
            show_label: true,
            has_socket: false,
            socket_type: None,
        }
    }

    /// Link this control to an input and expose its socket
    pub fn linked_to(mut self, input: impl Into<String>) -> Self {
        self.linked_to_input = Some(input.into());
        self.has_socket = true;
        self
    }

    /// Set the socket type exposed by this control
    pub fn with_socket(mut self, socket_type: SocketType) -> Self {
        self.has_socket = true;
        self.socket_type = Some(socket_type);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hide_label(mut self) -> Self {
        self.show_label = false;
        self
    }
}

/// Preferred node size on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Complete definition of a node type
#[derive(Clone)]
pub struct NodeDefinition {
    /// Unique type identifier (e.g. "Box3D")
    pub node_type: String,
    /// Human-readable label
    pub label: String,
    /// Category for grouping in menus
    pub category: String,
    pub description: Option<String>,
    pub inputs: Vec<InputDefinition>,
    pub outputs: Vec<OutputDefinition>,
    pub controls: Vec<ControlDefinition>,
    /// Preferred size, used by auto-layout
    pub dimensions: Option<Dimensions>,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// Produces default data for new nodes
    pub factory: DataFactory,
    /// Optional data validator
    pub validator: Option<DataValidator>,
    pub version: Option<String>,
    pub deprecated: bool,
    pub experimental: bool,
    /// Search tags
    pub tags: Vec<String>,
}

impl fmt::Debug for NodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("node_type", &self.node_type)
            .field("label", &self.label)
            .field("category", &self.category)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("controls", &self.controls)
            .field("has_validator", &self.validator.is_some())
            .field("deprecated", &self.deprecated)
            .field("experimental", &self.experimental)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl NodeDefinition {
    /// Create a definition with no sockets
    ///
    /// The default factory produces empty data; use
    /// [`NodeDefinition::with_declared_defaults`] to seed new nodes from the
    /// declared input and control defaults.
    pub fn new(
        node_type: impl Into<String>,
        label: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            node_type: node_type.into(),
            label: label.into(),
            category: category.into(),
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            controls: Vec::new(),
            dimensions: None,
            color: None,
            icon: None,
            factory: Arc::new(|_| NodeData::new()),
            validator: None,
            version: None,
            deprecated: false,
            experimental: false,
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input(mut self, input: InputDefinition) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: OutputDefinition) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_control(mut self, control: ControlDefinition) -> Self {
        self.controls.push(control);
        self
    }

    pub fn with_dimensions(mut self, width: f64, height: f64) -> Self {
        self.dimensions = Some(Dimensions { width, height });
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Mark as experimental (hidden from menus when configured)
    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }

    /// Mark as deprecated (hidden from menus by default)
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Replace the default-data factory
    pub fn with_factory(
        mut self,
        factory: impl Fn(&NodeData) -> NodeData + Send + Sync + 'static,
    ) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Use the declared socket and control defaults as the factory
    pub fn with_declared_defaults(mut self) -> Self {
        let defaults = declared_defaults(&self.inputs, &self.controls);
        self.factory = Arc::new(move |_| defaults.clone());
        self
    }

    /// Attach a data validator
    pub fn with_validator(
        mut self,
        validator: impl Fn(&NodeData) -> ValidationResult + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Find an input by key
    pub fn find_input(&self, key: &str) -> Option<&InputDefinition> {
        self.inputs.iter().find(|i| i.key == key)
    }

    /// Find an output by key
    pub fn find_output(&self, key: &str) -> Option<&OutputDefinition> {
        self.outputs.iter().find(|o| o.key == key)
    }

    /// Find a control by key
    pub fn find_control(&self, key: &str) -> Option<&ControlDefinition> {
        self.controls.iter().find(|c| c.key == key)
    }

    /// Run the factory
    pub fn default_data(&self, data: &NodeData) -> NodeData {
        (self.factory)(data)
    }

    /// Run the validator, if any
    pub fn validate_data(&self, data: &NodeData) -> ValidationResult {
        match &self.validator {
            Some(validator) => validator(data),
            None => ValidationResult::ok(),
        }
    }

    /// Serializable view of this definition (closures omitted)
    pub fn summary(&self) -> DefinitionSummary {
        DefinitionSummary {
            node_type: self.node_type.clone(),
            label: self.label.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            controls: self.controls.clone(),
            dimensions: self.dimensions,
            color: self.color.clone(),
            icon: self.icon.clone(),
            version: self.version.clone(),
            deprecated: self.deprecated,
            experimental: self.experimental,
            tags: self.tags.clone(),
            has_validator: self.validator.is_some(),
        }
    }
}

/// Serializable metadata for a node definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSummary {
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub inputs: Vec<InputDefinition>,
    pub outputs: Vec<OutputDefinition>,
    pub controls: Vec<ControlDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub experimental: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_validator: bool,
}

impl From<DefinitionSummary> for NodeDefinition {
    /// Rebuild a definition from exported metadata
    ///
    /// The factory falls back to the declared defaults and no validator is
    /// attached.
    fn from(summary: DefinitionSummary) -> Self {
        let mut definition = NodeDefinition::new(summary.node_type, summary.label, summary.category);
        definition.description = summary.description;
        definition.inputs = summary.inputs;
        definition.outputs = summary.outputs;
        definition.controls = summary.controls;
        definition.dimensions = summary.dimensions;
        definition.color = summary.color;
        definition.icon = summary.icon;
        definition.version = summary.version;
        definition.deprecated = summary.deprecated;
        definition.experimental = summary.experimental;
        definition.tags = summary.tags;
        definition.with_declared_defaults()
    }
}

/// Collect the defaults declared on inputs and controls
///
/// Input defaults win over control defaults; controls write under their
/// linked input key when they have one.
pub fn declared_defaults(inputs: &[InputDefinition], controls: &[ControlDefinition]) -> NodeData {
    let mut data = NodeData::new();
    for input in inputs {
        if let Some(value) = input.default_value.as_ref().filter(|v| !v.is_null()) {
            data.insert(input.key.clone(), value.clone());
        }
    }
    for control in controls {
        if control.config.default_value.is_null() {
            continue;
        }
        let key = control.linked_to_input.as_ref().unwrap_or(&control.key);
        data.entry(key.clone())
            .or_insert_with(|| control.config.default_value.clone());
    }
    data
}

/// Check a definition for structural problems
///
/// Errors make the definition unregistrable; warnings are advisory.
pub fn validate_definition(definition: &NodeDefinition) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if definition.node_type.trim().is_empty() {
        errors.push("Node type is required".to_string());
    }
    if definition.label.trim().is_empty() {
        errors.push("Node label is required".to_string());
    }
    if definition.category.trim().is_empty() {
        errors.push("Node category is required".to_string());
    }

    let mut input_keys = HashSet::new();
    for input in &definition.inputs {
        if !input_keys.insert(input.key.as_str()) {
            errors.push(format!("Duplicate input key: {}", input.key));
        }
    }

    let mut output_keys = HashSet::new();
    for output in &definition.outputs {
        if !output_keys.insert(output.key.as_str()) {
            errors.push(format!("Duplicate output key: {}", output.key));
        }
    }

    let mut control_keys = HashSet::new();
    for control in &definition.controls {
        if !control_keys.insert(control.key.as_str()) {
            errors.push(format!("Duplicate control key: {}", control.key));
        }
        if let Some(linked) = &control.linked_to_input {
            if !input_keys.contains(linked.as_str()) {
                errors.push(format!(
                    "Control {} references non-existent input: {}",
                    control.key, linked
                ));
            }
        }
    }

    let linked: HashSet<&str> = definition
        .controls
        .iter()
        .filter_map(|c| c.linked_to_input.as_deref())
        .collect();
    let unlinked: Vec<&str> = definition
        .inputs
        .iter()
        .map(|i| i.key.as_str())
        .filter(|key| !linked.contains(key))
        .collect();
    if !unlinked.is_empty() {
        warnings.push(format!("Inputs without controls: {}", unlinked.join(", ")));
    }

    ValidationResult::from_diagnostics(errors, warnings)
}
