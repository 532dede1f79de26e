//! Shared socket/control builders and data checks for geometry nodes

use node_graph::{
    ControlConfig, ControlDefinition, ControlType, InputDefinition, NodeData, NodeDefinition, OutputDefinition,
    SocketType, ValidationResult,
};
use serde_json::{json, Value};

/// Key of the expression socket every geometry node exposes
pub const EXPR: &str = "expr";

/// Attach the single expression output
pub(crate) fn with_expr_output(definition: NodeDefinition) -> NodeDefinition {
    definition.with_output(OutputDefinition::new(EXPR, "Expr", SocketType::ExprSocket))
}

/// Attach an optional float input driven by a linked control
pub(crate) fn with_float_param(definition: NodeDefinition, key: &str, label: &str, default: f64) -> NodeDefinition {
    definition
        .with_input(InputDefinition::optional(key, label, SocketType::FloatSocket))
        .with_control(
            ControlDefinition::new(
                key,
                ControlType::Float,
                label,
                ControlConfig::with_default(json!(default)).with_step(0.1),
            )
            .linked_to(key)
            .with_socket(SocketType::FloatSocket),
        )
}

/// Attach an optional vector input driven by a linked control
///
/// The control type follows the component count of `default`.
pub(crate) fn with_vector_param(definition: NodeDefinition, key: &str, label: &str, default: &[f64]) -> NodeDefinition {
    let control_type = match default.len() {
        2 => ControlType::Vector2,
        4 => ControlType::Vector4,
        _ => ControlType::Vector3,
    };
    definition
        .with_input(InputDefinition::optional(key, label, SocketType::VectorSocket))
        .with_control(
            ControlDefinition::new(key, control_type, label, ControlConfig::with_default(json!(default)).with_step(0.1))
                .linked_to(key)
                .with_socket(SocketType::VectorSocket),
        )
}

/// Numeric components of a float or vector value
fn components(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| vec![v]),
        Value::Array(items) => items.iter().map(Value::as_f64).collect(),
        _ => None,
    }
}

/// Check that each present key holds non-negative numbers
pub(crate) fn check_non_negative(data: &NodeData, keys: &[&str]) -> ValidationResult {
    check_components(data, keys, |v| v >= 0.0, "must not be negative")
}

/// Check that each present key holds non-zero numbers
pub(crate) fn check_non_zero(data: &NodeData, keys: &[&str]) -> ValidationResult {
    check_components(data, keys, |v| v != 0.0, "must not be zero")
}

fn check_components(data: &NodeData, keys: &[&str], accept: impl Fn(f64) -> bool, message: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();
    for key in keys {
        // Missing or null keys are fed by a connection instead
        let Some(value) = data.get(*key).filter(|v| !v.is_null()) else {
            continue;
        };
        match components(value) {
            Some(values) if values.iter().all(|v| accept(*v)) => {}
            Some(_) => result.push_error(format!("{} {}", key, message)),
            None => result.push_error(format!("{} must be numeric", key)),
        }
    }
    result
}
