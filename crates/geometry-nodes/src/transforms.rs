//! Transform nodes
//!
//! Each transform takes one expression and a vector parameter.

use node_graph::{InputDefinition, NodeDefinition, SocketType};

use crate::params::{check_non_zero, with_expr_output, with_vector_param, EXPR};

const CATEGORY: &str = "Transforms";

fn transform(node_type: &str, label: &str, description: &str) -> NodeDefinition {
    NodeDefinition::new(node_type, label, CATEGORY)
        .with_description(description)
        .with_input(InputDefinition::required(EXPR, "Expr", SocketType::ExprSocket))
}

pub fn translate_3d() -> NodeDefinition {
    let definition = transform("Translate3D", "Translate 3D", "Move an expression by an offset")
        .with_tags(["translate", "move", "offset", "3d"]);
    with_expr_output(with_vector_param(definition, "offset", "Offset", &[0.0, 0.0, 0.0])).with_declared_defaults()
}

inventory::submit!(node_graph::DefinitionFn(translate_3d));

/// Rotation by XYZ Euler angles in radians
pub fn euler_rotate_3d() -> NodeDefinition {
    let definition = transform("EulerRotate3D", "Euler Rotate 3D", "Rotate an expression by Euler angles")
        .with_tags(["rotate", "euler", "3d"]);
    with_expr_output(with_vector_param(definition, "angles", "Angles", &[0.0, 0.0, 0.0])).with_declared_defaults()
}

inventory::submit!(node_graph::DefinitionFn(euler_rotate_3d));

/// Per-axis scale; zero components collapse the shape and are rejected
pub fn scale_3d() -> NodeDefinition {
    let definition = transform("Scale3D", "Scale 3D", "Scale an expression per axis").with_tags(["scale", "resize", "3d"]);
    with_expr_output(with_vector_param(definition, "scale", "Scale", &[1.0, 1.0, 1.0]))
        .with_declared_defaults()
        .with_validator(|data| check_non_zero(data, &["scale"]))
}

inventory::submit!(node_graph::DefinitionFn(scale_3d));
