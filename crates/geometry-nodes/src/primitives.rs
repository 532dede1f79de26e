//! Primitive nodes
//!
//! Signed-distance primitives. Each exposes its shape parameters as optional
//! sockets with linked controls and a single expression output.

use node_graph::NodeDefinition;

use crate::params::{check_non_negative, with_expr_output, with_float_param, with_vector_param};

const CATEGORY: &str = "Primitives";

/// Axis-aligned box
pub fn box_3d() -> NodeDefinition {
    let definition = NodeDefinition::new("Box3D", "Box 3D", CATEGORY)
        .with_description("Axis-aligned box centred at the origin")
        .with_tags(["box", "cube", "3d"])
        .with_dimensions(180.0, 120.0);
    with_expr_output(with_vector_param(definition, "size", "Size", &[1.0, 1.0, 1.0]))
        .with_declared_defaults()
        .with_validator(|data| check_non_negative(data, &["size"]))
}

inventory::submit!(node_graph::DefinitionFn(box_3d));

/// Hollow box made of its edges
pub fn box_frame_3d() -> NodeDefinition {
    let definition = NodeDefinition::new("BoxFrame3D", "Box Frame 3D", CATEGORY)
        .with_description("Wireframe box with edge thickness")
        .with_tags(["box", "frame", "3d"]);
    let definition = with_vector_param(definition, "b", "Bounds", &[1.0, 1.0, 1.0]);
    with_expr_output(with_float_param(definition, "e", "Edge", 0.1))
        .with_declared_defaults()
        .with_validator(|data| check_non_negative(data, &["b", "e"]))
}

inventory::submit!(node_graph::DefinitionFn(box_frame_3d));

/// Sphere centred at the origin
pub fn sphere_3d() -> NodeDefinition {
    let definition = NodeDefinition::new("Sphere3D", "Sphere 3D", CATEGORY)
        .with_description("Sphere centred at the origin")
        .with_tags(["sphere", "ball", "3d"]);
    with_expr_output(with_float_param(definition, "radius", "Radius", 1.0))
        .with_declared_defaults()
        .with_validator(|data| check_non_negative(data, &["radius"]))
}

inventory::submit!(node_graph::DefinitionFn(sphere_3d));

/// Capped cylinder along the Y axis
pub fn cylinder_3d() -> NodeDefinition {
    let definition = NodeDefinition::new("Cylinder3D", "Cylinder 3D", CATEGORY)
        .with_description("Capped cylinder along the Y axis")
        .with_tags(["cylinder", "3d"]);
    let definition = with_float_param(definition, "h", "Height", 1.0);
    with_expr_output(with_float_param(definition, "r", "Radius", 0.5))
        .with_declared_defaults()
        .with_validator(|data| check_non_negative(data, &["h", "r"]))
}

inventory::submit!(node_graph::DefinitionFn(cylinder_3d));

/// Torus in the XZ plane; `t` holds the major and minor radius
pub fn torus_3d() -> NodeDefinition {
    let definition = NodeDefinition::new("Torus3D", "Torus 3D", CATEGORY)
        .with_description("Torus in the XZ plane")
        .with_tags(["torus", "ring", "donut", "3d"]);
    with_expr_output(with_vector_param(definition, "t", "Radii", &[1.0, 0.25]))
        .with_declared_defaults()
        .with_validator(|data| check_non_negative(data, &["t"]))
}

inventory::submit!(node_graph::DefinitionFn(torus_3d));

#[cfg(test)]
mod tests {
    use super::*;
    use node_graph::{validate_definition, ControlType, NodeData, SocketType};
    use serde_json::json;

    #[test]
    fn test_definitions_are_valid() {
        for definition in [box_3d(), box_frame_3d(), sphere_3d(), cylinder_3d(), torus_3d()] {
            let result = validate_definition(&definition);
            assert!(result.is_valid, "{}: {:?}", definition.node_type, result.errors);
            assert!(result.warnings.is_empty(), "{}: {:?}", definition.node_type, result.warnings);
            assert_eq!(definition.outputs[0].socket_type, SocketType::ExprSocket);
        }
    }

    #[test]
    fn test_box_defaults() {
        let definition = box_3d();
        let data = definition.default_data(&NodeData::new());
        assert_eq!(data.get("size"), Some(&json!([1.0, 1.0, 1.0])));
        assert_eq!(definition.controls[0].control_type, ControlType::Vector3);
    }

    #[test]
    fn test_torus_uses_vector2() {
        let definition = torus_3d();
        assert_eq!(definition.controls[0].control_type, ControlType::Vector2);
        assert_eq!(definition.default_data(&NodeData::new()).get("t"), Some(&json!([1.0, 0.25])));
    }

    #[test]
    fn test_negative_size_rejected() {
        let definition = box_3d();
        let mut data = definition.default_data(&NodeData::new());
        data.insert("size".to_string(), json!([1.0, -2.0, 1.0]));
        let result = definition.validate_data(&data);
        assert_eq!(result.errors, vec!["size must not be negative"]);

        let mut data = sphere_3d().default_data(&NodeData::new());
        data.insert("radius".to_string(), json!(-0.5));
        assert!(!sphere_3d().validate_data(&data).is_valid);
    }
}
