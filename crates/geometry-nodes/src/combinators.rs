//! Combinator nodes
//!
//! Boolean and blending operations over expressions. `Union` and
//! `Intersection` take any number of expressions on one variadic socket;
//! the binary operations take exactly two.

use node_graph::{InputDefinition, NodeDefinition, SocketType};

use crate::params::{check_non_negative, with_expr_output, with_float_param, EXPR};

const CATEGORY: &str = "Combinators";

fn variadic(node_type: &str, label: &str, description: &str) -> NodeDefinition {
    let definition = NodeDefinition::new(node_type, label, CATEGORY)
        .with_description(description)
        .with_input(InputDefinition::required(EXPR, "Expr", SocketType::ExprSocket).variadic());
    with_expr_output(definition)
}

fn binary(node_type: &str, label: &str, description: &str) -> NodeDefinition {
    NodeDefinition::new(node_type, label, CATEGORY)
        .with_description(description)
        .with_input(InputDefinition::required("expr_0", "Expr 0", SocketType::ExprSocket))
        .with_input(InputDefinition::required("expr_1", "Expr 1", SocketType::ExprSocket))
}

pub fn union() -> NodeDefinition {
    variadic("Union", "Union", "Combine any number of expressions").with_tags(["union", "boolean", "combine"])
}

inventory::submit!(node_graph::DefinitionFn(union));

pub fn intersection() -> NodeDefinition {
    variadic("Intersection", "Intersection", "Keep the overlap of any number of expressions")
        .with_tags(["intersection", "boolean", "overlap"])
}

inventory::submit!(node_graph::DefinitionFn(intersection));

/// `expr_0` with `expr_1` cut away
pub fn difference() -> NodeDefinition {
    with_expr_output(binary("Difference", "Difference", "Subtract the second expression from the first"))
        .with_tags(["difference", "subtract", "boolean"])
}

inventory::submit!(node_graph::DefinitionFn(difference));

pub fn complement() -> NodeDefinition {
    let definition = NodeDefinition::new("Complement", "Complement", CATEGORY)
        .with_description("Invert the inside and outside of an expression")
        .with_input(InputDefinition::required(EXPR, "Expr", SocketType::ExprSocket))
        .with_tags(["complement", "invert", "boolean"]);
    with_expr_output(definition)
}

inventory::submit!(node_graph::DefinitionFn(complement));

/// Union blended over a distance `k`
pub fn smooth_union() -> NodeDefinition {
    let definition = binary("SmoothUnion", "Smooth Union", "Blend two expressions together")
        .with_tags(["union", "smooth", "blend"]);
    with_expr_output(with_float_param(definition, "k", "Smoothness", 0.1))
        .with_declared_defaults()
        .with_validator(|data| check_non_negative(data, &["k"]))
}

inventory::submit!(node_graph::DefinitionFn(smooth_union));

#[cfg(test)]
mod tests {
    use super::*;
    use node_graph::{validate_definition, NodeData};
    use serde_json::json;

    #[test]
    fn test_variadic_sockets() {
        assert!(union().find_input(EXPR).unwrap().variadic);
        assert!(intersection().find_input(EXPR).unwrap().variadic);
        assert!(!complement().find_input(EXPR).unwrap().variadic);
        assert!(difference().inputs.iter().all(|i| i.required && !i.variadic));
    }

    #[test]
    fn test_definitions_are_valid() {
        for definition in [union(), intersection(), difference(), complement(), smooth_union()] {
            let result = validate_definition(&definition);
            assert!(result.is_valid, "{}: {:?}", definition.node_type, result.errors);
        }
    }

    #[test]
    fn test_smooth_union_defaults() {
        let definition = smooth_union();
        let data = definition.default_data(&NodeData::new());
        assert_eq!(data.get("k"), Some(&json!(0.1)));
        assert!(union().default_data(&NodeData::new()).is_empty());
    }
}
