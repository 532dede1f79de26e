//! Variadic input policy
//!
//! Decides whether an input socket accepts several connections. Inputs not
//! listed are single-connection: connecting to them replaces the existing
//! connection.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::registry::NodeRegistry;

/// Mapping of node type to its variadic input keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariadicPolicy {
    inputs: HashMap<String, HashSet<String>>,
}

impl VariadicPolicy {
    /// A policy where every input is single-connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the policy from the inputs each definition declares variadic
    pub fn from_registry(registry: &NodeRegistry) -> Self {
        let mut policy = Self::new();
        for definition in registry.all() {
            for input in definition.inputs.iter().filter(|i| i.variadic) {
                policy.allow(definition.node_type.clone(), input.key.clone());
            }
        }
        policy
    }

    /// Mark an input as variadic
    pub fn allow(&mut self, node_type: impl Into<String>, input: impl Into<String>) {
        self.inputs
            .entry(node_type.into())
            .or_default()
            .insert(input.into());
    }

    /// Builder form of [`allow`](Self::allow)
    pub fn with(mut self, node_type: impl Into<String>, input: impl Into<String>) -> Self {
        self.allow(node_type, input);
        self
    }

    /// Mark an input as single-connection
    pub fn deny(&mut self, node_type: &str, input: &str) {
        if let Some(inputs) = self.inputs.get_mut(node_type) {
            inputs.remove(input);
            if inputs.is_empty() {
                self.inputs.remove(node_type);
            }
        }
    }

    pub fn is_variadic(&self, node_type: &str, input: &str) -> bool {
        self.inputs
            .get(node_type)
            .is_some_and(|inputs| inputs.contains(input))
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl<T, I> FromIterator<(T, I)> for VariadicPolicy
where
    T: Into<String>,
    I: Into<String>,
{
    fn from_iter<It: IntoIterator<Item = (T, I)>>(iter: It) -> Self {
        let mut policy = Self::new();
        for (node_type, input) in iter {
            policy.allow(node_type, input);
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{InputDefinition, NodeDefinition};
    use crate::types::SocketType;

    #[test]
    fn test_absent_entries_are_single() {
        let policy = VariadicPolicy::new();
        assert!(!policy.is_variadic("Union", "expr"));
    }

    #[test]
    fn test_allow_and_deny() {
        let mut policy: VariadicPolicy = [("Union", "expr")].into_iter().collect();
        assert!(policy.is_variadic("Union", "expr"));
        assert!(!policy.is_variadic("Union", "k"));
        assert!(!policy.is_variadic("Translate3D", "expr"));

        policy.deny("Union", "expr");
        assert!(!policy.is_variadic("Union", "expr"));
        assert!(policy.is_empty());
    }

    #[test]
    fn test_from_registry() {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                NodeDefinition::new("Union", "Union", "Combinators")
                    .with_input(InputDefinition::required("expr", "Expr", SocketType::ExprSocket).variadic())
                    .with_input(InputDefinition::optional("k", "K", SocketType::FloatSocket)),
            )
            .unwrap();
        let policy = VariadicPolicy::from_registry(&registry);
        assert!(policy.is_variadic("Union", "expr"));
        assert!(!policy.is_variadic("Union", "k"));
    }

    #[test]
    fn test_serializes_as_map() {
        let policy = VariadicPolicy::new().with("Union", "expr");
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json, serde_json::json!({ "Union": ["expr"] }));
    }
}
