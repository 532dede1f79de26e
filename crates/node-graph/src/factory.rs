//! Node factory
//!
//! Builds `NodeInstance`s from registered definitions: merges caller data
//! over the definition's defaults, runs the validator and picks an id and a
//! canvas position.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AutoLayoutConfig;
use crate::constants::layout;
use crate::definition::NodeDefinition;
use crate::error::{GraphError, Result};
use crate::registry::{NodeRegistry, RegistryStats};
use crate::types::{NodeData, NodeId, NodeInstance, Position, ValidationResult};

/// Options for creating a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCreationOptions {
    /// Canvas position, origin when absent
    pub position: Option<Position>,
    /// Caller data, overlaid on the definition defaults
    pub data: NodeData,
    /// Explicit id, generated when absent
    pub id: Option<NodeId>,
    /// Run the definition validator
    pub validate: bool,
}

impl Default for NodeCreationOptions {
    fn default() -> Self {
        Self {
            position: None,
            data: NodeData::new(),
            id: None,
            validate: true,
        }
    }
}

impl NodeCreationOptions {
    pub fn at(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

/// A created node and any validator warnings
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedNode {
    pub node: NodeInstance,
    pub warnings: Vec<String>,
}

/// One entry of a batch creation
#[derive(Debug, Clone)]
pub struct NodeRequest {
    pub node_type: String,
    pub options: NodeCreationOptions,
}

impl NodeRequest {
    pub fn new(node_type: impl Into<String>, options: NodeCreationOptions) -> Self {
        Self {
            node_type: node_type.into(),
            options,
        }
    }
}

/// Failure of one batch entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchError {
    pub node_type: String,
    pub error: String,
}

/// Outcome of a batch creation
#[derive(Debug, Clone, Default)]
pub struct BatchCreationResult {
    pub success: usize,
    pub failed: usize,
    pub nodes: Vec<NodeInstance>,
    pub errors: Vec<BatchError>,
}

/// A node to copy from, as stored in an editor clipboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Editor state used to place a node sensibly
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementContext<'a> {
    pub existing_nodes: &'a [NodeInstance],
    pub last_click: Option<Position>,
}

/// Factory statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryStats {
    pub available_types: usize,
    pub nodes_created: u64,
    pub registry: RegistryStats,
}

/// Creates node instances from registry definitions
pub struct NodeFactory<'r> {
    registry: &'r NodeRegistry,
    layout: AutoLayoutConfig,
    counter: u64,
}

impl<'r> NodeFactory<'r> {
    /// Create a factory over a registry
    pub fn new(registry: &'r NodeRegistry) -> Self {
        Self::with_layout(registry, AutoLayoutConfig::default())
    }

    /// Create a factory with a custom auto-layout grid
    pub fn with_layout(registry: &'r NodeRegistry, layout: AutoLayoutConfig) -> Self {
        Self {
            registry,
            layout,
            counter: 0,
        }
    }

    /// Create a node of a registered type
    ///
    /// Caller data wins over the definition defaults key by key. When
    /// validation is enabled a validator error fails the creation; warnings
    /// are returned alongside the node.
    pub fn create_node(&mut self, node_type: &str, options: NodeCreationOptions) -> Result<CreatedNode> {
        let definition = self
            .registry
            .get(node_type)
            .ok_or_else(|| GraphError::UnknownNodeType(node_type.to_string()))?;

        let mut data = definition.default_data(&options.data);
        for (key, value) in options.data {
            data.insert(key, value);
        }

        let mut warnings = Vec::new();
        if options.validate {
            let validation = definition.validate_data(&data);
            if !validation.is_valid {
                return Err(GraphError::DataValidation {
                    node_type: node_type.to_string(),
                    errors: validation.errors,
                    warnings: validation.warnings,
                });
            }
            warnings = validation.warnings;
        }

        let id = match options.id {
            Some(id) => id,
            None => self.generate_id(node_type),
        };
        let position = options.position.unwrap_or_default();
        log::debug!("Created node '{}' of type '{}'", id, node_type);

        Ok(CreatedNode {
            node: NodeInstance::with_id(id, node_type, data, position),
            warnings,
        })
    }

    /// Create several nodes; each entry succeeds or fails on its own
    pub fn create_nodes<I>(&mut self, requests: I) -> BatchCreationResult
    where
        I: IntoIterator<Item = NodeRequest>,
    {
        let mut result = BatchCreationResult::default();
        for request in requests {
            match self.create_node(&request.node_type, request.options) {
                Ok(created) => {
                    result.success += 1;
                    result.nodes.push(created.node);
                }
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(BatchError {
                        node_type: request.node_type,
                        error: e.to_string(),
                    });
                }
            }
        }
        result
    }

    /// Create a node at the first free cell of the auto-layout grid
    pub fn create_node_with_auto_position(
        &mut self,
        node_type: &str,
        existing_nodes: &[NodeInstance],
        options: NodeCreationOptions,
    ) -> Result<CreatedNode> {
        let position = self.auto_position(node_type, existing_nodes);
        self.create_node(
            node_type,
            NodeCreationOptions {
                position: Some(position),
                ..options
            },
        )
    }

    /// Copy a node under a new id, offset from the original
    ///
    /// The source is taken as already valid, so the copy is never
    /// validated and `options.validate` is ignored. An empty `options.data`
    /// copies the source data.
    pub fn clone_node(&mut self, source: &NodeInstance, options: NodeCreationOptions) -> Result<CreatedNode> {
        let data = if options.data.is_empty() {
            source.data.clone()
        } else {
            options.data
        };
        let position = options
            .position
            .unwrap_or_else(|| source.position.offset(layout::CLONE_OFFSET, layout::CLONE_OFFSET));
        self.create_node(
            &source.node_type,
            NodeCreationOptions {
                position: Some(position),
                data,
                id: options.id,
                validate: false,
            },
        )
    }

    /// Create a node from a stored template
    ///
    /// Non-empty `options.data` and an explicit position override the
    /// template's.
    pub fn create_from_template(&mut self, template: &NodeTemplate, options: NodeCreationOptions) -> Result<CreatedNode> {
        let data = if options.data.is_empty() {
            template.data.clone()
        } else {
            options.data
        };
        self.create_node(
            &template.node_type,
            NodeCreationOptions {
                position: options.position.or(template.position),
                data,
                ..options
            },
        )
    }

    /// Create a node placed from editor context
    ///
    /// Position precedence: explicit option, last click, auto-layout.
    pub fn create_smart_node(
        &mut self,
        node_type: &str,
        context: PlacementContext<'_>,
        options: NodeCreationOptions,
    ) -> Result<CreatedNode> {
        if !self.registry.has(node_type) {
            return Err(GraphError::UnknownNodeType(node_type.to_string()));
        }
        let position = options
            .position
            .or(context.last_click)
            .unwrap_or_else(|| self.auto_position(node_type, context.existing_nodes));
        self.create_node(
            node_type,
            NodeCreationOptions {
                position: Some(position),
                ..options
            },
        )
    }

    /// Run a node's definition validator against its current data
    pub fn validate_node_data(&self, node: &NodeInstance) -> ValidationResult {
        match self.registry.get(&node.node_type) {
            Some(definition) => definition.validate_data(&node.data),
            None => ValidationResult::from_diagnostics(
                vec![format!("Unknown node type: {}", node.node_type)],
                Vec::new(),
            ),
        }
    }

    /// Registered types, in registration order
    pub fn available_types(&self) -> Vec<&str> {
        self.registry.node_types()
    }

    pub fn definition(&self, node_type: &str) -> Option<&'r NodeDefinition> {
        self.registry.get(node_type)
    }

    pub fn has_type(&self, node_type: &str) -> bool {
        self.registry.has(node_type)
    }

    pub fn stats(&self) -> FactoryStats {
        FactoryStats {
            available_types: self.registry.len(),
            nodes_created: self.counter,
            registry: self.registry.stats(),
        }
    }

    /// Reset the generated-id counter
    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }

    fn generate_id(&mut self, node_type: &str) -> NodeId {
        self.counter += 1;
        format!("{}-{}-{}", node_type.to_lowercase(), self.counter, Uuid::new_v4().simple())
    }

    fn node_size(&self, node_type: &str) -> (f64, f64) {
        self.registry
            .get(node_type)
            .and_then(|d| d.dimensions)
            .map(|d| (d.width, d.height))
            .unwrap_or((self.layout.default_width, self.layout.default_height))
    }

    /// First grid cell whose padded box overlaps no existing node
    ///
    /// Falls back to a random position when every cell is taken.
    pub fn auto_position(&self, node_type: &str, existing_nodes: &[NodeInstance]) -> Position {
        let (width, height) = self.node_size(node_type);
        let padding = self.layout.padding;

        for row in 0..self.layout.max_rows {
            for col in 0..self.layout.max_columns {
                let x = self.layout.start_x + col as f64 * self.layout.grid_size;
                let y = self.layout.start_y + row as f64 * self.layout.grid_size;

                let occupied = existing_nodes.iter().any(|node| {
                    let (w, h) = self.node_size(&node.node_type);
                    x < node.position.x + w + padding
                        && x + width + padding > node.position.x
                        && y < node.position.y + h + padding
                        && y + height + padding > node.position.y
                });
                if !occupied {
                    return Position::new(x, y);
                }
            }
        }

        fallback_position(&mut rand::rng(), &self.layout)
    }
}

fn fallback_position<R: Rng>(rng: &mut R, grid: &AutoLayoutConfig) -> Position {
    let span = layout::FALLBACK_SPAN;
    Position::new(
        grid.start_x + rng.random_range(0.0..span),
        grid.start_y + rng.random_range(0.0..span),
    )
}
