//! Node Graph - in-memory core of the geometry node editor
//!
//! This crate holds everything the editor needs below the canvas:
//!
//! - Node definitions (sockets, controls, default data, validators)
//! - A definition registry with category indices and scored search
//! - A node factory with auto-layout placement
//! - The graph store with cascading removal
//! - A manager enforcing connection rules, emitting events and keeping history
//! - Guide document serialization for persistence and exchange
//!
//! # Architecture
//!
//! Definitions are registered in a [`NodeRegistry`], usually collected at
//! link time from node crates via [`DefinitionFn`]. The [`NodeFactory`]
//! borrows a registry to build [`NodeInstance`]s, which are handed to a
//! [`GraphManager`]. The manager owns the [`Graph`] and is the only place
//! mutations happen; subscribers observe them through [`GraphEvent`]s.
//!
//! # Example
//!
//! ```ignore
//! use node_graph::{GraphManager, NodeCreationOptions, NodeFactory, NodeRegistry, Position};
//!
//! let registry = NodeRegistry::with_builtins();
//! let mut factory = NodeFactory::new(&registry);
//! let mut manager = GraphManager::new();
//!
//! let created = factory.create_node("Box3D", NodeCreationOptions::at(Position::new(0.0, 0.0)))?;
//! manager.add_node(created.node);
//! ```

pub mod config;
pub mod constants;
pub mod definition;
pub mod error;
pub mod events;
pub mod factory;
pub mod graph;
pub mod history;
pub mod manager;
pub mod policy;
pub mod registry;
pub mod serialization;
pub mod types;
pub mod validation;

// Re-export key types
pub use config::{AutoLayoutConfig, CategoryConfig, ManagerConfig, RegistryConfig};
pub use definition::{
    validate_definition, ControlConfig, ControlDefinition, ControlType, InputDefinition, NodeDefinition,
    OutputDefinition,
};
pub use error::{GraphError, Result};
pub use events::{
    ConnectionAdded, ConnectionRemoved, EventError, EventSink, GraphCleared, GraphEvent, GraphEventKind,
    GraphLoaded, ListenerId, NodeAdded, NodeMoved, NodeRemoved, NodeUpdated, NullEventSink, RemovalReason,
    VecEventSink,
};
pub use factory::{CreatedNode, NodeCreationOptions, NodeFactory, NodeTemplate};
pub use graph::{Graph, GraphStats};
pub use history::{ChangeHistory, ChangeKind, ChangeRecord};
pub use manager::GraphManager;
pub use policy::VariadicPolicy;
pub use registry::{DefinitionFn, NodeRegistry, SearchOptions, SearchResult};
pub use serialization::{from_guide_json, to_guide_json, validate_guide_json, GuideDocument};
pub use types::{Connection, ConnectionId, NodeData, NodeId, NodeInstance, Position, SocketType, ValidationResult};
pub use validation::{validate_graph, GraphValidationReport, ValidationIssue};
