//! Geometry Nodes
//!
//! Built-in node definitions for the geometry editor. Each definition is
//! submitted through `inventory`, so linking this crate is enough for
//! [`NodeRegistry::with_builtins`] to find them.
//!
//! # Categories
//!
//! - **Primitives**: Signed-distance shapes (box, sphere, torus...)
//! - **Transforms**: Translate, rotate and scale an expression
//! - **Combinators**: Boolean and blending operations

pub mod combinators;
mod params;
pub mod primitives;
pub mod transforms;

pub use params::EXPR;

use node_graph::{NodeRegistry, VariadicPolicy};

/// Registry holding every built-in geometry node
pub fn builtin_registry() -> NodeRegistry {
    let registry = NodeRegistry::with_builtins();
    log::debug!("Loaded {} built-in node definitions", registry.len());
    registry
}

/// Variadic inputs declared by the built-in definitions
pub fn builtin_variadic_policy() -> VariadicPolicy {
    VariadicPolicy::from_registry(&builtin_registry())
}
