//! Configuration types for the registry, factory and manager

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{defaults, layout};

/// Display metadata for a node category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryConfig {
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Sort key for menus (ascending)
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl CategoryConfig {
    pub fn new(label: impl Into<String>, description: impl Into<String>, order: u32) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            order,
            icon: None,
        }
    }
}

/// Fields consulted by registry search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFields {
    pub label: bool,
    pub node_type: bool,
    pub tags: bool,
    pub description: bool,
}

impl SearchFields {
    pub const ALL: SearchFields = SearchFields {
        label: true,
        node_type: true,
        tags: true,
        description: true,
    };
}

impl Default for SearchFields {
    fn default() -> Self {
        Self::ALL
    }
}

/// Registry search behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Fall back to in-order character matching on labels
    pub fuzzy_search: bool,
    pub search_fields: SearchFields,
    pub max_results: usize,
}

/// Default search configuration
pub const DEFAULT_SEARCH_CONFIG: SearchConfig = SearchConfig {
    fuzzy_search: true,
    search_fields: SearchFields::ALL,
    max_results: defaults::MAX_SEARCH_RESULTS,
};

impl Default for SearchConfig {
    fn default() -> Self {
        DEFAULT_SEARCH_CONFIG
    }
}

/// Menu visibility settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    pub show_experimental: bool,
    pub show_deprecated: bool,
    pub default_category: String,
}

/// Default UI configuration
pub const DEFAULT_UI_CONFIG: UiConfig = UiConfig {
    show_experimental: true,
    show_deprecated: false,
    default_category: String::new(),
};

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_category: defaults::CATEGORY.to_string(),
            ..DEFAULT_UI_CONFIG
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Known categories keyed by name
    pub categories: IndexMap<String, CategoryConfig>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            search: SearchConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

/// The stock category set, ordered for menus
pub fn default_categories() -> IndexMap<String, CategoryConfig> {
    [
        ("Primitives", "Primitives", "Basic geometric shapes", 1),
        ("Transforms", "Transforms", "Position, rotation and scale operations", 2),
        ("Combinators", "Combinators", "Boolean and blending operations", 3),
        ("Math", "Math", "Mathematical operations", 4),
        ("Variables", "Variables", "Variables and constants", 5),
        ("Materials", "Materials", "Material and shading nodes", 6),
        ("Utilities", "Utilities", "Helper and utility nodes", 7),
        ("Advanced", "Advanced", "Advanced and experimental nodes", 8),
        ("auto", "Auto-Generated", "Nodes generated from external schemas", 9),
    ]
    .into_iter()
    .map(|(key, label, description, order)| {
        (key.to_string(), CategoryConfig::new(label, description, order))
    })
    .collect()
}

/// Grid used to place nodes without an explicit position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLayoutConfig {
    pub grid_size: f64,
    pub start_x: f64,
    pub start_y: f64,
    pub max_columns: usize,
    pub max_rows: usize,
    /// Clearance kept around existing nodes
    pub padding: f64,
    /// Size of nodes whose definition has no dimensions
    pub default_width: f64,
    pub default_height: f64,
}

impl Default for AutoLayoutConfig {
    fn default() -> Self {
        Self {
            grid_size: layout::GRID_SIZE,
            start_x: layout::ORIGIN_X,
            start_y: layout::ORIGIN_Y,
            max_columns: layout::MAX_COLUMNS,
            max_rows: layout::MAX_ROWS,
            padding: layout::PADDING,
            default_width: layout::NODE_WIDTH,
            default_height: layout::NODE_HEIGHT,
        }
    }
}

/// Graph manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerConfig {
    /// Change records kept before the oldest is evicted
    pub max_history: usize,
    /// Module used when exporting without an explicit name
    pub default_module: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_history: defaults::MAX_HISTORY,
            default_module: defaults::MODULE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories_are_ordered() {
        let categories = default_categories();
        assert_eq!(categories.len(), 9);
        let orders: Vec<u32> = categories.values().map(|c| c.order).collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
        assert_eq!(categories["auto"].label, "Auto-Generated");
    }

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert!(config.search.fuzzy_search);
        assert_eq!(config.search.max_results, 20);
        assert!(config.ui.show_experimental);
        assert!(!config.ui.show_deprecated);
        assert_eq!(config.ui.default_category, "Primitives");

        let layout = AutoLayoutConfig::default();
        assert_eq!(layout.grid_size, 250.0);
        assert_eq!((layout.start_x, layout.start_y), (100.0, 100.0));

        assert_eq!(ManagerConfig::default().max_history, 50);
    }

    #[test]
    fn test_partial_registry_config_deserializes() {
        let config: RegistryConfig = serde_json::from_value(serde_json::json!({
            "categories": { "Math": { "label": "Math", "order": 1 } }
        }))
        .unwrap();
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.search, DEFAULT_SEARCH_CONFIG);
    }
}
