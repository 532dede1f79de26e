//! Node definition registry
//!
//! The registry owns every `NodeDefinition` and indexes them by type, by
//! category and by lowercase tag. It also answers the editor's palette
//! queries: scored search, context menus and statistics.
//!
//! # Usage
//!
//! ```ignore
//! use node_graph::NodeRegistry;
//!
//! let mut registry = NodeRegistry::with_builtins();
//! registry.register(my_definition())?;
//!
//! for hit in registry.search("box", &SearchOptions::default()) {
//!     println!("{} ({:.2})", hit.definition.label, hit.score);
//! }
//! ```
//!
//! There is no process-wide registry; callers construct one and pass it by
//! reference to the factory and to validation.

use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::config::{CategoryConfig, RegistryConfig};
use crate::constants::{defaults, search_weights};
use crate::definition::{validate_definition, DefinitionSummary, NodeDefinition};
use crate::error::{GraphError, Result};

/// Function that builds a node definition, collected at link time
///
/// Node crates submit one per definition:
///
/// ```ignore
/// inventory::submit!(node_graph::DefinitionFn(box_3d));
/// ```
pub struct DefinitionFn(pub fn() -> NodeDefinition);

inventory::collect!(DefinitionFn);

/// Outcome of registering several definitions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub success: usize,
    pub failed: usize,
}

/// Category with its current definition count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub key: String,
    #[serde(flatten)]
    pub config: CategoryConfig,
    pub count: usize,
}

/// Filters for search and menu queries
///
/// `None` fields fall back to the registry configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub category: Option<String>,
    pub include_experimental: Option<bool>,
    pub include_deprecated: Option<bool>,
    pub max_results: Option<usize>,
}

impl SearchOptions {
    pub fn in_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }
}

/// A scored search hit
#[derive(Debug, Clone)]
pub struct SearchResult<'a> {
    pub definition: &'a NodeDefinition,
    pub score: f64,
    /// Fields that matched (`label`, `type`, `tags`, `description` or `label (fuzzy)`)
    pub matched_fields: Vec<&'static str>,
}

/// Entry in the node creation menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub label: String,
    pub node_type: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_nodes: usize,
    pub nodes_by_category: IndexMap<String, usize>,
    pub experimental_nodes: usize,
    pub deprecated_nodes: usize,
}

/// Serializable snapshot of a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryExport {
    pub definitions: Vec<DefinitionSummary>,
    pub config: RegistryConfig,
}

/// Registry of node definitions
pub struct NodeRegistry {
    definitions: IndexMap<String, NodeDefinition>,
    by_category: IndexMap<String, IndexSet<String>>,
    by_tag: IndexMap<String, IndexSet<String>>,
    config: RegistryConfig,
}

impl NodeRegistry {
    /// Create an empty registry with the default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with a custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            definitions: IndexMap::new(),
            by_category: IndexMap::new(),
            by_tag: IndexMap::new(),
            config,
        }
    }

    /// Create a registry holding every definition submitted via `inventory`
    ///
    /// Definitions that fail validation are logged and skipped.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builder in inventory::iter::<DefinitionFn> {
            // Errors are already logged by register
            let _ = registry.register((builder.0)());
        }
        registry
    }

    /// Register a definition
    ///
    /// A definition with structural errors is rejected and the indices are
    /// left untouched. Registering a type that already exists replaces it.
    pub fn register(&mut self, definition: NodeDefinition) -> Result<()> {
        let validation = validate_definition(&definition);
        if !validation.is_valid {
            log::error!(
                "Rejected node definition '{}': {}",
                definition.node_type,
                validation.errors.join("; ")
            );
            return Err(GraphError::invalid_definition(
                definition.node_type,
                validation.errors,
            ));
        }
        for warning in &validation.warnings {
            log::warn!("Node definition '{}': {}", definition.node_type, warning);
        }

        if let Some(previous) = self.definitions.get(&definition.node_type) {
            log::warn!("Replacing node definition '{}'", definition.node_type);
            let (category, tags) = (previous.category.clone(), previous.tags.clone());
            self.unindex(&definition.node_type, &category, &tags);
        }

        let node_type = definition.node_type.clone();
        self.by_category
            .entry(definition.category.clone())
            .or_default()
            .insert(node_type.clone());
        for tag in &definition.tags {
            self.by_tag
                .entry(tag.to_lowercase())
                .or_default()
                .insert(node_type.clone());
        }
        log::debug!("Registered node definition '{}'", node_type);
        self.definitions.insert(node_type, definition);
        Ok(())
    }

    /// Register several definitions, continuing past failures
    pub fn register_many<I>(&mut self, definitions: I) -> RegistrationSummary
    where
        I: IntoIterator<Item = NodeDefinition>,
    {
        let mut summary = RegistrationSummary::default();
        for definition in definitions {
            match self.register(definition) {
                Ok(()) => summary.success += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Remove a definition and its index entries
    pub fn unregister(&mut self, node_type: &str) -> bool {
        match self.definitions.shift_remove(node_type) {
            Some(definition) => {
                self.unindex(node_type, &definition.category, &definition.tags);
                true
            }
            None => false,
        }
    }

    fn unindex(&mut self, node_type: &str, category: &str, tags: &[String]) {
        if let Some(types) = self.by_category.get_mut(category) {
            types.shift_remove(node_type);
            if types.is_empty() {
                self.by_category.shift_remove(category);
            }
        }
        for tag in tags {
            let tag = tag.to_lowercase();
            if let Some(types) = self.by_tag.get_mut(&tag) {
                types.shift_remove(node_type);
                if types.is_empty() {
                    self.by_tag.shift_remove(&tag);
                }
            }
        }
    }

    /// Merge another registry into this one
    ///
    /// Definitions from `other` replace definitions of the same type.
    pub fn merge(&mut self, other: NodeRegistry) -> RegistrationSummary {
        self.register_many(other.definitions.into_values())
    }

    /// Get a definition by type
    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.definitions.get(node_type)
    }

    /// Check if a node type is registered
    pub fn has(&self, node_type: &str) -> bool {
        self.definitions.contains_key(node_type)
    }

    /// All definitions in registration order
    pub fn all(&self) -> Vec<&NodeDefinition> {
        self.definitions.values().collect()
    }

    /// Definitions in a category, in registration order
    pub fn by_category(&self, category: &str) -> Vec<&NodeDefinition> {
        self.lookup(self.by_category.get(category))
    }

    /// Definitions carrying a tag (case-insensitive)
    pub fn by_tag(&self, tag: &str) -> Vec<&NodeDefinition> {
        self.lookup(self.by_tag.get(&tag.to_lowercase()))
    }

    fn lookup(&self, types: Option<&IndexSet<String>>) -> Vec<&NodeDefinition> {
        types
            .map(|types| types.iter().filter_map(|t| self.definitions.get(t)).collect())
            .unwrap_or_default()
    }

    /// List all registered node type strings
    pub fn node_types(&self) -> Vec<&str> {
        self.definitions.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Remove every definition
    pub fn clear(&mut self) {
        self.definitions.clear();
        self.by_category.clear();
        self.by_tag.clear();
    }

    /// Categories sorted by configured order, with current counts
    ///
    /// Categories used by definitions but absent from the configuration
    /// follow the configured ones, by name.
    pub fn categories(&self) -> Vec<CategoryInfo> {
        let mut infos: Vec<CategoryInfo> = self
            .config
            .categories
            .iter()
            .map(|(key, config)| CategoryInfo {
                key: key.clone(),
                config: config.clone(),
                count: self.by_category.get(key).map_or(0, IndexSet::len),
            })
            .collect();
        infos.sort_by_key(|info| info.config.order);

        let mut extra: Vec<CategoryInfo> = self
            .by_category
            .iter()
            .filter(|(key, _)| !self.config.categories.contains_key(key.as_str()))
            .map(|(key, types)| CategoryInfo {
                key: key.clone(),
                config: CategoryConfig::new(key.clone(), String::new(), u32::MAX),
                count: types.len(),
            })
            .collect();
        extra.sort_by(|a, b| a.key.cmp(&b.key));
        infos.extend(extra);
        infos
    }

    fn is_visible(&self, definition: &NodeDefinition, options: &SearchOptions) -> bool {
        let experimental = options
            .include_experimental
            .unwrap_or(self.config.ui.show_experimental);
        let deprecated = options
            .include_deprecated
            .unwrap_or(self.config.ui.show_deprecated);
        (experimental || !definition.experimental) && (deprecated || !definition.deprecated)
    }

    fn candidates(&self, options: &SearchOptions) -> Vec<&NodeDefinition> {
        let definitions = match &options.category {
            Some(category) => self.by_category(category),
            None => self.all(),
        };
        definitions
            .into_iter()
            .filter(|d| self.is_visible(d, options))
            .collect()
    }

    /// Search definitions by relevance
    ///
    /// Each configured field scores its weight times the match tier (exact,
    /// prefix or substring); field scores add up. When nothing matched and
    /// fuzzy search is enabled, an in-order character match on the label may
    /// contribute a reduced score. Ties go to the shorter label, then to
    /// label order. A blank query lists every visible definition.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchResult<'_>> {
        let max_results = options.max_results.unwrap_or(self.config.search.max_results);
        let candidates = self.candidates(options);

        if query.trim().is_empty() {
            return candidates
                .into_iter()
                .take(max_results)
                .map(|definition| SearchResult {
                    definition,
                    score: 1.0,
                    matched_fields: Vec::new(),
                })
                .collect();
        }

        let query = query.to_lowercase();
        let fields = &self.config.search.search_fields;
        let mut results: Vec<SearchResult<'_>> = candidates
            .into_iter()
            .filter_map(|definition| {
                let mut score = 0.0;
                let mut matched_fields = Vec::new();

                let mut field = |enabled: bool, name: &'static str, text: String, weight: f64| {
                    if !enabled {
                        return;
                    }
                    if let Some(tier) = match_tier(&text.to_lowercase(), &query) {
                        score += weight * tier;
                        matched_fields.push(name);
                    }
                };
                field(fields.label, "label", definition.label.clone(), search_weights::LABEL);
                field(fields.node_type, "type", definition.node_type.clone(), search_weights::TYPE);
                field(fields.tags, "tags", definition.tags.join(" "), search_weights::TAGS);
                field(
                    fields.description,
                    "description",
                    definition.description.clone().unwrap_or_default(),
                    search_weights::DESCRIPTION,
                );

                if matched_fields.is_empty() && self.config.search.fuzzy_search {
                    let fuzzy = fuzzy_score(&query, &definition.label.to_lowercase());
                    if fuzzy > defaults::FUZZY_THRESHOLD {
                        score += fuzzy * defaults::FUZZY_WEIGHT;
                        matched_fields.push("label (fuzzy)");
                    }
                }

                (score > 0.0).then_some(SearchResult {
                    definition,
                    score,
                    matched_fields,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.definition.label.len().cmp(&b.definition.label.len()))
                .then_with(|| a.definition.label.cmp(&b.definition.label))
        });
        results.truncate(max_results);
        results
    }

    /// Menu entries for node creation
    pub fn context_menu_items(&self, options: &SearchOptions) -> Vec<MenuItem> {
        self.candidates(options)
            .into_iter()
            .map(|definition| MenuItem {
                label: definition.label.clone(),
                node_type: definition.node_type.clone(),
                category: definition.category.clone(),
                description: definition.description.clone(),
                icon: definition.icon.clone(),
            })
            .collect()
    }

    /// Menu entries grouped by configured category
    ///
    /// Every configured category appears, even when empty.
    pub fn categorized_context_menu(&self, options: &SearchOptions) -> IndexMap<String, Vec<MenuItem>> {
        self.config
            .categories
            .keys()
            .map(|category| {
                let options = SearchOptions {
                    category: Some(category.clone()),
                    ..options.clone()
                };
                (category.clone(), self.context_menu_items(&options))
            })
            .collect()
    }

    /// Count definitions by category and flag
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total_nodes: self.definitions.len(),
            nodes_by_category: self
                .config
                .categories
                .keys()
                .map(|k| (k.clone(), 0))
                .collect(),
            ..RegistryStats::default()
        };
        for definition in self.definitions.values() {
            *stats
                .nodes_by_category
                .entry(definition.category.clone())
                .or_insert(0) += 1;
            if definition.experimental {
                stats.experimental_nodes += 1;
            }
            if definition.deprecated {
                stats.deprecated_nodes += 1;
            }
        }
        stats
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Replace the configuration
    pub fn update_config(&mut self, config: RegistryConfig) {
        self.config = config;
    }

    /// Export definition metadata and configuration
    pub fn export(&self) -> RegistryExport {
        RegistryExport {
            definitions: self.definitions.values().map(NodeDefinition::summary).collect(),
            config: self.config.clone(),
        }
    }

    /// Rebuild a registry from an export
    ///
    /// Imported definitions produce their declared defaults and carry no
    /// validator.
    pub fn import(export: RegistryExport) -> (Self, RegistrationSummary) {
        let mut registry = Self::with_config(export.config);
        let summary = registry.register_many(export.definitions.into_iter().map(NodeDefinition::from));
        (registry, summary)
    }

    /// Number of definitions per tag
    pub fn tag_counts(&self) -> HashMap<&str, usize> {
        self.by_tag
            .iter()
            .map(|(tag, types)| (tag.as_str(), types.len()))
            .collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("node_types", &self.node_types())
            .finish_non_exhaustive()
    }
}

fn match_tier(text: &str, query: &str) -> Option<f64> {
    if text == query {
        Some(search_weights::EXACT)
    } else if text.starts_with(query) {
        Some(search_weights::PREFIX)
    } else if text.contains(query) {
        Some(search_weights::SUBSTRING)
    } else {
        None
    }
}

/// Fraction of query characters found in order in the target
fn fuzzy_score(query: &str, target: &str) -> f64 {
    let query: Vec<char> = query.chars().collect();
    if query.is_empty() || target.is_empty() {
        return 0.0;
    }
    let mut matched = 0;
    for c in target.chars() {
        if matched == query.len() {
            break;
        }
        if c == query[matched] {
            matched += 1;
        }
    }
    matched as f64 / query.len() as f64
}
