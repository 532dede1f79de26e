//! Graph-wide constants
//!
//! Single source of truth for layout numbers and configuration defaults.

/// Default values for registry, factory and manager configuration
pub mod defaults {
    /// Maximum number of search results
    pub const MAX_SEARCH_RESULTS: usize = 20;
    /// Minimum fuzzy score before a fuzzy match counts
    pub const FUZZY_THRESHOLD: f64 = 0.3;
    /// Weight applied to fuzzy scores
    pub const FUZZY_WEIGHT: f64 = 0.3;
    /// Category used when none is specified
    pub const CATEGORY: &str = "Primitives";
    /// Number of change records kept by a manager
    pub const MAX_HISTORY: usize = 50;
    /// Module read and written when none is specified
    pub const MODULE: &str = "base";
}

/// Auto-layout grid for new nodes
pub mod layout {
    /// Distance between grid cells
    pub const GRID_SIZE: f64 = 250.0;
    /// Top-left cell of the grid
    pub const ORIGIN_X: f64 = 100.0;
    pub const ORIGIN_Y: f64 = 100.0;
    pub const MAX_COLUMNS: usize = 10;
    pub const MAX_ROWS: usize = 10;
    /// Clearance kept around existing nodes
    pub const PADDING: f64 = 50.0;
    /// Size assumed for nodes whose definition has no dimensions
    pub const NODE_WIDTH: f64 = 180.0;
    pub const NODE_HEIGHT: f64 = 80.0;
    /// Extent of the random fallback area when the grid is full
    pub const FALLBACK_SPAN: f64 = 500.0;
    /// Offset applied to cloned nodes
    pub const CLONE_OFFSET: f64 = 50.0;
}

/// Search field weights
pub mod search_weights {
    pub const LABEL: f64 = 3.0;
    pub const TYPE: f64 = 2.0;
    pub const TAGS: f64 = 1.5;
    pub const DESCRIPTION: f64 = 1.0;

    /// Score tiers, multiplied by the field weight
    pub const EXACT: f64 = 1.0;
    pub const PREFIX: f64 = 0.8;
    pub const SUBSTRING: f64 = 0.5;
}

/// zstd level used for history snapshots
pub const SNAPSHOT_COMPRESSION_LEVEL: i32 = 3;
