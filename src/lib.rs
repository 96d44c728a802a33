//! # shelfx
//!
//! A similarity-driven shelf layout engine.
//!
//! shelfx arranges the products assigned to a shelf on a fixed grid so that
//! products that sell together end up next to each other. Every arrangement is
//! kept as a named distribution in the shelf's history; the most recent one is
//! the current layout.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! shelfx generate --catalog catalog.json --list deli --xsize 4 --ysize 3 \
//!     --algorithm hill-climbing --limit 1000 --name morning --data-dir ./data
//! shelfx show ./data/shelves/0/morning.txt --catalog catalog.json
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use shelfx::prelude::*;
//!
//! let mut catalog = Catalog::new(
//!     SimilarityTable::new()
//!         .with("P1", "P2", 0.9).unwrap()
//!         .with("P3", "P4", 0.9).unwrap(),
//! );
//! let names = ["P1", "P2", "P3", "P4"];
//! catalog.add_product_list(
//!     ProductList::new("deli", names.iter().map(|n| Product::new(*n)).collect()).unwrap(),
//! );
//!
//! let manager = ShelfManager::new(catalog);
//! manager.create_shelf(ShelfConfig { id: 1, xsize: 2, ysize: 2 }, "deli").unwrap();
//! let distribution = manager
//!     .generate_distribution(1, "morning", Algorithm::Exhaustive, -1)
//!     .unwrap();
//! assert!(distribution.grid().are_adjacent("P1", "P2"));
//! ```
//!
//! ## Crate Structure
//!
//! - `shelfx-core` - products, similarity, grids, placement search, shelves
//! - `shelfx-storage` - text format, on-disk store and the shelf manager

// Re-export core types
pub use shelfx_core::{
    Algorithm, Catalog, Coord, CoordinateIndex, Distribution, Error, Grid, GridShape,
    HistoryEntry, Placement, Product, ProductList, Result, SearchLimit, Shelf, ShelfConfig,
    SimilarityEntry, SimilarityTable,
};

// Re-export storage
pub use shelfx_storage::{DistributionStore, ManagerConfig, ShelfManager};

/// Text form of distributions
pub mod text_format {
    pub use shelfx_storage::text_format::{
        read_distribution, write_distribution, CREATED_PREFIX, EMPTY_MARKER, MODIFIED_PREFIX,
    };
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Algorithm, Catalog, Coord, Distribution, Error, Grid, Product, ProductList, Result,
        Shelf, ShelfConfig, ShelfManager, SimilarityTable,
    };
}
