//! # shelfx Core
//!
//! Core library for the shelfx layout engine.
//!
//! This crate provides the data structures and the placement search:
//!
//! - [`Product`] / [`ProductList`] - catalog items, identified by name
//! - [`SimilarityTable`] - symmetric pairwise similarity in `[0, 1]`
//! - [`Grid`] - a fixed-size matrix of optional product names
//! - [`Algorithm`] - exhaustive (branch and bound) and hill-climbing placement
//! - [`Distribution`] - one arrangement with a name-to-cell index
//! - [`Shelf`] - capacity, assigned products and the distribution history
//!
//! ## Example
//!
//! ```rust
//! use shelfx_core::{Algorithm, Product, ProductList, Shelf, ShelfConfig, SimilarityTable};
//! use std::sync::Arc;
//!
//! let products = ProductList::new(
//!     "deli",
//!     vec![Product::new("ham"), Product::new("salami"), Product::new("brie")],
//! )
//! .unwrap();
//! let similarity = SimilarityTable::new().with("ham", "salami", 0.9).unwrap();
//!
//! let shelf = Shelf::new(ShelfConfig { id: 1, xsize: 2, ysize: 2 }, Arc::new(products)).unwrap();
//! let distribution = shelf
//!     .generate_distribution("morning", Algorithm::Exhaustive, -1, &similarity)
//!     .unwrap();
//! assert!(distribution.grid().are_adjacent("ham", "salami"));
//! ```

pub mod error;
pub mod product;
pub mod similarity;
pub mod catalog;
pub mod grid;
pub mod placement;
mod exhaustive;
mod hill_climbing;
pub mod distribution;
pub mod shelf;

pub use error::{Error, Result};
pub use product::{Product, ProductList};
pub use similarity::{SimilarityEntry, SimilarityTable, SELF_SIMILARITY};
pub use catalog::Catalog;
pub use grid::{Coord, CoordinateIndex, Grid, GridShape};
pub use placement::{Algorithm, Placement, SearchLimit, IMPROVEMENT_EPSILON};
pub use distribution::Distribution;
pub use shelf::{HistoryEntry, Shelf, ShelfConfig};
