use crate::grid::GridShape;
use crate::{Algorithm, Coord, Distribution, Error, ProductList, Result, SimilarityTable};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for a shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfConfig {
    pub id: u32,
    pub xsize: usize,
    pub ysize: usize,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            id: 0,
            xsize: 4,
            ysize: 3,
        }
    }
}

impl ShelfConfig {
    fn shape(&self) -> Result<GridShape> {
        let xsize = i64::try_from(self.xsize).unwrap_or(i64::MAX);
        let ysize = i64::try_from(self.ysize).unwrap_or(i64::MAX);
        GridShape::from_dimensions(xsize, ysize)
    }
}

/// Summary of one history entry, in history order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    pub modified_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

struct ShelfState {
    products: Arc<ProductList>,
    history: Vec<Distribution>,
}

impl ShelfState {
    fn position(&self, name: &str) -> Option<usize> {
        self.history.iter().position(|d| d.name() == name)
    }
}

/// A fixed-size grid of slots with the history of its product arrangements.
///
/// The current distribution is the last one in the history. All reads and
/// updates of products and history go through one lock, so generate-and-append
/// and promote are atomic with respect to each other.
pub struct Shelf {
    config: ShelfConfig,
    shape: GridShape,
    state: Mutex<ShelfState>,
}

impl Shelf {
    pub fn new(config: ShelfConfig, products: Arc<ProductList>) -> Result<Self> {
        let shape = config.shape()?;
        check_capacity(&products, shape)?;
        Ok(Self {
            config,
            shape,
            state: Mutex::new(ShelfState {
                products,
                history: Vec::new(),
            }),
        })
    }

    pub fn id(&self) -> u32 {
        self.config.id
    }

    pub fn config(&self) -> ShelfConfig {
        self.config
    }

    pub fn xsize(&self) -> usize {
        self.config.xsize
    }

    pub fn ysize(&self) -> usize {
        self.config.ysize
    }

    pub fn max_capacity(&self) -> usize {
        self.shape.cells()
    }

    pub fn products(&self) -> Arc<ProductList> {
        self.state.lock().products.clone()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Names in history order, oldest first.
    pub fn distribution_names(&self) -> Vec<String> {
        self.state
            .lock()
            .history
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Run a placement search and append the result as the current
    /// distribution.
    pub fn generate_distribution(
        &self,
        name: &str,
        algorithm: Algorithm,
        limit: i64,
        similarity: &SimilarityTable,
    ) -> Result<Distribution> {
        let mut state = self.state.lock();
        if state.position(name).is_some() {
            return Err(Error::DuplicateDistribution(name.to_string()));
        }

        let prior = state.history.last().map(|d| d.coordinate_index());
        let grid = algorithm.solve(
            &state.products,
            self.shape.cols as i64,
            self.shape.rows as i64,
            limit,
            similarity,
            prior,
        )?;
        let distribution = Distribution::from_grid(name, grid)?;
        debug_assert!(distribution.product_count() <= self.max_capacity());

        state.history.push(distribution.clone());
        info!(
            shelf = self.config.id,
            distribution = name,
            %algorithm,
            "generated distribution"
        );
        Ok(distribution)
    }

    /// Append a distribution rebuilt from storage.
    pub fn restore_distribution(&self, distribution: Distribution) -> Result<()> {
        if distribution.rows() != self.shape.rows || distribution.cols() != self.shape.cols {
            return Err(Error::DimensionMismatch {
                expected_rows: self.shape.rows,
                expected_cols: self.shape.cols,
                rows: distribution.rows(),
                cols: distribution.cols(),
            });
        }
        let mut state = self.state.lock();
        if state.position(distribution.name()).is_some() {
            return Err(Error::DuplicateDistribution(distribution.name().to_string()));
        }
        state.history.push(distribution);
        Ok(())
    }

    /// Make an existing distribution current by moving it to the end of the
    /// history.
    pub fn promote(&self, name: &str) -> Result<Distribution> {
        let mut state = self.state.lock();
        let position = state
            .position(name)
            .ok_or_else(|| Error::DistributionNotFound(name.to_string()))?;
        let distribution = state.history.remove(position);
        state.history.push(distribution.clone());
        debug!(shelf = self.config.id, distribution = name, "promoted distribution");
        Ok(distribution)
    }

    /// Position of a distribution in the history, oldest first.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.state.lock().position(name)
    }

    /// Move a distribution to `position` in the history, clamped to the end.
    pub fn reposition(&self, name: &str, position: usize) -> Result<()> {
        let mut state = self.state.lock();
        let current = state
            .position(name)
            .ok_or_else(|| Error::DistributionNotFound(name.to_string()))?;
        let distribution = state.history.remove(current);
        let position = position.min(state.history.len());
        state.history.insert(position, distribution);
        Ok(())
    }

    /// Drop a distribution from the history.
    pub fn discard_distribution(&self, name: &str) -> Result<Distribution> {
        let mut state = self.state.lock();
        let position = state
            .position(name)
            .ok_or_else(|| Error::DistributionNotFound(name.to_string()))?;
        debug!(shelf = self.config.id, distribution = name, "discarded distribution");
        Ok(state.history.remove(position))
    }

    pub fn current_distribution(&self) -> Result<Distribution> {
        self.state
            .lock()
            .history
            .last()
            .cloned()
            .ok_or(Error::EmptyHistory(self.config.id))
    }

    pub fn distribution_named(&self, name: &str) -> Result<Distribution> {
        self.state
            .lock()
            .history
            .iter()
            .find(|d| d.name() == name)
            .cloned()
            .ok_or_else(|| Error::DistributionNotFound(name.to_string()))
    }

    /// Swap two cells of one distribution in the history.
    pub fn swap(&self, name: &str, a: Coord, b: Coord) -> Result<Distribution> {
        let mut state = self.state.lock();
        let position = state
            .position(name)
            .ok_or_else(|| Error::DistributionNotFound(name.to_string()))?;
        let distribution = &mut state.history[position];
        distribution.swap(a, b)?;
        Ok(distribution.clone())
    }

    /// Assign a new product list. Distributions belong to the products that
    /// produced them, so the history is cleared; the removed names are
    /// returned.
    pub fn reassign_products(&self, products: Arc<ProductList>) -> Result<Vec<String>> {
        check_capacity(&products, self.shape)?;
        let mut state = self.state.lock();
        state.products = products;
        let cleared: Vec<String> = state
            .history
            .drain(..)
            .map(|d| d.name().to_string())
            .collect();
        info!(
            shelf = self.config.id,
            products = state.products.len(),
            cleared = cleared.len(),
            "reassigned products"
        );
        Ok(cleared)
    }

    pub fn distribution_history_log(&self) -> Vec<HistoryEntry> {
        self.state
            .lock()
            .history
            .iter()
            .map(|d| HistoryEntry {
                name: d.name().to_string(),
                modified_at: d.modified_at(),
                created_at: d.created_at(),
            })
            .collect()
    }
}

fn check_capacity(products: &ProductList, shape: GridShape) -> Result<()> {
    if products.len() > shape.cells() {
        return Err(Error::CapacityExceeded {
            products: products.len(),
            capacity: shape.cells(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Product;

    fn products(names: &[&str]) -> Arc<ProductList> {
        Arc::new(ProductList::new("list", names.iter().map(|n| Product::new(*n)).collect()).unwrap())
    }

    fn shelf(xsize: usize, ysize: usize, names: &[&str]) -> Shelf {
        Shelf::new(ShelfConfig { id: 1, xsize, ysize }, products(names)).unwrap()
    }

    #[test]
    fn test_invalid_dimensions() {
        let result = Shelf::new(ShelfConfig { id: 1, xsize: 0, ysize: 2 }, products(&[]));
        assert!(matches!(result, Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn test_capacity_checked_on_creation_and_reassignment() {
        let too_many = products(&["a", "b", "c", "d", "e"]);
        let result = Shelf::new(ShelfConfig { id: 1, xsize: 2, ysize: 2 }, too_many.clone());
        assert!(matches!(
            result,
            Err(Error::CapacityExceeded { products: 5, capacity: 4 })
        ));

        let s = shelf(2, 2, &["a"]);
        s.generate_distribution("d1", Algorithm::HillClimbing, -1, &SimilarityTable::new())
            .unwrap();
        assert!(s.reassign_products(too_many).is_err());
        // failed reassignment leaves history alone
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn test_generate_appends_and_becomes_current() {
        let s = shelf(2, 2, &["a", "b", "c"]);
        let sim = SimilarityTable::new();
        let d1 = s.generate_distribution("d1", Algorithm::Exhaustive, -1, &sim).unwrap();
        assert_eq!(s.current_distribution().unwrap().name(), "d1");
        assert_eq!(d1.product_count(), 3);
        assert!(d1.product_count() <= s.max_capacity());

        s.generate_distribution("d2", Algorithm::HillClimbing, 10, &sim).unwrap();
        assert_eq!(s.current_distribution().unwrap().name(), "d2");
        assert_eq!(s.distribution_names(), vec!["d1", "d2"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let s = shelf(2, 1, &["a"]);
        let sim = SimilarityTable::new();
        s.generate_distribution("d", Algorithm::Exhaustive, -1, &sim).unwrap();
        assert!(matches!(
            s.generate_distribution("d", Algorithm::Exhaustive, -1, &sim),
            Err(Error::DuplicateDistribution(_))
        ));
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn test_zero_limit_adds_nothing() {
        let s = shelf(2, 1, &["a"]);
        let result = s.generate_distribution("d", Algorithm::HillClimbing, 0, &SimilarityTable::new());
        assert!(matches!(result, Err(Error::InvalidLimit)));
        assert_eq!(s.history_len(), 0);
    }

    #[test]
    fn test_promote_reorders_history() {
        let s = shelf(2, 2, &["a", "b"]);
        let sim = SimilarityTable::new();
        for name in ["A", "B", "C"] {
            s.generate_distribution(name, Algorithm::Exhaustive, -1, &sim).unwrap();
        }
        s.promote("A").unwrap();
        assert_eq!(s.distribution_names(), vec!["B", "C", "A"]);
        assert_eq!(s.current_distribution().unwrap().name(), "A");

        assert!(matches!(s.promote("Z"), Err(Error::DistributionNotFound(_))));
    }

    #[test]
    fn test_empty_history_and_lookup() {
        let s = shelf(2, 2, &["a"]);
        assert!(matches!(s.current_distribution(), Err(Error::EmptyHistory(1))));
        assert!(matches!(s.distribution_named("x"), Err(Error::DistributionNotFound(_))));
    }

    #[test]
    fn test_reassign_clears_history() {
        let s = shelf(2, 2, &["a", "b"]);
        let sim = SimilarityTable::new();
        s.generate_distribution("d1", Algorithm::Exhaustive, -1, &sim).unwrap();
        s.generate_distribution("d2", Algorithm::Exhaustive, -1, &sim).unwrap();
        let cleared = s.reassign_products(products(&["x", "y", "z"])).unwrap();
        assert_eq!(cleared, vec!["d1", "d2"]);
        assert_eq!(s.history_len(), 0);
        assert_eq!(s.products().len(), 3);
    }

    #[test]
    fn test_swap_through_shelf() {
        let s = shelf(2, 1, &["a", "b"]);
        let sim = SimilarityTable::new();
        s.generate_distribution("d", Algorithm::Exhaustive, -1, &sim).unwrap();
        let before = s.distribution_named("d").unwrap();
        let after = s.swap("d", Coord::new(0, 0), Coord::new(0, 1)).unwrap();
        assert_eq!(before.product_at(Coord::new(0, 0)), after.product_at(Coord::new(0, 1)));
        assert_eq!(s.distribution_named("d").unwrap(), after);
    }

    #[test]
    fn test_history_log_follows_history_order() {
        let s = shelf(2, 2, &["a", "b"]);
        let sim = SimilarityTable::new();
        for name in ["A", "B", "C"] {
            s.generate_distribution(name, Algorithm::Exhaustive, -1, &sim).unwrap();
        }
        s.swap("B", Coord::new(0, 0), Coord::new(1, 1)).unwrap();
        s.promote("A").unwrap();
        let log = s.distribution_history_log();
        let names: Vec<&str> = log.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert!(log[0].modified_at >= log[0].created_at);
    }

    #[test]
    fn test_restore_checks_shape_and_name() {
        let s = shelf(2, 2, &["a"]);
        assert!(matches!(
            s.restore_distribution(Distribution::new("x", 1, 2)),
            Err(Error::DimensionMismatch { .. })
        ));
        s.restore_distribution(Distribution::new("x", 2, 2)).unwrap();
        assert!(matches!(
            s.restore_distribution(Distribution::new("x", 2, 2)),
            Err(Error::DuplicateDistribution(_))
        ));
    }

    #[test]
    fn test_hill_climbing_starts_from_current_distribution() {
        let s = shelf(2, 2, &["a", "b", "c", "d"]);
        let sim = SimilarityTable::new();
        let first = s.generate_distribution("d1", Algorithm::HillClimbing, -1, &sim).unwrap();
        assert_eq!(first.product_at(Coord::new(0, 0)), Some("a"));

        let swapped = s.swap("d1", Coord::new(0, 0), Coord::new(1, 1)).unwrap();
        let next = s.generate_distribution("d2", Algorithm::HillClimbing, 1, &sim).unwrap();
        assert_eq!(next.grid(), swapped.grid());
        assert_ne!(next.grid(), first.grid());
        assert_eq!(next.coordinates_of("a").unwrap(), Coord::new(1, 1));

        // exhaustive search ignores the current layout
        let exact = s.generate_distribution("d3", Algorithm::Exhaustive, -1, &sim).unwrap();
        assert_eq!(exact.grid(), first.grid());
    }

    #[test]
    fn test_reposition_and_discard() {
        let s = shelf(2, 2, &["a"]);
        let sim = SimilarityTable::new();
        for name in ["A", "B", "C"] {
            s.generate_distribution(name, Algorithm::Exhaustive, -1, &sim).unwrap();
        }
        s.reposition("C", 0).unwrap();
        assert_eq!(s.distribution_names(), vec!["C", "A", "B"]);
        assert_eq!(s.position_of("A"), Some(1));
        s.reposition("C", 10).unwrap();
        assert_eq!(s.distribution_names(), vec!["A", "B", "C"]);

        assert_eq!(s.discard_distribution("B").unwrap().name(), "B");
        assert_eq!(s.distribution_names(), vec!["A", "C"]);
        assert!(matches!(s.discard_distribution("B"), Err(Error::DistributionNotFound(_))));
        assert!(matches!(s.reposition("B", 0), Err(Error::DistributionNotFound(_))));
    }
}
