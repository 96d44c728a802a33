use crate::grid::CoordinateIndex;
use crate::{Coord, Error, Grid, Result, SimilarityTable};
use chrono::{DateTime, Utc};

/// One concrete arrangement of products on a shelf.
///
/// Keeps a product name to cell index next to the grid. Empty cells are not
/// indexed; they are found by walking the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    name: String,
    grid: Grid,
    index: CoordinateIndex,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

fn build_index(grid: &Grid) -> Result<CoordinateIndex> {
    let mut index = CoordinateIndex::with_capacity(grid.product_count());
    for (coord, name) in grid.occupied() {
        if index.insert(name.to_string(), coord).is_some() {
            return Err(Error::DuplicateProduct(name.to_string()));
        }
    }
    Ok(index)
}

impl Distribution {
    /// An empty `rows` by `cols` distribution.
    pub fn new(name: impl Into<String>, rows: usize, cols: usize) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            grid: Grid::empty(rows, cols),
            index: CoordinateIndex::default(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Wrap a grid produced by a placement search.
    pub fn from_grid(name: impl Into<String>, grid: Grid) -> Result<Self> {
        let index = build_index(&grid)?;
        let now = Utc::now();
        Ok(Self {
            name: name.into(),
            grid,
            index,
            created_at: now,
            modified_at: now,
        })
    }

    /// Rebuild a persisted distribution. The index is always derived from the
    /// grid.
    pub fn restore(
        name: impl Into<String>,
        grid: Grid,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Result<Self> {
        let index = build_index(&grid)?;
        Ok(Self {
            name: name.into(),
            grid,
            index,
            created_at,
            modified_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn coordinate_index(&self) -> &CoordinateIndex {
        &self.index
    }

    pub fn product_count(&self) -> usize {
        self.index.len()
    }

    /// Replace the whole grid. Dimensions must match.
    pub fn replace_grid(&mut self, grid: Grid) -> Result<()> {
        if grid.shape() != self.grid.shape() {
            return Err(Error::DimensionMismatch {
                expected_rows: self.grid.rows(),
                expected_cols: self.grid.cols(),
                rows: grid.rows(),
                cols: grid.cols(),
            });
        }
        self.index = build_index(&grid)?;
        self.grid = grid;
        self.modified_at = Utc::now();
        Ok(())
    }

    /// Exchange the contents of two cells. Either or both may be empty.
    pub fn swap(&mut self, a: Coord, b: Coord) -> Result<()> {
        let shape = self.grid.shape();
        let ia = shape.check(a)?;
        let ib = shape.check(b)?;
        self.grid.swap_cells(ia, ib);
        if let Some(name) = self.grid.cell(ia) {
            if let Some(coord) = self.index.get_mut(name) {
                *coord = a;
            }
        }
        if let Some(name) = self.grid.cell(ib) {
            if let Some(coord) = self.index.get_mut(name) {
                *coord = b;
            }
        }
        self.modified_at = Utc::now();
        debug_assert!(self.check_invariants().is_ok());
        Ok(())
    }

    pub fn coordinates_of(&self, product: &str) -> Result<Coord> {
        self.index
            .get(product)
            .copied()
            .ok_or_else(|| Error::ProductNotFound(product.to_string()))
    }

    pub fn product_at(&self, coord: Coord) -> Option<&str> {
        self.grid.get(coord)
    }

    pub fn contains(&self, product: &str) -> bool {
        self.index.contains_key(product)
    }

    /// Grid of names for display and export.
    pub fn render_as_names(&self) -> Vec<Vec<Option<String>>> {
        self.grid.to_rows()
    }

    pub fn score(&self, similarity: &SimilarityTable) -> f64 {
        self.grid.adjacency_score(similarity)
    }

    /// Verify that grid and index describe each other exactly.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut occupied = 0;
        for (coord, name) in self.grid.occupied() {
            occupied += 1;
            match self.index.get(name) {
                Some(c) if *c == coord => {}
                Some(c) => return Err(format!("{} indexed at {} but found at {}", name, c, coord)),
                None => return Err(format!("{} at {} missing from index", name, coord)),
            }
        }
        if occupied != self.index.len() {
            return Err(format!(
                "index has {} entries for {} occupied cells",
                self.index.len(),
                occupied
            ));
        }
        Ok(())
    }
}
