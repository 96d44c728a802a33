//! Row-major grids of optional product names and the adjacency objective.

use crate::{Error, Result, SimilarityTable};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A cell position, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Product name to cell. Empty cells are never indexed.
pub type CoordinateIndex = AHashMap<String, Coord>;

/// Shape of a grid: `rows = ysize`, `cols = xsize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    /// Validate signed shelf dimensions and convert them to a shape.
    pub fn from_dimensions(xsize: i64, ysize: i64) -> Result<Self> {
        if xsize <= 0 || ysize <= 0 {
            return Err(Error::InvalidDimensions { xsize, ysize });
        }
        let cols = usize::try_from(xsize).map_err(|_| Error::InvalidDimensions { xsize, ysize })?;
        let rows = usize::try_from(ysize).map_err(|_| Error::InvalidDimensions { xsize, ysize })?;
        rows.checked_mul(cols)
            .ok_or(Error::InvalidDimensions { xsize, ysize })?;
        Ok(Self { rows, cols })
    }

    #[inline]
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn index_of(&self, coord: Coord) -> usize {
        coord.row * self.cols + coord.col
    }

    #[inline]
    pub fn coord_of(&self, index: usize) -> Coord {
        Coord::new(index / self.cols, index % self.cols)
    }

    #[inline]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    pub fn check(&self, coord: Coord) -> Result<usize> {
        if self.contains(coord) {
            Ok(self.index_of(coord))
        } else {
            Err(Error::CellOutOfBounds {
                row: coord.row,
                col: coord.col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    /// Up/down/left/right neighbours of a cell index.
    pub fn neighbors(&self, index: usize) -> SmallVec<[usize; 4]> {
        let Coord { row, col } = self.coord_of(index);
        let mut out = SmallVec::new();
        if row > 0 {
            out.push(index - self.cols);
        }
        if row + 1 < self.rows {
            out.push(index + self.cols);
        }
        if col > 0 {
            out.push(index - 1);
        }
        if col + 1 < self.cols {
            out.push(index + 1);
        }
        out
    }

    /// Every 4-connected edge once, as `(a, b)` with `a < b`, in row-major
    /// order of `a` (right edge before down edge).
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::with_capacity(2 * self.cells());
        for index in 0..self.cells() {
            let Coord { row, col } = self.coord_of(index);
            if col + 1 < self.cols {
                edges.push((index, index + 1));
            }
            if row + 1 < self.rows {
                edges.push((index, index + self.cols));
            }
        }
        edges
    }
}

/// A fixed-size matrix of optional product names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    shape: GridShape,
    cells: Vec<Option<String>>,
}

impl Grid {
    pub fn empty(rows: usize, cols: usize) -> Self {
        let shape = GridShape { rows, cols };
        Self {
            shape,
            cells: vec![None; shape.cells()],
        }
    }

    /// Build a grid from rows of cells. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut cells = Vec::with_capacity(height * width);
        for row in rows {
            if row.len() != width {
                return Err(Error::DimensionMismatch {
                    expected_rows: height,
                    expected_cols: width,
                    rows: height,
                    cols: row.len(),
                });
            }
            cells.extend(row);
        }
        Ok(Self {
            shape: GridShape {
                rows: height,
                cols: width,
            },
            cells,
        })
    }

    pub(crate) fn from_cells(shape: GridShape, cells: Vec<Option<String>>) -> Self {
        debug_assert_eq!(cells.len(), shape.cells());
        Self { shape, cells }
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.shape.cols
    }

    pub fn get(&self, coord: Coord) -> Option<&str> {
        if !self.shape.contains(coord) {
            return None;
        }
        self.cells[self.shape.index_of(coord)].as_deref()
    }

    pub fn set(&mut self, coord: Coord, product: Option<String>) -> Result<Option<String>> {
        let index = self.shape.check(coord)?;
        Ok(std::mem::replace(&mut self.cells[index], product))
    }

    pub(crate) fn swap_cells(&mut self, a: usize, b: usize) {
        self.cells.swap(a, b);
    }

    pub(crate) fn cell(&self, index: usize) -> Option<&str> {
        self.cells[index].as_deref()
    }

    /// Occupied cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (Coord, &str)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, c)| c.as_deref().map(|name| (self.shape.coord_of(i), name)))
    }

    /// Empty cells in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(move |(i, _)| self.shape.coord_of(i))
    }

    pub fn product_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn to_rows(&self) -> Vec<Vec<Option<String>>> {
        if self.shape.cols == 0 {
            return Vec::new();
        }
        self.cells
            .chunks(self.shape.cols)
            .map(<[Option<String>]>::to_vec)
            .collect()
    }

    /// Sum of similarity over all 4-connected neighbour pairs. Empty cells
    /// contribute nothing.
    pub fn adjacency_score(&self, similarity: &SimilarityTable) -> f64 {
        self.shape
            .edges()
            .into_iter()
            .map(|(a, b)| match (self.cell(a), self.cell(b)) {
                (Some(x), Some(y)) => similarity.score(x, y),
                _ => 0.0,
            })
            .sum()
    }

    /// Whether two products occupy 4-connected cells.
    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        let Some(index) = self.cells.iter().position(|c| c.as_deref() == Some(a)) else {
            return false;
        };
        self.shape
            .neighbors(index)
            .into_iter()
            .any(|n| self.cell(n) == Some(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(rows: &[&[&str]]) -> Grid {
        Grid::from_rows(
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions_validated() {
        assert!(GridShape::from_dimensions(0, 3).is_err());
        assert!(GridShape::from_dimensions(3, -1).is_err());
        let shape = GridShape::from_dimensions(3, 2).unwrap();
        assert_eq!(shape.rows, 2);
        assert_eq!(shape.cols, 3);
        assert_eq!(shape.cells(), 6);
    }

    #[test]
    fn test_neighbors_and_edges() {
        let shape = GridShape { rows: 2, cols: 3 };
        assert_eq!(shape.neighbors(0).as_slice(), &[3, 1]);
        assert_eq!(shape.neighbors(4).as_slice(), &[1, 3, 5]);
        // 2 rows * 2 horizontal + 3 vertical
        assert_eq!(shape.edges().len(), 7);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![None, None], vec![None]];
        assert!(matches!(
            Grid::from_rows(rows),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_adjacency_score_ignores_empty_and_diagonal() {
        let sim = SimilarityTable::new()
            .with("a", "b", 0.5)
            .unwrap()
            .with("a", "d", 0.9)
            .unwrap();
        let grid = named(&[&["a", "b"], &["", "d"]]);
        // a-d is diagonal, the empty cell scores nothing
        assert!((grid.adjacency_score(&sim) - 0.5).abs() < 1e-12);
        assert!(grid.are_adjacent("a", "b"));
        assert!(!grid.are_adjacent("a", "d"));
        assert_eq!(grid.product_count(), 3);
        assert_eq!(grid.empty_cells().collect::<Vec<_>>(), vec![Coord::new(1, 0)]);
    }
}
