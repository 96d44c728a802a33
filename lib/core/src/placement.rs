//! Placement search: assigns products to grid cells so similar products
//! end up next to each other.
//!
//! Both strategies maximise the same objective: the sum of similarity over
//! every pair of 4-connected cells (empty cells contribute nothing).
//!
//! - [`Algorithm::Exhaustive`] - depth-first branch and bound over a fixed
//!   canonical candidate order; the limit counts complete candidates.
//! - [`Algorithm::HillClimbing`] - best-improvement local search over
//!   single cell swaps; the limit counts swap evaluations.

use crate::grid::{CoordinateIndex, GridShape};
use crate::{exhaustive, hill_climbing};
use crate::{Error, Grid, ProductList, Result, SimilarityTable};
use smallvec::SmallVec;
use std::num::NonZeroU64;
use std::str::FromStr;
use tracing::debug;

/// Score differences below this are ties.
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Placement strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Exhaustive,
    HillClimbing,
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhaustive" | "brute-force" | "bruteforce" => Ok(Algorithm::Exhaustive),
            "hill-climbing" | "hillclimbing" | "hill_climbing" => Ok(Algorithm::HillClimbing),
            _ => Err(Error::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Exhaustive => write!(f, "exhaustive"),
            Algorithm::HillClimbing => write!(f, "hill-climbing"),
        }
    }
}

/// Bound on search work. Built from the signed limit callers pass around:
/// negative is unbounded, zero is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Unbounded,
    Bounded(NonZeroU64),
}

impl TryFrom<i64> for SearchLimit {
    type Error = Error;

    fn try_from(limit: i64) -> Result<Self> {
        if limit < 0 {
            return Ok(SearchLimit::Unbounded);
        }
        NonZeroU64::new(limit.unsigned_abs())
            .map(SearchLimit::Bounded)
            .ok_or(Error::InvalidLimit)
    }
}

impl SearchLimit {
    /// Multiply a bounded limit, saturating.
    pub(crate) fn scaled(self, factor: u64) -> Self {
        match self {
            SearchLimit::Unbounded => SearchLimit::Unbounded,
            SearchLimit::Bounded(n) => SearchLimit::Bounded(
                NonZeroU64::new(n.get().saturating_mul(factor.max(1))).unwrap_or(n),
            ),
        }
    }
}

/// Counts units of work against a [`SearchLimit`].
#[derive(Debug, Clone)]
pub(crate) struct WorkBudget {
    limit: SearchLimit,
    used: u64,
}

impl WorkBudget {
    pub(crate) fn new(limit: SearchLimit) -> Self {
        Self { limit, used: 0 }
    }

    /// Take one unit; false once the limit is spent.
    #[inline]
    pub(crate) fn try_consume(&mut self) -> bool {
        match self.limit {
            SearchLimit::Bounded(n) if self.used >= n.get() => false,
            _ => {
                self.used += 1;
                true
            }
        }
    }

    #[inline]
    pub(crate) fn used(&self) -> u64 {
        self.used
    }
}

/// Result of a placement run.
#[derive(Debug, Clone)]
pub struct Placement {
    pub grid: Grid,
    pub score: f64,
    /// Candidates (exhaustive) or swap evaluations (hill climbing) spent.
    pub work: u64,
    /// True if the search stopped because the limit ran out.
    pub limit_reached: bool,
}

/// A cell's content during search: an index into the sorted product names.
pub(crate) type Slot = Option<usize>;

/// Dense view of one search instance. Products are indexed in ascending name
/// order so results do not depend on the input order.
pub(crate) struct PlacementProblem<'a> {
    pub(crate) shape: GridShape,
    pub(crate) names: Vec<&'a str>,
    matrix: Vec<f64>,
    pub(crate) neighbors: Vec<SmallVec<[usize; 4]>>,
    pub(crate) edges: Vec<(usize, usize)>,
}

impl<'a> PlacementProblem<'a> {
    pub(crate) fn new(shape: GridShape, products: &'a ProductList, similarity: &SimilarityTable) -> Self {
        let names = products.sorted_names();
        let n = names.len();
        let mut matrix = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let s = similarity.score(names[i], names[j]);
                matrix[i * n + j] = s;
                matrix[j * n + i] = s;
            }
        }
        let neighbors = (0..shape.cells()).map(|c| shape.neighbors(c)).collect();
        Self {
            shape,
            names,
            matrix,
            neighbors,
            edges: shape.edges(),
        }
    }

    #[inline]
    pub(crate) fn products(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub(crate) fn cells(&self) -> usize {
        self.shape.cells()
    }

    #[inline]
    pub(crate) fn sim(&self, a: usize, b: usize) -> f64 {
        self.matrix[a * self.names.len() + b]
    }

    #[inline]
    pub(crate) fn pair(&self, a: Slot, b: Slot) -> f64 {
        match (a, b) {
            (Some(x), Some(y)) => self.sim(x, y),
            _ => 0.0,
        }
    }

    /// Highest similarity each product has with any other product.
    pub(crate) fn best_partners(&self) -> Vec<f64> {
        let n = self.products();
        (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| self.sim(i, j))
                    .fold(0.0, f64::max)
            })
            .collect()
    }

    pub(crate) fn score(&self, layout: &[Slot]) -> f64 {
        self.edges
            .iter()
            .map(|&(a, b)| self.pair(layout[a], layout[b]))
            .sum()
    }

    /// Similarity gained by `product` sitting at `cell`, ignoring `skip`.
    #[inline]
    fn contribution(&self, layout: &[Slot], cell: usize, product: Slot, skip: usize) -> f64 {
        if product.is_none() {
            return 0.0;
        }
        self.neighbors[cell]
            .iter()
            .filter(|&&n| n != skip)
            .map(|&n| self.pair(product, layout[n]))
            .sum()
    }

    /// Objective change from swapping the contents of cells `a` and `b`.
    /// The `a`-`b` edge, if any, keeps the same pair and is skipped.
    pub(crate) fn swap_delta(&self, layout: &[Slot], a: usize, b: usize) -> f64 {
        let (pa, pb) = (layout[a], layout[b]);
        let before = self.contribution(layout, a, pa, b) + self.contribution(layout, b, pb, a);
        let after = self.contribution(layout, a, pb, b) + self.contribution(layout, b, pa, a);
        after - before
    }

    /// Products in name order, row-major, empties at the end.
    pub(crate) fn canonical_layout(&self) -> Vec<Slot> {
        (0..self.cells())
            .map(|c| if c < self.products() { Some(c) } else { None })
            .collect()
    }

    /// Layout from a previous coordinate index, if it covers exactly this
    /// product set and fits the grid without collisions.
    pub(crate) fn layout_from_prior(&self, prior: &CoordinateIndex) -> Option<Vec<Slot>> {
        if prior.len() != self.products() {
            return None;
        }
        let mut layout = vec![None; self.cells()];
        for (p, name) in self.names.iter().enumerate() {
            let coord = prior.get(*name)?;
            if !self.shape.contains(*coord) {
                return None;
            }
            let cell = self.shape.index_of(*coord);
            if layout[cell].is_some() {
                return None;
            }
            layout[cell] = Some(p);
        }
        Some(layout)
    }

    pub(crate) fn to_grid(&self, layout: &[Slot]) -> Grid {
        let cells = layout
            .iter()
            .map(|slot| slot.map(|p| self.names[p].to_string()))
            .collect();
        Grid::from_cells(self.shape, cells)
    }
}

impl Algorithm {
    /// Place `products` on an `xsize` by `ysize` grid.
    ///
    /// `limit` caps the search work (`< 0` unbounded, `0` rejected). `prior` is
    /// an optional starting layout; the exhaustive search ignores it.
    pub fn solve(
        &self,
        products: &ProductList,
        xsize: i64,
        ysize: i64,
        limit: i64,
        similarity: &SimilarityTable,
        prior: Option<&CoordinateIndex>,
    ) -> Result<Grid> {
        self.solve_detailed(products, xsize, ysize, limit, similarity, prior)
            .map(|placement| placement.grid)
    }

    /// Like [`Algorithm::solve`], also reporting score and work spent.
    pub fn solve_detailed(
        &self,
        products: &ProductList,
        xsize: i64,
        ysize: i64,
        limit: i64,
        similarity: &SimilarityTable,
        prior: Option<&CoordinateIndex>,
    ) -> Result<Placement> {
        let shape = GridShape::from_dimensions(xsize, ysize)?;
        let limit = SearchLimit::try_from(limit)?;
        if products.len() > shape.cells() {
            return Err(Error::CapacityExceeded {
                products: products.len(),
                capacity: shape.cells(),
            });
        }

        let problem = PlacementProblem::new(shape, products, similarity);
        debug!(
            algorithm = %self,
            products = problem.products(),
            rows = shape.rows,
            cols = shape.cols,
            ?limit,
            "starting placement search"
        );

        let placement = match self {
            Algorithm::Exhaustive => exhaustive::search(&problem, limit),
            Algorithm::HillClimbing => {
                let start = prior
                    .and_then(|p| problem.layout_from_prior(p))
                    .unwrap_or_else(|| problem.canonical_layout());
                hill_climbing::search(&problem, limit, start)
            }
        };

        debug!(
            algorithm = %self,
            score = placement.score,
            work = placement.work,
            limit_reached = placement.limit_reached,
            "placement search finished"
        );
        Ok(placement)
    }
}
