//! Exhaustive placement: depth-first branch and bound.
//!
//! Cells are filled in row-major order. At each cell the branches are tried as
//! every unplaced product in name order, then "empty" (all empty cells are
//! interchangeable, so there is one empty branch). That fixes a canonical
//! candidate order: the first complete candidate is the row-major name-sorted
//! layout, and on equal scores the earlier candidate is kept.
//!
//! The search keeps its own stack of branch frames, so depth is bounded by
//! memory rather than the thread stack. Once every product is placed the
//! remaining cells can only be empty and the candidate is completed directly.
//!
//! A subtree is pruned when its partial score plus an optimistic bound on the
//! undecided edges cannot beat the incumbent. Each complete candidate costs one
//! unit of the limit. Visited nodes are capped at `limit * (cells + 1)` so run
//! time follows the limit even when pruning keeps the search away from leaves.

use crate::placement::{
    Placement, PlacementProblem, SearchLimit, Slot, WorkBudget, IMPROVEMENT_EPSILON,
};

/// Branch currently taken by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Fresh,
    Product(usize),
    Empty,
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    cell: usize,
    partial: f64,
    next_product: usize,
    branch: Branch,
}

/// Most edges `k` occupied cells of a square grid can share:
/// `2k - ceil(2 * sqrt(k))`.
fn max_grid_edges(k: usize) -> usize {
    if k == 0 {
        return 0;
    }
    let target = 4 * k;
    let mut root = (target as f64).sqrt() as usize;
    while root * root < target {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= target {
        root -= 1;
    }
    2 * k - root
}

struct BranchAndBound<'p, 'a> {
    problem: &'p PlacementProblem<'a>,
    layout: Vec<Slot>,
    placed: Vec<bool>,
    remaining_products: usize,
    remaining_empty: usize,
    best_partner: Vec<f64>,
    global_best: f64,
    /// Edges whose lower cell is `>= index`.
    open_edges: Vec<usize>,
    stack: Vec<Frame>,
    best: Option<(Vec<Slot>, f64)>,
    candidates: WorkBudget,
    nodes: WorkBudget,
    stopped: bool,
}

impl<'p, 'a> BranchAndBound<'p, 'a> {
    fn new(problem: &'p PlacementProblem<'a>, limit: SearchLimit) -> Self {
        let cells = problem.cells();
        let best_partner = problem.best_partners();
        let global_best = best_partner.iter().copied().fold(0.0, f64::max);

        let mut open_edges = vec![0; cells + 1];
        for &(a, _) in &problem.edges {
            open_edges[a] += 1;
        }
        for cell in (0..cells).rev() {
            open_edges[cell] += open_edges[cell + 1];
        }

        Self {
            problem,
            layout: vec![None; cells],
            placed: vec![false; problem.products()],
            remaining_products: problem.products(),
            remaining_empty: cells - problem.products(),
            best_partner,
            global_best,
            open_edges,
            stack: Vec::with_capacity(problem.products() + 1),
            best: None,
            candidates: WorkBudget::new(limit),
            nodes: WorkBudget::new(limit.scaled(cells as u64 + 1)),
            stopped: false,
        }
    }

    /// Upper bound on what the edges touching cells `cell..` can still add.
    fn optimistic_bound(&self, cell: usize) -> f64 {
        let cols = self.problem.shape.cols;
        let mut bound = 0.0;

        // right edge from the previous cell in this row
        if cell % cols != 0 {
            if let Some(p) = self.layout[cell - 1] {
                bound += self.best_partner[p];
            }
        }
        // down edges from the previous row that reach undecided cells
        let with_down = self.problem.cells().saturating_sub(cols);
        for a in cell.saturating_sub(cols)..cell.min(with_down) {
            if let Some(p) = self.layout[a] {
                bound += self.best_partner[p];
            }
        }

        let open = self.open_edges[cell].min(max_grid_edges(self.remaining_products));
        bound + open as f64 * self.global_best
    }

    /// Similarity added by putting `product` at `cell`, counting only the
    /// neighbours already decided.
    fn gain(&self, cell: usize, product: usize) -> f64 {
        self.problem.neighbors[cell]
            .iter()
            .filter(|&&n| n < cell)
            .filter_map(|&n| self.layout[n])
            .map(|q| self.problem.sim(product, q))
            .sum()
    }

    /// Visit the node for `cell`: complete it, prune it or push a frame.
    fn enter(&mut self, cell: usize, partial: f64) {
        if !self.nodes.try_consume() {
            self.stopped = true;
            return;
        }

        if cell == self.problem.cells() || self.remaining_products == 0 {
            self.complete(partial);
            return;
        }

        if let Some((_, best)) = &self.best {
            if partial + self.optimistic_bound(cell) <= best + IMPROVEMENT_EPSILON {
                return;
            }
        }

        self.stack.push(Frame {
            cell,
            partial,
            next_product: 0,
            branch: Branch::Fresh,
        });
    }

    /// Take back whatever branch the top frame had applied.
    fn undo(&mut self, top: usize) {
        let Frame { cell, branch, .. } = self.stack[top];
        match branch {
            Branch::Product(p) => {
                self.layout[cell] = None;
                self.placed[p] = false;
                self.remaining_products += 1;
            }
            Branch::Empty => self.remaining_empty += 1,
            Branch::Fresh | Branch::Done => {}
        }
        self.stack[top].branch = Branch::Done;
    }

    fn run(&mut self) {
        self.enter(0, 0.0);

        while let Some(top) = self.stack.len().checked_sub(1) {
            self.undo(top);
            if self.stopped {
                return;
            }

            let Frame {
                cell,
                partial,
                next_product,
                branch: _,
            } = self.stack[top];
            let next = (next_product..self.problem.products()).find(|&p| !self.placed[p]);

            if let Some(product) = next {
                let gain = self.gain(cell, product);
                self.layout[cell] = Some(product);
                self.placed[product] = true;
                self.remaining_products -= 1;
                self.stack[top].next_product = product + 1;
                self.stack[top].branch = Branch::Product(product);
                self.enter(cell + 1, partial + gain);
            } else if next_product <= self.problem.products() && self.remaining_empty > 0 {
                self.remaining_empty -= 1;
                // past the last product: marks the empty branch as taken
                self.stack[top].next_product = self.problem.products() + 1;
                self.stack[top].branch = Branch::Empty;
                self.enter(cell + 1, partial);
            } else {
                self.stack.pop();
            }
        }
    }

    fn complete(&mut self, score: f64) {
        if !self.candidates.try_consume() {
            self.stopped = true;
            return;
        }
        let improves = match &self.best {
            None => true,
            Some((_, best)) => score > best + IMPROVEMENT_EPSILON,
        };
        if improves {
            self.best = Some((self.layout.clone(), score));
        }
    }
}

pub(crate) fn search(problem: &PlacementProblem<'_>, limit: SearchLimit) -> Placement {
    let mut bnb = BranchAndBound::new(problem, limit);
    bnb.run();

    // The first leaf is reached before anything can be pruned and the node
    // budget always covers one root-to-leaf path.
    let (layout, _) = bnb
        .best
        .take()
        .unwrap_or_else(|| (problem.canonical_layout(), 0.0));
    debug_assert!(bnb.candidates.used() >= 1);

    Placement {
        score: problem.score(&layout),
        grid: problem.to_grid(&layout),
        work: bnb.candidates.used(),
        limit_reached: bnb.stopped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridShape;
    use crate::{Product, ProductList, SimilarityTable};

    fn list(names: &[&str]) -> ProductList {
        ProductList::new("test", names.iter().map(|n| Product::new(*n)).collect()).unwrap()
    }

    fn paired_similarity() -> SimilarityTable {
        let mut sim = SimilarityTable::new();
        let names = ["P1", "P2", "P3", "P4"];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                sim.set(a, b, 0.1).unwrap();
            }
        }
        sim.set("P1", "P2", 0.9).unwrap();
        sim.set("P3", "P4", 0.9).unwrap();
        sim
    }

    /// Enumerate all layouts by brute force for comparison.
    fn brute_force_best(problem: &PlacementProblem<'_>) -> f64 {
        fn rec(problem: &PlacementProblem<'_>, layout: &mut Vec<Slot>, used: &mut Vec<bool>, empties: usize, best: &mut f64) {
            if layout.len() == problem.cells() {
                *best = best.max(problem.score(layout));
                return;
            }
            for p in 0..problem.products() {
                if !used[p] {
                    used[p] = true;
                    layout.push(Some(p));
                    rec(problem, layout, used, empties, best);
                    layout.pop();
                    used[p] = false;
                }
            }
            if empties > 0 {
                layout.push(None);
                rec(problem, layout, used, empties - 1, best);
                layout.pop();
            }
        }
        let mut best = f64::MIN;
        let empties = problem.cells() - problem.products();
        rec(problem, &mut Vec::new(), &mut vec![false; problem.products()], empties, &mut best);
        best
    }

    #[test]
    fn test_pairs_end_up_adjacent() {
        let products = list(&["P1", "P2", "P3", "P4"]);
        let sim = paired_similarity();
        let problem = PlacementProblem::new(GridShape::from_dimensions(2, 2).unwrap(), &products, &sim);
        let placement = search(&problem, SearchLimit::Unbounded);

        assert!(placement.grid.are_adjacent("P1", "P2"));
        assert!(placement.grid.are_adjacent("P3", "P4"));
        assert!((placement.score - 2.0).abs() < 1e-9);
        assert!(!placement.limit_reached);
    }

    #[test]
    fn test_matches_brute_force_with_empty_cells() {
        let products = list(&["a", "b", "c", "d", "e"]);
        let sim = SimilarityTable::new()
            .with("a", "e", 0.8).unwrap()
            .with("b", "e", 0.6).unwrap()
            .with("c", "d", 0.5).unwrap()
            .with("a", "c", 0.2).unwrap()
            .with("d", "e", 0.35).unwrap();
        let problem = PlacementProblem::new(GridShape::from_dimensions(3, 2).unwrap(), &products, &sim);
        let placement = search(&problem, SearchLimit::Unbounded);
        assert!((placement.score - brute_force_best(&problem)).abs() < 1e-9);
        assert_eq!(placement.grid.product_count(), 5);
    }

    #[test]
    fn test_limit_one_returns_canonical_layout() {
        let products = list(&["c", "a", "b"]);
        let sim = SimilarityTable::new().with("a", "c", 1.0).unwrap();
        let problem = PlacementProblem::new(GridShape::from_dimensions(2, 2).unwrap(), &products, &sim);
        let placement = search(&problem, SearchLimit::try_from(1).unwrap());

        assert_eq!(placement.work, 1);
        assert!(placement.limit_reached);
        assert_eq!(placement.grid, problem.to_grid(&problem.canonical_layout()));
    }

    #[test]
    fn test_all_equal_scores_keep_first_candidate() {
        let products = list(&["a", "b", "c"]);
        let sim = SimilarityTable::new();
        let problem = PlacementProblem::new(GridShape::from_dimensions(3, 1).unwrap(), &products, &sim);
        let placement = search(&problem, SearchLimit::Unbounded);
        assert_eq!(placement.grid, problem.to_grid(&problem.canonical_layout()));
    }

    #[test]
    fn test_no_products() {
        let products = ProductList::empty("none");
        let sim = SimilarityTable::new();
        let problem = PlacementProblem::new(GridShape::from_dimensions(2, 2).unwrap(), &products, &sim);
        let placement = search(&problem, SearchLimit::Unbounded);
        assert_eq!(placement.grid.product_count(), 0);
        assert_eq!(placement.work, 1);
    }

    #[test]
    fn test_deterministic() {
        let products = list(&["P1", "P2", "P3", "P4"]);
        let sim = paired_similarity();
        let problem = PlacementProblem::new(GridShape::from_dimensions(2, 2).unwrap(), &products, &sim);
        for limit in [1, 3, 7, 24] {
            let limit = SearchLimit::try_from(limit).unwrap();
            assert_eq!(search(&problem, limit).grid, search(&problem, limit).grid);
        }
    }

    #[test]
    fn test_max_grid_edges() {
        let expected = [0, 0, 1, 2, 4, 5, 7, 8, 10, 12];
        for (k, edges) in expected.iter().enumerate() {
            assert_eq!(max_grid_edges(k), *edges, "k = {}", k);
        }
    }

    #[test]
    fn test_sparse_grids_match_brute_force() {
        let products = list(&["a", "b", "c"]);
        let sim = SimilarityTable::new()
            .with("a", "c", 0.7).unwrap()
            .with("b", "c", 0.4).unwrap()
            .with("a", "b", 0.1).unwrap();
        for (xsize, ysize) in [(3, 2), (4, 2), (2, 3), (5, 1)] {
            let shape = GridShape::from_dimensions(xsize, ysize).unwrap();
            let problem = PlacementProblem::new(shape, &products, &sim);
            let placement = search(&problem, SearchLimit::Unbounded);
            assert!(
                (placement.score - brute_force_best(&problem)).abs() < 1e-9,
                "{}x{}",
                xsize,
                ysize
            );
        }
    }

    #[test]
    fn test_long_sparse_shelf() {
        let products = list(&["a", "b"]);
        let sim = SimilarityTable::new().with("a", "b", 0.5).unwrap();
        let problem = PlacementProblem::new(GridShape::from_dimensions(200_000, 1).unwrap(), &products, &sim);

        let first = search(&problem, SearchLimit::try_from(1).unwrap());
        assert_eq!(first.work, 1);
        assert_eq!(first.grid.product_count(), 2);
        assert!(first.grid.are_adjacent("a", "b"));

        let full = search(&problem, SearchLimit::Unbounded);
        assert!(!full.limit_reached);
        assert!((full.score - 0.5).abs() < 1e-9);
    }
}
