//! Hill climbing over single cell swaps.
//!
//! Every iteration pairs each occupied cell `a` (row-major) with every other
//! cell `b` (row-major), skipping an occupied `b` before `a` so that each pair
//! is seen once and empty/empty pairs are never visited. The best improving
//! swap is applied (the first one in scan order among equals). Each scanned
//! pair costs one unit of the limit. If the limit runs out mid-scan, the best
//! improvement seen so far in that scan is still applied.
//!
//! Accepted states are recorded as product positions and a swap leading back
//! to a recorded state is never taken.

use crate::placement::{
    Placement, PlacementProblem, SearchLimit, Slot, WorkBudget, IMPROVEMENT_EPSILON,
};
use ahash::AHashSet;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct Move {
    a: usize,
    b: usize,
    delta: f64,
}

/// Product positions after swapping cells `a` and `b`.
fn swapped_positions(positions: &[usize], layout: &[Slot], a: usize, b: usize) -> Vec<usize> {
    let mut next = positions.to_vec();
    if let Some(p) = layout[a] {
        next[p] = b;
    }
    if let Some(q) = layout[b] {
        next[q] = a;
    }
    next
}

pub(crate) fn search(problem: &PlacementProblem<'_>, limit: SearchLimit, start: Vec<Slot>) -> Placement {
    let cells = problem.cells();
    let mut layout = start;
    let mut positions = vec![0; problem.products()];
    let mut occupied = Vec::with_capacity(problem.products());
    for (cell, slot) in layout.iter().enumerate() {
        if let Some(p) = slot {
            positions[*p] = cell;
            occupied.push(cell);
        }
    }

    let mut budget = WorkBudget::new(limit);
    let mut visited: AHashSet<Vec<usize>> = AHashSet::new();
    visited.insert(positions.clone());

    let mut limit_reached = false;
    let mut iterations = 0u64;

    loop {
        let mut best: Option<Move> = None;

        'scan: for &a in &occupied {
            for b in 0..cells {
                if b == a || (b < a && layout[b].is_some()) {
                    continue;
                }
                if !budget.try_consume() {
                    limit_reached = true;
                    break 'scan;
                }
                let delta = problem.swap_delta(&layout, a, b);
                if delta <= IMPROVEMENT_EPSILON {
                    continue;
                }
                if best.map_or(false, |m| delta <= m.delta) {
                    continue;
                }
                if !visited.contains(&swapped_positions(&positions, &layout, a, b)) {
                    best = Some(Move { a, b, delta });
                }
            }
        }

        match best {
            Some(m) => {
                positions = swapped_positions(&positions, &layout, m.a, m.b);
                if layout[m.b].is_none() {
                    // an occupied cell moved into an empty one
                    if let Some(slot) = occupied.iter_mut().find(|c| **c == m.a) {
                        *slot = m.b;
                    }
                    occupied.sort_unstable();
                }
                layout.swap(m.a, m.b);
                visited.insert(positions.clone());
                iterations += 1;
                trace!(iteration = iterations, a = m.a, b = m.b, delta = m.delta, "accepted swap");
            }
            None => break,
        }
        if limit_reached {
            break;
        }
    }

    Placement {
        score: problem.score(&layout),
        grid: problem.to_grid(&layout),
        work: budget.used(),
        limit_reached,
    }
}
