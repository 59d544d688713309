//! Deterministic topological ordering of the systems in one group.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Orders `count` nodes so that every edge `(from, to)` has `from` first.
///
/// Uses Kahn's algorithm. Whenever several nodes are ready, the one with the
/// lowest index (earliest registration) goes next, so nodes without
/// constraints keep their registration order.
///
/// On a cycle, returns the nodes that could not be ordered, ascending.
pub(crate) fn resolve(count: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>, Vec<usize>> {
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut in_degree = vec![0_usize; count];

    for &(from, to) in edges {
        successors[from].push(to);
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(node, _)| Reverse(node))
        .collect();

    let mut sorted = Vec::with_capacity(count);
    while let Some(Reverse(node)) = ready.pop() {
        sorted.push(node);
        for &next in &successors[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if sorted.len() == count {
        Ok(sorted)
    } else {
        Err((0..count).filter(|&node| in_degree[node] > 0).collect())
    }
}
