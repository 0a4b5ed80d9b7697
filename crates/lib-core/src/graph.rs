//! Generic directed-graph cycle location: a depth-first search that keeps
//! the current path and slices it when a node repeats. Reused by the
//! dependency resolver for its failure diagnostics.

use std::hash::Hash;

use ahash::AHashSet;

/// Finds a cycle reachable from any of `starts`, returning it as the node
/// path from the first repeated node back to itself (exclusive).
pub fn find_cycle<N, F, I>(starts: &[N], neighbors: &mut F) -> Option<Vec<N>>
where
    N: Copy + Eq + Hash,
    F: FnMut(N) -> I,
    I: IntoIterator<Item = N>,
{
    let mut visited = AHashSet::new();
    for &start in starts {
        let mut path = Vec::new();
        let mut on_path = AHashSet::new();
        if let Some(cycle) = visit(start, neighbors, &mut visited, &mut path, &mut on_path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<N, F, I>(
    node: N,
    neighbors: &mut F,
    visited: &mut AHashSet<N>,
    path: &mut Vec<N>,
    on_path: &mut AHashSet<N>,
) -> Option<Vec<N>>
where
    N: Copy + Eq + Hash,
    F: FnMut(N) -> I,
    I: IntoIterator<Item = N>,
{
    if on_path.contains(&node) {
        let start = path.iter().position(|&candidate| candidate == node)?;
        return Some(path[start..].to_vec());
    }
    if !visited.insert(node) {
        return None;
    }
    path.push(node);
    on_path.insert(node);
    let next: Vec<N> = neighbors(node).into_iter().collect();
    for neighbor in next {
        if let Some(cycle) = visit(neighbor, neighbors, visited, path, on_path) {
            return Some(cycle);
        }
    }
    path.pop();
    on_path.remove(&node);
    None
}

/// Formats a cycle through a per-node label function, joined with `" -> "`.
pub fn format_cycle<N: Copy>(cycle: &[N], mut label: impl FnMut(N) -> String) -> String {
    cycle
        .iter()
        .map(|&node| label(node))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn neighbors_of(edges: &[(u32, u32)]) -> impl FnMut(u32) -> Vec<u32> + '_ {
        move |node| {
            edges
                .iter()
                .filter(|(from, _)| *from == node)
                .map(|(_, to)| *to)
                .collect()
        }
    }

    #[test]
    fn acyclic_graphs_yield_nothing() {
        let edges = [(0, 1), (1, 2), (0, 2)];
        assert_eq!(find_cycle(&[0, 1, 2], &mut neighbors_of(&edges)), None);
    }

    #[test]
    fn simple_cycle_is_sliced_from_the_path() {
        let edges = [(0, 1), (1, 2), (2, 1)];
        let cycle = find_cycle(&[0], &mut neighbors_of(&edges)).unwrap();
        assert_eq!(cycle, vec![1, 2]);
    }

    #[test]
    fn self_loop_is_a_cycle_of_one() {
        let edges = [(3, 3)];
        let cycle = find_cycle(&[3], &mut neighbors_of(&edges)).unwrap();
        assert_eq!(cycle, vec![3]);
    }

    #[test]
    fn formatting_joins_with_arrows() {
        let formatted = format_cycle(&[1u32, 2], |node| format!("n{node}"));
        assert_eq!(formatted, "n1 -> n2");
    }
}
