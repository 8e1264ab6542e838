//! Graph traversal over any adjacency provider

use super::traits::{AdjacencyProvider, Direction, NodeId};
use crate::error::DecodeResult;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// BFS closure seeded from `start`'s direct neighbors.
///
/// `start` itself appears only if a cycle leads back to it. Sorted ascending.
pub fn reachable<G: AdjacencyProvider + ?Sized>(
    graph: &G,
    start: NodeId,
    direction: Direction,
) -> DecodeResult<Vec<NodeId>> {
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    for neighbor in graph.neighbors(start, direction)? {
        if visited.insert(neighbor) {
            queue.push_back(neighbor);
        }
    }

    while let Some(current) = queue.pop_front() {
        for neighbor in graph.neighbors(current, direction)? {
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    let mut result: Vec<NodeId> = visited.into_iter().collect();
    result.sort_unstable();
    Ok(result)
}

/// Depth-first enumeration of every simple path `source ..= sink`.
///
/// Uses an explicit stack so deep graphs can't overflow the call stack, and
/// memoizes each node's outgoing list since paths revisit shared suffixes.
pub fn all_paths<G: AdjacencyProvider + ?Sized>(
    graph: &G,
    source: NodeId,
    sink: NodeId,
) -> DecodeResult<Vec<Vec<NodeId>>> {
    if source == sink {
        return Ok(vec![vec![source]]);
    }

    let mut children: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    let mut paths = Vec::new();

    // (node, index of the next child to try)
    let mut stack: Vec<(NodeId, usize)> = vec![(source, 0)];
    let mut on_path: FxHashSet<NodeId> = FxHashSet::default();
    on_path.insert(source);

    while let Some(frame) = stack.last_mut() {
        let node = frame.0;
        let next = frame.1;
        frame.1 += 1;

        if !children.contains_key(&node) {
            children.insert(node, graph.outgoing_edges(node)?);
        }
        let child = children.get(&node).and_then(|list| list.get(next)).copied();

        match child {
            Some(child) if child == sink => {
                let mut path: Vec<NodeId> = stack.iter().map(|&(n, _)| n).collect();
                path.push(sink);
                paths.push(path);
            }
            Some(child) => {
                if on_path.insert(child) {
                    stack.push((child, 0));
                }
            }
            None => {
                stack.pop();
                on_path.remove(&node);
            }
        }
    }

    Ok(paths)
}
