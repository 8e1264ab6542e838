//! Graph blob writers

use crate::bits::{bit_length, BitWriter};
use crate::error::{DecodeError, DecodeResult};
use crate::graph::{write_edge_list, zigzag, EdgeWidths, NodeId};

/// Narrowest widths that fit every `(base, sorted targets)` list
fn widths_for<'a>(lists: impl Iterator<Item = (NodeId, &'a [NodeId])>) -> EdgeWidths {
    let mut max_degree = 0u64;
    let mut max_delta_bits = 0u32;
    for (base, targets) in lists {
        max_degree = max_degree.max(targets.len() as u64);
        if let Some(&first) = targets.first() {
            let zz = zigzag(first as i64 - base as i64);
            max_delta_bits = max_delta_bits.max(bit_length(zz).saturating_sub(1));
        }
        for pair in targets.windows(2) {
            max_delta_bits = max_delta_bits.max(bit_length(pair[1] - pair[0]));
        }
    }
    EdgeWidths {
        degree: bit_length(max_degree).max(1),
        delta: max_delta_bits.max(1),
    }
}

fn check_edges(node_count: u64, edges: &[(NodeId, NodeId)]) -> DecodeResult<Vec<(NodeId, NodeId)>> {
    if let Some(&(s, t)) = edges.iter().find(|&&(s, t)| s >= node_count || t >= node_count) {
        return Err(DecodeError::NodeOutOfRange {
            node: s.max(t),
            count: node_count,
        });
    }
    let mut edges = edges.to_vec();
    edges.sort_unstable();
    edges.dedup();
    Ok(edges)
}

/// Writes the grouped graph encoding
#[derive(Debug, Clone)]
pub struct GroupedGraphEncoder {
    node_count: u64,
    edges: Vec<(NodeId, NodeId)>,
    group_sizes: Vec<u64>,
}

impl GroupedGraphEncoder {
    /// Every node in its own group until [`with_groups`](Self::with_groups)
    pub fn new(node_count: u64, edges: &[(NodeId, NodeId)]) -> Self {
        Self {
            node_count,
            edges: edges.to_vec(),
            group_sizes: vec![1; node_count as usize],
        }
    }

    /// Partition the ids into consecutive groups of these sizes. Every group
    /// larger than one must be a version chain (`n -> n-1` for each member).
    pub fn with_groups(mut self, sizes: &[u64]) -> Self {
        self.group_sizes = sizes.to_vec();
        self
    }

    pub fn encode(&self) -> DecodeResult<Vec<u8>> {
        let edges = check_edges(self.node_count, &self.edges)?;
        if self.group_sizes.iter().sum::<u64>() != self.node_count
            || self.group_sizes.contains(&0)
        {
            return Err(DecodeError::corrupt("group sizes must partition the nodes"));
        }

        let mut starts = Vec::with_capacity(self.group_sizes.len() + 1);
        let mut next = 0;
        for &size in &self.group_sizes {
            starts.push(next);
            next += size;
        }
        starts.push(next);
        let group_of = |n: NodeId| starts.partition_point(|&s| s <= n) - 1;
        let collapsed = |g: usize| self.group_sizes[g] > 1;

        let is_version_edge =
            |(s, t): (NodeId, NodeId)| t + 1 == s && group_of(s) == group_of(t) && collapsed(group_of(s));
        for g in (0..self.group_sizes.len()).filter(|&g| collapsed(g)) {
            for n in starts[g] + 1..starts[g + 1] {
                if edges.binary_search(&(n, n - 1)).is_err() {
                    return Err(DecodeError::corrupt(format!(
                        "group {} is not a version chain: missing {} -> {}",
                        g,
                        n,
                        n - 1
                    )));
                }
            }
        }

        let groups = self.group_sizes.len();
        let mut fwd: Vec<Vec<NodeId>> = vec![Vec::new(); groups];
        let mut back: Vec<Vec<NodeId>> = vec![Vec::new(); groups];
        let mut between: Vec<Vec<(NodeId, NodeId)>> = Vec::new();
        let mut between_key: Vec<(usize, usize)> = Vec::new();
        for &(s, t) in edges.iter().filter(|&&e| !is_version_edge(e)) {
            fwd[group_of(s)].push(t);
            back[group_of(t)].push(s);
            let key = (group_of(s), group_of(t));
            match between_key.iter().position(|&k| k == key) {
                Some(i) => between[i].push((s, t)),
                None => {
                    between_key.push(key);
                    between.push(vec![(s, t)]);
                }
            }
        }
        for list in fwd.iter_mut().chain(back.iter_mut()) {
            list.sort_unstable();
        }

        // Member attribution pairs sorted targets with sorted sources
        for (pairs, &(from, to)) in between.iter().zip(&between_key) {
            let mut sources: Vec<NodeId> = pairs.iter().map(|p| p.0).collect();
            let mut targets: Vec<NodeId> = pairs.iter().map(|p| p.1).collect();
            sources.sort_unstable();
            targets.sort_unstable();
            let mut paired: Vec<(NodeId, NodeId)> = sources.into_iter().zip(targets).collect();
            paired.sort_unstable();
            if paired != *pairs {
                return Err(DecodeError::corrupt(format!(
                    "edges from group {} into group {} cross and cannot be attributed",
                    from, to
                )));
            }
        }

        let widths_of = |lists: &[Vec<NodeId>], want_collapsed: bool| {
            widths_for(
                (0..groups)
                    .filter(|&g| collapsed(g) == want_collapsed)
                    .map(|g| (starts[g], lists[g].as_slice())),
            )
        };
        let fwd_collapsed = widths_of(&fwd, true);
        let fwd_single = widths_of(&fwd, false);
        let back_collapsed = widths_of(&back, true);
        let back_single = widths_of(&back, false);

        let mut payloads = Vec::with_capacity(groups);
        for g in 0..groups {
            let (f, b) = if collapsed(g) {
                (fwd_collapsed, back_collapsed)
            } else {
                (fwd_single, back_single)
            };
            let mut w = BitWriter::new();
            write_edge_list(&mut w, &fwd[g], f, starts[g]);
            write_edge_list(&mut w, &back[g], b, starts[g]);
            payloads.push(w);
        }

        let locations: Vec<u64> = std::iter::once(0)
            .chain(payloads.iter().take(groups.saturating_sub(1)).map(|p| p.len_bits()))
            .take(groups)
            .collect();
        let index_bits = bit_length(locations.iter().copied().max().unwrap_or(0)).max(1);
        let size_bits = bit_length(self.group_sizes.iter().copied().max().unwrap_or(0)).max(1);

        let mut out = BitWriter::new();
        for widths in [fwd_collapsed, fwd_single, back_collapsed, back_single] {
            out.push(widths.degree as u64, 8);
            out.push(widths.delta as u64, 8);
        }
        out.push(size_bits as u64, 8);
        out.push(index_bits as u64, 8);
        out.push(groups as u64, 32);
        for (loc, &size) in locations.iter().zip(&self.group_sizes) {
            out.push(*loc, index_bits);
            out.push(size, size_bits);
        }
        out.align_to_byte();
        for payload in &payloads {
            out.append(payload);
        }
        Ok(out.into_bytes())
    }
}

/// Write the delta-only encoding; its header limits it to 256 nodes
pub fn encode_delta_graph(node_count: u64, edges: &[(NodeId, NodeId)]) -> DecodeResult<Vec<u8>> {
    if node_count == 0 || node_count > 256 {
        return Err(DecodeError::corrupt(format!(
            "delta graphs hold 1..=256 nodes, got {}",
            node_count
        )));
    }
    let edges = check_edges(node_count, edges)?;
    let mut out_lists: Vec<Vec<NodeId>> = vec![Vec::new(); node_count as usize];
    for &(s, t) in &edges {
        out_lists[s as usize].push(t);
    }
    let widths = widths_for(
        out_lists
            .iter()
            .enumerate()
            .map(|(n, list)| (n as NodeId, list.as_slice())),
    );

    let payloads: Vec<BitWriter> = out_lists
        .iter()
        .enumerate()
        .map(|(n, list)| {
            let mut w = BitWriter::new();
            write_edge_list(&mut w, list, widths, n as NodeId);
            w
        })
        .collect();
    let lengths: Vec<u64> = payloads
        .iter()
        .take(node_count as usize - 1)
        .map(BitWriter::len_bits)
        .collect();
    let index_bits = bit_length(lengths.iter().copied().max().unwrap_or(0)).max(1);

    let mut out = BitWriter::new();
    out.push(widths.degree as u64, 8);
    out.push(widths.delta as u64, 8);
    out.push(index_bits as u64, 8);
    out.push(node_count - 1, 8);
    for len in lengths {
        out.push(len, index_bits);
    }
    out.align_to_byte();
    for payload in &payloads {
        out.append(payload);
    }
    Ok(out.into_bytes())
}
