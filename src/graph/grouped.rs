//! Grouped compact graph
//!
//! Nodes are clustered into groups of consecutive ids. A group of one node
//! stores that node's adjacency directly. A collapsed group is a version
//! chain `start, start+1, ...` where every member points at its predecessor;
//! the chain edges are implicit and the remaining edges of all members are
//! stored once, aggregated, as the group's raw lists.
//!
//! ```text
//! [8 x 8 bits] degree/delta widths: fwd collapsed, fwd single, back collapsed, back single
//! [8] size entry bits [8] index entry bits [32] group_count
//! group_count x ([index entry bits] location delta, [size entry bits] group size)
//! <byte align>
//! per group: forward raw list, backward raw list
//! ```
//!
//! Raw forward lists hold the real targets of edges leaving any member; raw
//! backward lists hold the real sources of edges entering any member. Both
//! are delta-encoded against the group's first node id.

use super::edges::{edge_list_end, read_edge_list, EdgeWidths};
use super::traits::{AdjacencyProvider, Direction, NodeId};
use crate::bits::BitReader;
use crate::blob::Blob;
use crate::error::{DecodeError, DecodeResult};
use std::ops::Range;
use tracing::debug;

/// Edge widths for each direction and group flavour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupWidths {
    pub fwd_collapsed: EdgeWidths,
    pub fwd_single: EdgeWidths,
    pub back_collapsed: EdgeWidths,
    pub back_single: EdgeWidths,
}

impl GroupWidths {
    pub fn for_list(&self, direction: Direction, collapsed: bool) -> EdgeWidths {
        match (direction, collapsed) {
            (Direction::Outgoing, true) => self.fwd_collapsed,
            (Direction::Outgoing, false) => self.fwd_single,
            (Direction::Incoming, true) => self.back_collapsed,
            (Direction::Incoming, false) => self.back_single,
        }
    }
}

/// Index into the group table
pub type GroupId = usize;

/// Group-collapsed adjacency over an encoded graph blob
#[derive(Debug)]
pub struct GroupedGraph<B = Blob> {
    reader: BitReader<B>,
    widths: GroupWidths,
    /// First node of each group, plus the node count as a closing sentinel
    group_index: Vec<NodeId>,
    /// Absolute bit position of each group's payload
    idx2pos: Vec<u64>,
}

impl<B: AsRef<[u8]>> GroupedGraph<B> {
    pub fn load(blob: B) -> DecodeResult<Self> {
        let reader = BitReader::new(blob);
        let mut cursor = reader.cursor(0);

        let mut widths = [EdgeWidths::default(); 4];
        for w in &mut widths {
            *w = EdgeWidths {
                degree: cursor.take::<u32>(8)?,
                delta: cursor.take::<u32>(8)?,
            }
            .validate()?;
        }
        let widths = GroupWidths {
            fwd_collapsed: widths[0],
            fwd_single: widths[1],
            back_collapsed: widths[2],
            back_single: widths[3],
        };
        let size_bits = cursor.take::<u32>(8)?;
        let index_bits = cursor.take::<u32>(8)?;
        let group_count = cursor.take::<u64>(32)? as usize;

        // every group holds at least one node, so sizes need at least one bit
        if group_count > 0 && size_bits == 0 {
            return Err(DecodeError::corrupt(format!(
                "{} groups with a zero-width size field",
                group_count
            )));
        }
        if (group_count as u64).saturating_mul((size_bits + index_bits) as u64)
            > reader.len_bits().saturating_sub(cursor.position())
        {
            return Err(DecodeError::corrupt(format!(
                "group table of {} entries exceeds the blob",
                group_count
            )));
        }

        let mut group_index = Vec::with_capacity(group_count + 1);
        let mut offsets = Vec::with_capacity(group_count);
        let mut next_start: NodeId = 0;
        let mut location: u64 = 0;
        for g in 0..group_count {
            let loc_delta = cursor.take::<u64>(index_bits)?;
            let size = cursor.take::<u64>(size_bits)?;
            if size == 0 {
                return Err(DecodeError::corrupt(format!("group {} is empty", g)));
            }
            location = location
                .checked_add(loc_delta)
                .ok_or_else(|| DecodeError::corrupt("group location overflows"))?;
            group_index.push(next_start);
            offsets.push(location);
            next_start = next_start
                .checked_add(size)
                .ok_or_else(|| DecodeError::corrupt("group sizes overflow"))?;
        }
        group_index.push(next_start);

        cursor.align_to_byte();
        let base = cursor.position();
        let idx2pos = offsets.into_iter().map(|loc| base + loc).collect();

        let graph = Self {
            reader,
            widths,
            group_index,
            idx2pos,
        };
        debug!(
            "Loaded grouped graph: {} nodes in {} groups ({} collapsed)",
            graph.node_count(),
            graph.group_count(),
            graph.collapsed_group_count()
        );
        Ok(graph)
    }

    pub fn node_count(&self) -> u64 {
        self.group_index.last().copied().unwrap_or(0)
    }

    pub fn widths(&self) -> &GroupWidths {
        &self.widths
    }

    pub fn group_count(&self) -> usize {
        self.idx2pos.len()
    }

    pub fn collapsed_group_count(&self) -> usize {
        (0..self.group_count())
            .filter(|&g| self.group_size(g) > 1)
            .count()
    }

    /// Group start ids with the closing node-count sentinel
    pub fn group_index(&self) -> &[NodeId] {
        &self.group_index
    }

    pub fn group_span(&self, group: GroupId) -> Range<NodeId> {
        self.group_index[group]..self.group_index[group + 1]
    }

    fn group_size(&self, group: GroupId) -> u64 {
        self.group_index[group + 1] - self.group_index[group]
    }

    pub fn is_collapsed(&self, group: GroupId) -> bool {
        self.group_size(group) > 1
    }

    pub(crate) fn check_node(&self, node: NodeId) -> DecodeResult<()> {
        if node >= self.node_count() {
            return Err(DecodeError::NodeOutOfRange {
                node,
                count: self.node_count(),
            });
        }
        Ok(())
    }

    /// Owning group of `node`, by binary search over the group starts
    pub fn group_of(&self, node: NodeId) -> DecodeResult<GroupId> {
        self.check_node(node)?;
        let upper = self.group_index.partition_point(|&start| start <= node);
        let group = upper
            .checked_sub(1)
            .filter(|&g| g < self.group_count())
            .ok_or_else(|| DecodeError::corrupt(format!("no group brackets node {}", node)))?;
        if !self.group_span(group).contains(&node) {
            return Err(DecodeError::corrupt(format!(
                "group {} does not bracket node {}",
                group, node
            )));
        }
        Ok(group)
    }

    /// The stored (aggregated) edge list of a group, ascending
    pub fn raw_edges(&self, group: GroupId, direction: Direction) -> DecodeResult<Vec<NodeId>> {
        let collapsed = self.is_collapsed(group);
        let base = self.group_index[group];
        let node_count = self.node_count();
        let fwd = self.widths.for_list(Direction::Outgoing, collapsed);

        let pos = self.idx2pos[group];
        let mut edges = match direction {
            Direction::Outgoing => read_edge_list(&self.reader, pos, fwd, base, node_count)?.0,
            Direction::Incoming => {
                let back = self.widths.for_list(Direction::Incoming, collapsed);
                let back_pos = edge_list_end(&self.reader, pos, fwd)?;
                read_edge_list(&self.reader, back_pos, back, base, node_count)?.0
            }
        };
        edges.sort_unstable();
        Ok(edges)
    }

    /// Entries of `group`'s raw list that fall inside `span`
    pub(crate) fn raw_edges_within(
        &self,
        group: GroupId,
        direction: Direction,
        span: &Range<NodeId>,
    ) -> DecodeResult<Vec<NodeId>> {
        let mut edges = self.raw_edges(group, direction)?;
        edges.retain(|n| span.contains(n));
        Ok(edges)
    }

    /// Per-node edges, attributing a collapsed group's raw list to members
    pub fn edges(&self, node: NodeId, direction: Direction) -> DecodeResult<Vec<NodeId>> {
        let group = self.group_of(node)?;
        if !self.is_collapsed(group) {
            return self.raw_edges(group, direction);
        }

        let span = self.group_span(group);
        let mut result = Vec::new();
        match direction {
            Direction::Outgoing if node > span.start => result.push(node - 1),
            Direction::Incoming if node + 1 < span.end => result.push(node + 1),
            _ => {}
        }

        // Raw entries are sorted, so entries landing in the same other group
        // form one run. The other group's reverse list, restricted to this
        // group, names the member at our end of each of those edges; both
        // sides are sorted and pair up one to one.
        let raw = self.raw_edges(group, direction)?;
        let mut i = 0;
        while i < raw.len() {
            let other = self.group_of(raw[i])?;
            let other_end = self.group_index[other + 1];
            let run_len = raw[i..].partition_point(|&n| n < other_end);
            let run = &raw[i..i + run_len];
            let members = self.raw_edges_within(other, direction.reverse(), &span)?;
            if members.len() != run.len() {
                return Err(DecodeError::corrupt(format!(
                    "group {} lists {} edges into group {} but group {} lists {} back",
                    group,
                    run.len(),
                    other,
                    other,
                    members.len()
                )));
            }
            result.extend(
                run.iter()
                    .zip(&members)
                    .filter(|(_, member)| **member == node)
                    .map(|(&neighbor, _)| neighbor),
            );
            i += run_len;
        }

        result.sort_unstable();
        result.dedup();
        Ok(result)
    }
}

impl<B: AsRef<[u8]> + Send + Sync> AdjacencyProvider for GroupedGraph<B> {
    fn outgoing_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        self.edges(node, Direction::Outgoing)
    }

    fn incoming_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        self.edges(node, Direction::Incoming)
    }

    fn node_count(&self) -> u64 {
        GroupedGraph::node_count(self)
    }
}

