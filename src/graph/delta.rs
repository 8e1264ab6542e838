//! Delta-only compact graph
//!
//! The older encoding keeps one forward edge list per node and no groups:
//!
//! ```text
//! [8] degree bits [8] delta bits [8] index entry bits [8] node_count - 1
//! (node_count - 1) x [index entry bits] payload length of the previous node
//! <byte align>
//! per node: forward edge list, first delta relative to the node itself
//! ```
//!
//! Incoming edges are not stored; they come from a transposed adjacency
//! built once while loading.

use super::edges::{read_edge_list, EdgeWidths};
use super::traits::{AdjacencyProvider, NodeId};
use crate::bits::BitReader;
use crate::blob::Blob;
use crate::error::{DecodeError, DecodeResult};
use tracing::debug;

#[derive(Debug)]
pub struct DeltaGraph<B = Blob> {
    reader: BitReader<B>,
    widths: EdgeWidths,
    /// Absolute bit position of each node's edge list
    index: Vec<u64>,
    incoming: Vec<Vec<NodeId>>,
}

impl<B: AsRef<[u8]>> DeltaGraph<B> {
    pub fn load(blob: B) -> DecodeResult<Self> {
        let reader = BitReader::new(blob);
        let mut cursor = reader.cursor(0);
        let widths = EdgeWidths {
            degree: cursor.take::<u32>(8)?,
            delta: cursor.take::<u32>(8)?,
        }
        .validate()?;
        let index_bits = cursor.take::<u32>(8)?;
        let node_count = cursor.take::<u64>(8)? as usize + 1;

        let mut offsets = Vec::with_capacity(node_count);
        offsets.push(0u64);
        for _ in 1..node_count {
            let len = cursor.take::<u64>(index_bits)?;
            let prev = offsets.last().copied().unwrap_or(0);
            offsets.push(
                prev.checked_add(len)
                    .ok_or_else(|| DecodeError::corrupt("node index overflows"))?,
            );
        }
        cursor.align_to_byte();
        let base = cursor.position();
        let index: Vec<u64> = offsets.into_iter().map(|o| base + o).collect();

        let mut incoming = vec![Vec::new(); node_count];
        for (node, &pos) in index.iter().enumerate() {
            let (targets, _) =
                read_edge_list(&reader, pos, widths, node as NodeId, node_count as u64)?;
            for target in targets {
                incoming[target as usize].push(node as NodeId);
            }
        }

        debug!("Loaded delta graph: {} nodes", node_count);
        Ok(Self {
            reader,
            widths,
            index,
            incoming,
        })
    }

    pub fn node_count(&self) -> u64 {
        self.index.len() as u64
    }

    fn check_node(&self, node: NodeId) -> DecodeResult<usize> {
        if node >= self.node_count() {
            return Err(DecodeError::NodeOutOfRange {
                node,
                count: self.node_count(),
            });
        }
        Ok(node as usize)
    }
}

impl<B: AsRef<[u8]> + Send + Sync> AdjacencyProvider for DeltaGraph<B> {
    fn outgoing_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        let idx = self.check_node(node)?;
        let (targets, _) = read_edge_list(
            &self.reader,
            self.index[idx],
            self.widths,
            node,
            self.node_count(),
        )?;
        Ok(targets)
    }

    fn incoming_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        let idx = self.check_node(node)?;
        Ok(self.incoming[idx].clone())
    }

    fn node_count(&self) -> u64 {
        DeltaGraph::node_count(self)
    }
}
