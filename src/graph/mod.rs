//! Compact provenance graph
//!
//! Adjacency is decoded on demand from the encoded blob; nothing is
//! materialized beyond small per-load indexes. Two encodings exist:
//!
//! - `grouped` ([`GroupedGraph`]): version chains collapsed into groups,
//!   forward and backward lists stored per group. Supports `friends_of`.
//! - `delta` ([`DeltaGraph`]): forward lists per node only.
//!
//! Both implement [`AdjacencyProvider`]; [`CompactGraph`] picks one at load.

mod delta;
mod edges;
mod friends;
mod grouped;
mod traits;
pub mod traversal;

pub use delta::DeltaGraph;
pub use edges::EdgeWidths;
pub use grouped::{GroupId, GroupWidths, GroupedGraph};
pub use traits::{AdjacencyProvider, Direction, EntityTypes, FriendMap, FriendsQuery, NodeId};

pub(crate) use edges::{write_edge_list, zigzag};

use crate::blob::Blob;
use crate::error::{DecodeError, DecodeResult};
use serde::{Deserialize, Serialize};

/// Which graph encoding a blob uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphFormat {
    #[default]
    Grouped,
    Delta,
}

/// A graph in whichever encoding the inputs use
#[derive(Debug)]
pub enum CompactGraph<B = Blob> {
    Grouped(GroupedGraph<B>),
    Delta(DeltaGraph<B>),
}

impl<B: AsRef<[u8]>> CompactGraph<B> {
    pub fn load(blob: B, format: GraphFormat) -> DecodeResult<Self> {
        Ok(match format {
            GraphFormat::Grouped => CompactGraph::Grouped(GroupedGraph::load(blob)?),
            GraphFormat::Delta => CompactGraph::Delta(DeltaGraph::load(blob)?),
        })
    }

    pub fn format(&self) -> GraphFormat {
        match self {
            CompactGraph::Grouped(_) => GraphFormat::Grouped,
            CompactGraph::Delta(_) => GraphFormat::Delta,
        }
    }

    pub fn as_grouped(&self) -> Option<&GroupedGraph<B>> {
        match self {
            CompactGraph::Grouped(g) => Some(g),
            CompactGraph::Delta(_) => None,
        }
    }
}

impl<B: AsRef<[u8]> + Send + Sync> AdjacencyProvider for CompactGraph<B> {
    fn outgoing_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        match self {
            CompactGraph::Grouped(g) => g.outgoing_edges(node),
            CompactGraph::Delta(g) => g.outgoing_edges(node),
        }
    }

    fn incoming_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        match self {
            CompactGraph::Grouped(g) => g.incoming_edges(node),
            CompactGraph::Delta(g) => g.incoming_edges(node),
        }
    }

    fn node_count(&self) -> u64 {
        match self {
            CompactGraph::Grouped(g) => g.node_count(),
            CompactGraph::Delta(g) => g.node_count(),
        }
    }
}

impl<B: AsRef<[u8]> + Send + Sync> FriendsQuery for CompactGraph<B> {
    fn friends_of(
        &self,
        pathname: NodeId,
        task: NodeId,
        types: &dyn EntityTypes,
    ) -> DecodeResult<FriendMap> {
        match self {
            CompactGraph::Grouped(g) => g.friends_of(pathname, task, types),
            CompactGraph::Delta(_) => Err(DecodeError::Unsupported(
                "friends_of needs the grouped graph encoding",
            )),
        }
    }
}
