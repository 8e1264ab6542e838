//! Capability traits for compact graphs

use super::traversal;
use crate::error::DecodeResult;
use std::collections::BTreeMap;

/// Dense internal node id
pub type NodeId = u64;

/// Relation type -> pathname node ids, as returned by `friends_of`
pub type FriendMap = BTreeMap<String, Vec<NodeId>>;

/// Edge direction for traversals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow edges from source to target
    Outgoing,
    /// Follow edges from target to source
    Incoming,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
        }
    }
}

/// Adjacency access over a decoded-on-demand graph
pub trait AdjacencyProvider: Send + Sync {
    /// Targets of edges leaving `node`, ascending
    fn outgoing_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>>;

    /// Sources of edges entering `node`, ascending
    fn incoming_edges(&self, node: NodeId) -> DecodeResult<Vec<NodeId>>;

    fn node_count(&self) -> u64;

    fn neighbors(&self, node: NodeId, direction: Direction) -> DecodeResult<Vec<NodeId>> {
        match direction {
            Direction::Outgoing => self.outgoing_edges(node),
            Direction::Incoming => self.incoming_edges(node),
        }
    }

    /// Every node reachable over outgoing edges, ascending
    fn all_descendants(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        traversal::reachable(self, node, Direction::Outgoing)
    }

    /// Every node that reaches `node`, ascending
    fn all_ancestors(&self, node: NodeId) -> DecodeResult<Vec<NodeId>> {
        traversal::reachable(self, node, Direction::Incoming)
    }

    /// Every simple forward path from `source` to `sink`
    fn all_paths(&self, source: NodeId, sink: NodeId) -> DecodeResult<Vec<Vec<NodeId>>> {
        traversal::all_paths(self, source, sink)
    }
}

/// Per-entity type lookups the friends query joins on
pub trait EntityTypes {
    /// `cf:type` of a node
    fn node_type(&self, node: NodeId) -> DecodeResult<Option<String>>;

    /// `cf:type` of the relation behind edge `source -> target`, `None` if
    /// there is no such relation
    fn relation_type(&self, source: NodeId, target: NodeId) -> DecodeResult<Option<String>>;
}

/// File/task correlation over the raw group adjacency
pub trait FriendsQuery {
    /// Pathnames whose files connect to some task by the same relation types
    /// that connect `pathname`'s file to `task`, keyed by relation type
    fn friends_of(
        &self,
        pathname: NodeId,
        task: NodeId,
        types: &dyn EntityTypes,
    ) -> DecodeResult<FriendMap>;
}
