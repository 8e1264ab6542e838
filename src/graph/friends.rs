//! `friends_of` over the grouped encoding
//!
//! Works on groups rather than nodes: a group is every version of one
//! object, so "the file" and "the task" mean all of their versions. Only the
//! raw lists of the groups involved are ever decoded.

use super::grouped::{GroupId, GroupedGraph};
use super::traits::{AdjacencyProvider, Direction, EntityTypes, FriendMap, FriendsQuery, NodeId};
use crate::error::DecodeResult;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use tracing::debug;

const FILE_TYPE: &str = "file";
const NAMED_RELATION: &str = "named";

impl<B: AsRef<[u8]> + Send + Sync> GroupedGraph<B> {
    /// Candidate `(source, target)` pairs for edges from group `from` into
    /// group `to`, from the two raw lists that could record them
    fn edges_between(&self, from: GroupId, to: GroupId) -> DecodeResult<Vec<(NodeId, NodeId)>> {
        let to_span = self.group_span(to);
        let from_span = self.group_span(from);
        let mut targets = self.raw_edges_within(from, Direction::Outgoing, &to_span)?;
        targets.dedup();
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let mut sources = self.raw_edges_within(to, Direction::Incoming, &from_span)?;
        sources.dedup();
        Ok(sources
            .iter()
            .flat_map(|&s| targets.iter().map(move |&t| (s, t)))
            .collect())
    }

    /// Relation types recorded between two groups, either direction
    fn linking_types(
        &self,
        a: GroupId,
        b: GroupId,
        types: &dyn EntityTypes,
    ) -> DecodeResult<BTreeSet<String>> {
        let mut found = BTreeSet::new();
        let pairs = self
            .edges_between(a, b)?
            .into_iter()
            .chain(self.edges_between(b, a)?);
        for (source, target) in pairs {
            if let Some(typ) = types.relation_type(source, target)? {
                found.insert(typ);
            }
        }
        Ok(found)
    }

    /// Pathname of a file group: its single distinct target, or else the
    /// lowest target reached through a `named` relation
    fn pathname_of_group(
        &self,
        group: GroupId,
        types: &dyn EntityTypes,
    ) -> DecodeResult<Option<NodeId>> {
        let span = self.group_span(group);
        let mut targets = self.raw_edges(group, Direction::Outgoing)?;
        targets.retain(|t| !span.contains(t));
        targets.dedup();

        if let [only] = targets.as_slice() {
            return Ok(Some(*only));
        }
        for target in targets {
            let target_group = self.group_of(target)?;
            for source in self.raw_edges_within(target_group, Direction::Incoming, &span)? {
                if types.relation_type(source, target)?.as_deref() == Some(NAMED_RELATION) {
                    return Ok(Some(target));
                }
            }
        }
        Ok(None)
    }

    /// File groups tied to the task group by one of `linking` relation types
    fn friend_groups(
        &self,
        task_span: &Range<NodeId>,
        task_group: GroupId,
        file_span: &Range<NodeId>,
        linking: &BTreeSet<String>,
        types: &dyn EntityTypes,
    ) -> DecodeResult<BTreeMap<String, BTreeSet<GroupId>>> {
        let mut friends: BTreeMap<String, BTreeSet<GroupId>> = BTreeMap::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            let mut others = self.raw_edges(task_group, direction)?;
            others.retain(|n| !task_span.contains(n) && !file_span.contains(n));
            others.dedup();

            for other in others {
                if types.node_type(other)?.as_deref() != Some(FILE_TYPE) {
                    continue;
                }
                let other_group = self.group_of(other)?;
                let mut members =
                    self.raw_edges_within(other_group, direction.reverse(), task_span)?;
                members.dedup();
                for member in members {
                    let (source, target) = match direction {
                        Direction::Outgoing => (member, other),
                        Direction::Incoming => (other, member),
                    };
                    if let Some(typ) = types.relation_type(source, target)? {
                        if linking.contains(&typ) {
                            friends.entry(typ).or_default().insert(other_group);
                        }
                    }
                }
            }
        }
        Ok(friends)
    }
}

impl<B: AsRef<[u8]> + Send + Sync> FriendsQuery for GroupedGraph<B> {
    fn friends_of(
        &self,
        pathname: NodeId,
        task: NodeId,
        types: &dyn EntityTypes,
    ) -> DecodeResult<FriendMap> {
        self.check_node(pathname)?;
        self.check_node(task)?;

        let file = match self.incoming_edges(pathname)?.as_slice() {
            [file] => *file,
            preds => {
                debug!(
                    "Pathname {} has {} predecessors, expected exactly one file",
                    pathname,
                    preds.len()
                );
                return Ok(FriendMap::new());
            }
        };
        let file_group = self.group_of(file)?;
        let task_group = self.group_of(task)?;
        if file_group == task_group {
            return Ok(FriendMap::new());
        }

        let linking = self.linking_types(file_group, task_group, types)?;
        if linking.is_empty() {
            debug!("File {} and task {} share no relation", file, task);
            return Ok(FriendMap::new());
        }

        let file_span = self.group_span(file_group);
        let task_span = self.group_span(task_group);
        let groups = self.friend_groups(&task_span, task_group, &file_span, &linking, types)?;

        let mut result = FriendMap::new();
        for (typ, groups) in groups {
            let mut pathnames = BTreeSet::new();
            for group in groups {
                if let Some(path) = self.pathname_of_group(group, types)? {
                    pathnames.insert(path);
                }
            }
            if !pathnames.is_empty() {
                result.insert(typ, pathnames.into_iter().collect());
            }
        }
        Ok(result)
    }
}
