//! External identifier <-> internal id mapping
//!
//! The identifiers file is `[u32 BE num_nodes][id,id,...,]`. The first
//! `num_nodes` identifiers are nodes `0..num_nodes` in order; the rest are
//! relations, whose internal ids are only known once the metadata blob has
//! been scanned. Loading is therefore two-phase: parse into an
//! [`IdentifierTable`], then freeze it with the relation ids into an
//! [`IdentifierIndex`].
//!
//! Identifiers are interned with lasso, so the interner key index doubles as
//! the identifier's position in the file.

use crate::bits::BitReader;
use crate::error::{DecodeError, DecodeResult};
use lasso::{Key, Rodeo, RodeoReader, Spur};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

/// Internal id of a node or relation
pub type EntityId = u64;

/// Parsed identifiers file, relation ids not yet assigned
#[derive(Debug)]
pub struct IdentifierTable {
    interner: Rodeo,
    num_nodes: u64,
}

impl IdentifierTable {
    pub fn parse(bytes: &[u8]) -> DecodeResult<Self> {
        let reader = BitReader::new(bytes);
        let num_nodes: u64 = reader.read_uint::<u32>(32, 0)? as u64;

        let body = std::str::from_utf8(&bytes[4..])
            .map_err(|e| DecodeError::corrupt(format!("identifiers are not UTF-8: {}", e)))?;

        let mut interner = Rodeo::default();
        for identifier in body.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if interner.contains(identifier) {
                return Err(DecodeError::corrupt(format!(
                    "duplicate identifier '{}'",
                    identifier
                )));
            }
            interner.get_or_intern(identifier);
        }

        if (interner.len() as u64) < num_nodes {
            return Err(DecodeError::corrupt(format!(
                "identifiers file declares {} nodes but lists {} identifiers",
                num_nodes,
                interner.len()
            )));
        }

        debug!(
            "Parsed {} identifiers ({} nodes, {} relations)",
            interner.len(),
            num_nodes,
            interner.len() as u64 - num_nodes
        );
        Ok(Self {
            interner,
            num_nodes,
        })
    }

    pub fn num_nodes(&self) -> u64 {
        self.num_nodes
    }

    /// Relation identifiers listed after the nodes
    pub fn relation_count(&self) -> usize {
        self.interner.len() - self.num_nodes as usize
    }

    /// Freeze with the internal ids of the relation identifiers, in file order.
    ///
    /// Relations beyond `relation_ids.len()` stay unresolvable.
    pub fn into_index(self, relation_ids: Vec<EntityId>) -> DecodeResult<IdentifierIndex> {
        if relation_ids.len() > self.relation_count() {
            return Err(DecodeError::corrupt(format!(
                "metadata holds {} relations but only {} relation identifiers exist",
                relation_ids.len(),
                self.relation_count()
            )));
        }
        if relation_ids.len() < self.relation_count() {
            warn!(
                "{} relation identifiers have no metadata record",
                self.relation_count() - relation_ids.len()
            );
        }

        let mut relation_keys =
            FxHashMap::with_capacity_and_hasher(relation_ids.len(), Default::default());
        for (k, &id) in relation_ids.iter().enumerate() {
            if id < self.num_nodes {
                return Err(DecodeError::corrupt(format!(
                    "relation id {} falls in the node range",
                    id
                )));
            }
            let key = spur_at(self.num_nodes as usize + k)?;
            if relation_keys.insert(id, key).is_some() {
                return Err(DecodeError::corrupt(format!("relation id {} assigned twice", id)));
            }
        }

        Ok(IdentifierIndex {
            interner: self.interner.into_reader(),
            num_nodes: self.num_nodes,
            relation_ids,
            relation_keys,
        })
    }
}

fn spur_at(index: usize) -> DecodeResult<Spur> {
    Spur::try_from_usize(index)
        .ok_or_else(|| DecodeError::corrupt(format!("identifier index {} overflows", index)))
}

/// Bidirectional identifier lookup, immutable after load
#[derive(Debug)]
pub struct IdentifierIndex {
    interner: RodeoReader,
    num_nodes: u64,
    /// Internal id of the k-th relation identifier
    relation_ids: Vec<EntityId>,
    relation_keys: FxHashMap<EntityId, Spur>,
}

impl IdentifierIndex {
    #[inline]
    pub fn num_nodes(&self) -> u64 {
        self.num_nodes
    }

    pub fn num_relations(&self) -> usize {
        self.relation_keys.len()
    }

    /// Internal id for an external identifier
    pub fn lookup(&self, identifier: &str) -> Option<EntityId> {
        let position = self.interner.get(identifier)?.into_usize() as u64;
        if position < self.num_nodes {
            Some(position)
        } else {
            self.relation_ids
                .get((position - self.num_nodes) as usize)
                .copied()
        }
    }

    /// External identifier for an internal id
    pub fn identifier(&self, id: EntityId) -> Option<&str> {
        let key = if id < self.num_nodes {
            Spur::try_from_usize(id as usize)?
        } else {
            *self.relation_keys.get(&id)?
        };
        Some(self.interner.resolve(&key))
    }

    #[inline]
    pub fn is_node(&self, id: EntityId) -> bool {
        id < self.num_nodes
    }

    /// Node identifiers in internal-id order
    pub fn node_identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.num_nodes as usize)
            .filter_map(|i| Spur::try_from_usize(i))
            .map(move |key| self.interner.resolve(&key))
    }
}
