//! Relation kinds and relation id arithmetic
//!
//! A relation between head node `h` and tail node `t` (graph edge `t -> h`)
//! has internal id `num_nodes + ((h << id_bits) | t)`, so its endpoints are
//! recoverable from the id alone. The metadata blob stores only the packed
//! pair `(h << id_bits) | t` in a `2 * id_bits` field.

use crate::error::{DecodeError, DecodeResult};
use crate::identifiers::EntityId;

/// The relation types a metadata record can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Used,
    WasGeneratedBy,
    WasDerivedFrom,
    WasInformedBy,
    Relation,
}

impl RelationKind {
    pub const ALL: [RelationKind; 5] = [
        RelationKind::Used,
        RelationKind::WasGeneratedBy,
        RelationKind::WasDerivedFrom,
        RelationKind::WasInformedBy,
        RelationKind::Relation,
    ];

    pub fn from_type(typ: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == typ)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Used => "used",
            RelationKind::WasGeneratedBy => "wasGeneratedBy",
            RelationKind::WasDerivedFrom => "wasDerivedFrom",
            RelationKind::WasInformedBy => "wasInformedBy",
            RelationKind::Relation => "relation",
        }
    }

    /// Metadata field names for the (head, tail) endpoints
    pub fn endpoint_fields(self) -> (&'static str, &'static str) {
        match self {
            RelationKind::Used => ("prov:entity", "prov:activity"),
            RelationKind::WasGeneratedBy => ("prov:activity", "prov:entity"),
            RelationKind::WasDerivedFrom => ("prov:usedEntity", "prov:generatedEntity"),
            RelationKind::WasInformedBy => ("prov:informant", "prov:informed"),
            RelationKind::Relation => ("cf:sender", "cf:receiver"),
        }
    }
}

/// Relation id layout for one encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationIdSpace {
    num_nodes: u64,
    id_bits: u32,
}

impl RelationIdSpace {
    pub fn new(num_nodes: u64, id_bits: u32) -> Self {
        Self { num_nodes, id_bits }
    }

    pub fn id_bits(&self) -> u32 {
        self.id_bits
    }

    /// Width of a relation id field in the metadata blob
    pub fn field_bits(&self) -> u32 {
        2 * self.id_bits
    }

    /// Packed endpoint pair as stored in the blob, if both are nodes
    pub fn packed(&self, head: EntityId, tail: EntityId) -> Option<u64> {
        if head >= self.num_nodes || tail >= self.num_nodes {
            return None;
        }
        Some((head << self.id_bits) | tail)
    }

    /// Id of the relation behind graph edge `tail -> head`, if both are nodes
    pub fn relation_id(&self, head: EntityId, tail: EntityId) -> Option<EntityId> {
        self.packed(head, tail).map(|packed| self.num_nodes + packed)
    }

    /// Internal id for a packed endpoint pair read from the blob
    pub fn from_packed(&self, packed: u64) -> DecodeResult<EntityId> {
        let id = self.num_nodes + packed;
        self.endpoints(id)?;
        Ok(id)
    }

    /// Split a relation id into its (head, tail) node ids
    pub fn endpoints(&self, id: EntityId) -> DecodeResult<(EntityId, EntityId)> {
        let packed = id.checked_sub(self.num_nodes).ok_or_else(|| {
            DecodeError::corrupt(format!("relation id {} falls in the node range", id))
        })?;
        let mask = (1u64 << self.id_bits) - 1;
        let head = packed >> self.id_bits;
        let tail = packed & mask;
        if head >= self.num_nodes || tail >= self.num_nodes {
            return Err(DecodeError::corrupt(format!(
                "relation id {} decodes to endpoints ({}, {}) outside {} nodes",
                id, head, tail, self.num_nodes
            )));
        }
        Ok((head, tail))
    }
}
