//! Query façade over one loaded provenance corpus
//!
//! Translates external identifiers to internal ids, runs the graph or
//! metadata query, and translates the result back. Unknown identifiers and
//! relation identifiers have no graph neighbourhood and yield empty results.

use crate::blob::Blob;
use crate::config::QuerierConfig;
use crate::dictionary::{Dictionaries, Dictionary};
use crate::error::{DecodeError, DecodeResult};
use crate::graph::{AdjacencyProvider, CompactGraph, FriendsQuery, GraphFormat, NodeId};
use crate::identifiers::IdentifierTable;
use crate::metadata::{MetadataDecoder, MetadataRecord};
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, trace};

/// Relation type -> pathname identifiers
pub type FriendIdentifiers = BTreeMap<String, Vec<String>>;

/// Load summary of an opened corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerierStats {
    pub nodes: u64,
    pub relations: usize,
    pub graph_format: GraphFormat,
    pub groups: Option<usize>,
    pub collapsed_groups: Option<usize>,
    /// Entry count of each dictionary, by name
    pub dictionaries: BTreeMap<&'static str, usize>,
}

/// Metadata decoder and compact graph behind identifier-level queries
#[derive(Debug)]
pub struct Querier<G = CompactGraph, B = Blob> {
    metadata: MetadataDecoder<B>,
    graph: G,
}

impl Querier {
    /// Load the four inputs named by `config`
    pub fn open(config: &QuerierConfig) -> anyhow::Result<Self> {
        let mmap = config.loading.mmap;
        let options = config.metadata_options();

        let identifiers_path = config.identifiers_path();
        let identifiers = Blob::open(&identifiers_path, mmap)?;
        let table = IdentifierTable::parse(identifiers.as_ref()).with_context(|| {
            format!("Failed to parse identifiers {}", identifiers_path.display())
        })?;

        let dictionaries_path = config.dictionaries_path();
        let text = std::fs::read_to_string(&dictionaries_path).with_context(|| {
            format!("Failed to read dictionaries {}", dictionaries_path.display())
        })?;
        let mut dictionaries = Dictionaries::parse(&text, options.width_rule).with_context(|| {
            format!("Failed to parse dictionaries {}", dictionaries_path.display())
        })?;
        if options.common_strings {
            let (codes_path, names_path) = config.common_strings_paths();
            let codes = std::fs::read(&codes_path).with_context(|| {
                format!("Failed to read common strings {}", codes_path.display())
            })?;
            let names = std::fs::read_to_string(&names_path).with_context(|| {
                format!("Failed to read common strings {}", names_path.display())
            })?;
            let common = Dictionary::common_strings(&codes, &names).with_context(|| {
                format!("Failed to parse common strings {}", codes_path.display())
            })?;
            dictionaries = dictionaries.with_common_strings(common);
        }

        let metadata_path = config.metadata_path();
        let metadata_blob = Blob::open(&metadata_path, mmap)?;
        let metadata_bytes = metadata_blob.len();
        let metadata = MetadataDecoder::load(table, dictionaries, metadata_blob, options)
            .with_context(|| format!("Failed to load metadata {}", metadata_path.display()))?;

        let graph_path = config.graph_path();
        let graph_blob = Blob::open(&graph_path, mmap)?;
        let graph_bytes = graph_blob.len();
        let graph = CompactGraph::load(graph_blob, config.encoding.graph_format)
            .with_context(|| format!("Failed to load graph {}", graph_path.display()))?;

        info!(
            "Opened corpus: metadata {} bytes, {:?} graph {} bytes",
            metadata_bytes,
            graph.format(),
            graph_bytes
        );
        Ok(Self::new(metadata, graph)?)
    }
}

impl<G: AdjacencyProvider, B: AsRef<[u8]>> Querier<G, B> {
    /// Both halves must describe the same node set
    pub fn new(metadata: MetadataDecoder<B>, graph: G) -> DecodeResult<Self> {
        if graph.node_count() != metadata.num_nodes() {
            return Err(DecodeError::corrupt(format!(
                "graph has {} nodes but the identifiers file declares {}",
                graph.node_count(),
                metadata.num_nodes()
            )));
        }
        Ok(Self { metadata, graph })
    }

    pub fn metadata(&self) -> &MetadataDecoder<B> {
        &self.metadata
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn get_metadata(&self, identifier: &str) -> DecodeResult<MetadataRecord> {
        self.metadata.get_metadata(identifier)
    }

    pub fn get_all_ancestors(&self, identifier: &str) -> DecodeResult<Vec<String>> {
        self.node_query(identifier, |g, n| g.all_ancestors(n))
    }

    pub fn get_direct_ancestors(&self, identifier: &str) -> DecodeResult<Vec<String>> {
        self.node_query(identifier, |g, n| g.incoming_edges(n))
    }

    pub fn get_all_descendants(&self, identifier: &str) -> DecodeResult<Vec<String>> {
        self.node_query(identifier, |g, n| g.all_descendants(n))
    }

    pub fn get_direct_descendants(&self, identifier: &str) -> DecodeResult<Vec<String>> {
        self.node_query(identifier, |g, n| g.outgoing_edges(n))
    }

    /// Every simple forward path from `source` to `sink`
    pub fn all_paths(&self, source: &str, sink: &str) -> DecodeResult<Vec<Vec<String>>> {
        let (Some(from), Some(to)) = (self.node_of(source), self.node_of(sink)) else {
            return Ok(Vec::new());
        };
        self.graph
            .all_paths(from, to)?
            .into_iter()
            .map(|path| self.identifiers_of(path))
            .collect()
    }

    /// Identifiers of every node, in id order
    pub fn get_node_ids(&self) -> Vec<String> {
        self.metadata
            .identifiers()
            .node_identifiers()
            .map(str::to_string)
            .collect()
    }

    pub fn entity_count(&self) -> u64 {
        self.metadata.num_nodes()
    }

    pub fn relation_count(&self) -> usize {
        self.metadata.num_relations()
    }

    /// Internal id of a node identifier; relations and unknowns are `None`
    pub fn node_of(&self, identifier: &str) -> Option<NodeId> {
        let id = self.metadata.identifiers().lookup(identifier);
        match id {
            Some(id) if self.metadata.identifiers().is_node(id) => Some(id),
            _ => {
                trace!("{} is not a graph node", identifier);
                None
            }
        }
    }

    fn node_query(
        &self,
        identifier: &str,
        query: impl FnOnce(&G, NodeId) -> DecodeResult<Vec<NodeId>>,
    ) -> DecodeResult<Vec<String>> {
        match self.node_of(identifier) {
            Some(node) => self.identifiers_of(query(&self.graph, node)?),
            None => Ok(Vec::new()),
        }
    }

    fn identifiers_of(&self, nodes: Vec<NodeId>) -> DecodeResult<Vec<String>> {
        nodes
            .into_iter()
            .map(|node| {
                self.metadata
                    .identifiers()
                    .identifier(node)
                    .map(str::to_string)
                    .ok_or_else(|| DecodeError::corrupt(format!("node {} has no identifier", node)))
            })
            .collect()
    }
}

impl<G: AdjacencyProvider + FriendsQuery, B: AsRef<[u8]>> Querier<G, B> {
    /// Pathnames of files tied to `task` the way `pathname`'s file is
    pub fn friends_of(&self, pathname: &str, task: &str) -> DecodeResult<FriendIdentifiers> {
        let (Some(path), Some(task)) = (self.node_of(pathname), self.node_of(task)) else {
            return Ok(FriendIdentifiers::new());
        };
        self.graph
            .friends_of(path, task, &self.metadata)?
            .into_iter()
            .map(|(typ, nodes)| Ok::<_, DecodeError>((typ, self.identifiers_of(nodes)?)))
            .collect()
    }
}

impl<B: AsRef<[u8]> + Send + Sync> Querier<CompactGraph<B>, B> {
    pub fn stats(&self) -> QuerierStats {
        let grouped = self.graph.as_grouped();
        let dicts = self.metadata.context().dictionaries();
        let dictionaries = [
            &dicts.key,
            &dicts.value,
            &dicts.label,
            &dicts.typ,
            &dicts.node_type,
        ]
        .into_iter()
        .chain(dicts.common.as_ref())
        .map(|d| (d.name(), d.len()))
        .collect();
        QuerierStats {
            nodes: self.entity_count(),
            relations: self.relation_count(),
            graph_format: self.graph.format(),
            groups: grouped.map(|g| g.group_count()),
            collapsed_groups: grouped.map(|g| g.collapsed_group_count()),
            dictionaries,
        }
    }
}
