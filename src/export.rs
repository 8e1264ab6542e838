//! Materialize a corpus as a petgraph graph for export

use crate::error::DecodeResult;
use crate::graph::{AdjacencyProvider, EntityTypes, NodeId};
use crate::querier::Querier;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

/// Node label: `file_name: <pathname>` for pathnames, `<cf:type>, <cf:id> <identifier>` otherwise
fn node_label<G: AdjacencyProvider, B: AsRef<[u8]>>(
    querier: &Querier<G, B>,
    node: NodeId,
) -> DecodeResult<String> {
    let record = querier.metadata().metadata_by_id(node)?.unwrap_or_default();
    let field = |key: &str| record.get(key).map(String::as_str).unwrap_or("");
    let identifier = querier.metadata().identifiers().identifier(node).unwrap_or("");
    Ok(match field("cf:type") {
        "file_name" => format!("file_name: {}", field("cf:pathname")),
        typ => format!("{}, {} {}", typ, field("cf:id"), identifier),
    })
}

/// Every node and edge, labelled; edges carry their relation's `cf:type`
pub fn to_digraph<G: AdjacencyProvider, B: AsRef<[u8]>>(
    querier: &Querier<G, B>,
) -> DecodeResult<DiGraph<String, String>> {
    let graph = querier.graph();
    let count = graph.node_count();
    let mut out = DiGraph::with_capacity(count as usize, count as usize * 2);
    let mut indices: Vec<NodeIndex> = Vec::with_capacity(count as usize);
    for node in 0..count {
        indices.push(out.add_node(node_label(querier, node)?));
    }
    for source in 0..count {
        for target in graph.outgoing_edges(source)? {
            let label = querier
                .metadata()
                .relation_type(source, target)?
                .unwrap_or_default();
            out.add_edge(indices[source as usize], indices[target as usize], label);
        }
    }
    Ok(out)
}

/// Render as graphviz DOT
pub fn to_dot<G: AdjacencyProvider, B: AsRef<[u8]>>(querier: &Querier<G, B>) -> DecodeResult<String> {
    let graph = to_digraph(querier)?;
    Ok(format!("{}", Dot::new(&graph)))
}
