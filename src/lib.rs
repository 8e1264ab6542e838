//! provquery - query engine over bit-packed provenance graphs
//!
//! Answers metadata, ancestry, path and file/task correlation queries
//! directly against the compressed inputs: an identifiers file, the
//! dictionaries file, the metadata blob and the graph blob. Records and
//! adjacency lists are decoded on demand; nothing is expanded up front.
//!
//! ```no_run
//! use provquery::{Querier, QuerierConfig};
//!
//! let config = QuerierConfig::load(None)?.with_data_dir(None);
//! let querier = Querier::open(&config)?;
//! for id in querier.get_all_ancestors("some-node")? {
//!     println!("{}", id);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bits;
pub mod blob;
pub mod config;
pub mod dictionary;
pub mod encode;
pub mod error;
pub mod export;
pub mod graph;
pub mod identifiers;
pub mod metadata;
pub mod querier;

pub use bits::{BitReader, WidthRule};
pub use blob::Blob;
pub use config::QuerierConfig;
pub use dictionary::Dictionaries;
pub use error::{DecodeError, DecodeResult};
pub use graph::{
    AdjacencyProvider, CompactGraph, DeltaGraph, Direction, EntityTypes, FriendsQuery,
    GraphFormat, GroupedGraph, NodeId,
};
pub use identifiers::{EntityId, IdentifierIndex, IdentifierTable};
pub use metadata::{DateLayout, MetadataDecoder, MetadataOptions, MetadataRecord};
pub use querier::{FriendIdentifiers, Querier, QuerierStats};
