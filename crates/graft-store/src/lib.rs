//! graft graph store
//!
//! The boundary between project files on disk and the in-memory graph.
//!
//! # Core Operations
//!
//! - **Load**: parse `project.pbxproj` into a [`ProjectDocument`]
//! - **Serialize**: write it back, byte-identical where nothing changed
//! - **Save**: atomic replace through a sibling temporary file
//! - **Capabilities**: read and render entitlements documents
//!
//! # Architecture
//!
//! ```text
//! project.pbxproj → OpenStepParser → ProjectDocument (graph + layout) → serialize → project.pbxproj
//!                                          ↑____________↓
//!                                        composers mutate the graph
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_store::ProjectStore;
//!
//! let mut store = ProjectStore::open("ios/App.xcodeproj")?;
//! let mut doc = store.load()?;
//! // ... mutate doc.graph_mut() ...
//! store.save(&doc)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod capability;
pub mod document;
pub mod error;
pub mod parsers;
pub mod render;
pub mod store;

pub use capability::{CapabilityDocument, APP_GROUPS_KEY};
pub use document::{load, ProjectDocument, SUPPORTED_OBJECT_VERSIONS};
pub use error::{ParseError, SerializeError};
pub use parsers::{CapabilityParser, DocumentParser, PbxprojParser};
pub use render::serialize;
pub use store::{
    stage_if_changed, write_atomic, write_if_changed, CommittedWrite, PendingWrite, ProjectStore, SaveOutcome,
    PROJECT_FILE,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the store
    pub use crate::capability::CapabilityDocument;
    pub use crate::document::ProjectDocument;
    pub use crate::error::{ParseError, SerializeError};
    pub use crate::store::{ProjectStore, SaveOutcome};
    pub use graft_model::{Object, ObjectId, ProjectGraph};
}
