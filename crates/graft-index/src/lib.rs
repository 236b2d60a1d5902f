//! graft lookup index
//!
//! Read-only queries over a [`graft_model::ProjectGraph`].
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_index::LookupIndex;
//!
//! let index = LookupIndex::new(doc.graph());
//! let host = index.resolve_target("SimpleHealth")?;
//! let group = index.group_by_name("SimpleHealthSiriIntent");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod index;

pub use index::{IndexError, LookupIndex};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
