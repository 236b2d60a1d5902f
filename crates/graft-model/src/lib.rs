//! graft object model
//!
//! Typed view of an Xcode project graph.
//!
//! # Core Concepts
//!
//! - [`ObjectId`]: opaque, graph-unique identifier
//! - [`IdAllocator`]: deterministic allocator of fresh identifiers
//! - [`Object`]: closed variant per object kind (target, group, phase, ...)
//! - [`ProjectGraph`]: the object table rooted at a `PBXProject`
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_model::{Group, ProjectGraph};
//!
//! let group_id = graph.insert(Group::folder("Extension"));
//! graph.group_mut(&graph.project().main_group.clone())?.children.push(group_id);
//! ```

#![warn(unreachable_pub)]

mod error;
mod graph;
mod id;
mod object;
mod value;

pub use error::ModelError;
pub use graph::{DanglingReference, ProjectGraph};
pub use id::{IdAllocator, ObjectId, ID_BYTES};
pub use object::{
    BuildConfiguration, BuildFile, BuildPhase, ConfigurationList, ContainerItemProxy,
    FileReference, Group, GroupKind, Object, Opaque, PhaseKind, Project, Target, TargetDependency,
    TargetKind, BUILT_PRODUCTS_SOURCE_TREE, GROUP_SOURCE_TREE,
};
pub use value::{Dict, SettingValue, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
