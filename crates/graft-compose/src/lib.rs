//! graft composers
//!
//! Idempotent mutations of a [`ProjectGraph`](graft_model::ProjectGraph).
//! Every `ensure_*` style operation looks first and creates only what is
//! missing, returning an [`Ensured`] that says which happened.
//!
//! # Core Operations
//!
//! - **Targets**: [`create_extension_target`] with product and configurations
//! - **Groups and files**: [`ensure_group`], [`stage_files`]
//! - **Phases**: [`ensure_phase`], [`bind_files`], [`add_embed_entry`]
//! - **Dependencies**: [`ensure_target_dependency`]
//! - **Settings**: [`apply_settings`] with set-union list merging
//! - **Capabilities**: [`plan_capability_document`], [`write_capability_document`],
//!   [`register_capability_document`]
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_compose::{ensure_group, stage_files};
//!
//! let group = ensure_group(doc.graph_mut(), "Intent")?;
//! let staged = stage_files(doc.graph_mut(), &group.id, &["IntentHandler.swift"])?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod capability;
pub mod dependency;
pub mod error;
pub mod group;
pub mod outcome;
pub mod phase;
pub mod settings;
pub mod target;

pub use capability::{
    plan_capability_document, register_capability_document, write_capability_document,
    RegisteredDocument,
};
pub use dependency::ensure_target_dependency;
pub use error::{ComposeError, ComposeResult};
pub use group::{ensure_group, last_known_file_type, stage_files, FileClass, StagedFile, StagedFiles};
pub use outcome::Ensured;
pub use phase::{add_embed_entry, bind_files, ensure_phase, EmbedDestination};
pub use settings::{apply_settings, SettingsPatch};
pub use target::{create_extension_target, ProductType, TargetSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
