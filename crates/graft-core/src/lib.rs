//! graft core
//!
//! Grafts an app-extension target into an Xcode project: creates the
//! target, wires its fixed files into groups and phases, patches its build
//! settings, writes its capability document and embeds its product into an
//! explicitly named host target. Re-running the pass is safe; objects that
//! already exist are reused.
//!
//! # Example
//!
//! ```rust,ignore
//! use graft_core::{ExtensionInstaller, GraftConfig};
//!
//! let config = GraftConfig::from_path("graft.toml")?.with_host_target("SimpleHealth");
//! let report = ExtensionInstaller::new(config)?.run()?;
//! println!("created {} objects", report.created());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod installer;
pub mod report;
pub mod state;
pub mod verify;

pub use config::{
    CapabilityConfig, ConfigError, ExtensionConfig, GraftConfig, ReconcileMode, DEFAULT_APP_GROUP,
    DEFAULT_EXTENSION_NAME,
};
pub use error::{GraftError, GraftResult};
pub use installer::ExtensionInstaller;
pub use report::{CapabilityReport, InstallReport};
pub use state::{allowed_transitions, validate_transition, InstallState, StateTrace};
pub use verify::{verify, DuplicateBuildFile, DuplicateChild, VerifyReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
