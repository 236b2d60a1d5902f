//! Installer configuration
//!
//! Loaded from TOML. Every field has a default so a file only needs the
//! host target:
//!
//! ```toml
//! host_target = "SimpleHealth"
//!
//! [extension]
//! name = "SimpleHealthSiriIntent"
//! bundle_identifier = "com.gormantec.simplehealth.SiriIntent"
//!
//! [capabilities]
//! groups = ["group.com.gormantec.simplehealth"]
//!
//! [settings]
//! SWIFT_VERSION = "5.0"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use graft_compose::{EmbedDestination, ProductType, SettingsPatch};
use graft_store::APP_GROUPS_KEY;
use serde::{Deserialize, Serialize};

/// Extension name used when none is configured
pub const DEFAULT_EXTENSION_NAME: &str = "SimpleHealthSiriIntent";

/// Capability group used when none is configured
pub const DEFAULT_APP_GROUP: &str = "group.com.gormantec.simplehealth";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// No host target given
    #[error("host target must be named explicitly")]
    MissingHostTarget,

    /// A field holds an unusable value
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// How much of the pass runs when the extension target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileMode {
    /// Refresh the capability document and settings only
    #[default]
    SettingsOnly,
    /// Re-run every idempotent step, repairing partial applications
    Full,
}

/// The extension being grafted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Target, group and product name
    #[serde(default = "default_name")]
    pub name: String,
    /// `PRODUCT_BUNDLE_IDENTIFIER`
    #[serde(default)]
    pub bundle_identifier: Option<String>,
    /// Product kind
    #[serde(default = "default_product_type")]
    pub product_type: ProductType,
    /// Embed location inside the host
    #[serde(default = "default_destination")]
    pub destination: EmbedDestination,
    /// Fixed file set, relative to the extension directory; empty means
    /// the standard set
    #[serde(default)]
    pub files: Vec<String>,
}

fn default_name() -> String {
    DEFAULT_EXTENSION_NAME.to_string()
}

fn default_product_type() -> ProductType {
    ProductType::AppExtension
}

fn default_destination() -> EmbedDestination {
    EmbedDestination::ExtensionKit
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            bundle_identifier: None,
            product_type: default_product_type(),
            destination: default_destination(),
            files: Vec::new(),
        }
    }
}

impl ExtensionConfig {
    /// Configured files, or the handler, manifest and entry point
    #[must_use]
    pub fn resolved_files(&self) -> Vec<String> {
        if self.files.is_empty() {
            vec![
                "IntentHandler.swift".to_string(),
                "Info.plist".to_string(),
                format!("{}Extension.swift", self.name),
            ]
        } else {
            self.files.clone()
        }
    }

    /// File name of the capability document
    #[must_use]
    pub fn capability_file_name(&self) -> String {
        format!("{}.entitlements", self.name)
    }

    /// Capability document path relative to the project root
    #[must_use]
    pub fn capability_path(&self) -> String {
        format!("{}/{}", self.name, self.capability_file_name())
    }

    /// Manifest path relative to the project root, if the file set has one
    #[must_use]
    pub fn info_plist_path(&self) -> Option<String> {
        self.resolved_files()
            .into_iter()
            .find(|f| f.ends_with("Info.plist"))
            .map(|f| format!("{}/{f}", self.name))
    }
}

/// Capability document contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Property-list key holding the group list
    #[serde(default = "default_capability_key")]
    pub key: String,
    /// Groups to merge in
    #[serde(default = "default_groups")]
    pub groups: Vec<String>,
}

fn default_capability_key() -> String {
    APP_GROUPS_KEY.to_string()
}

fn default_groups() -> Vec<String> {
    vec![DEFAULT_APP_GROUP.to_string()]
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            key: default_capability_key(),
            groups: default_groups(),
        }
    }
}

/// Installer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraftConfig {
    /// `project.pbxproj`, an `.xcodeproj`, or a directory holding one
    #[serde(default = "default_project")]
    pub project: PathBuf,
    /// Target that embeds the extension, by name or identifier
    #[serde(default)]
    pub host_target: Option<String>,
    /// Extension description
    #[serde(default)]
    pub extension: ExtensionConfig,
    /// Capability document
    #[serde(default)]
    pub capabilities: CapabilityConfig,
    /// Extra build settings for the extension target
    #[serde(default)]
    pub settings: SettingsPatch,
    /// Behaviour when the target exists
    #[serde(default)]
    pub mode: ReconcileMode,
    /// Compute the report without writing anything
    #[serde(default)]
    pub dry_run: bool,
    /// Directory holding the extension sources; defaults to the directory
    /// containing the `.xcodeproj`
    #[serde(default)]
    pub source_root: Option<PathBuf>,
}

fn default_project() -> PathBuf {
    PathBuf::from("ios")
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            host_target: None,
            extension: ExtensionConfig::default(),
            capabilities: CapabilityConfig::default(),
            settings: SettingsPatch::default(),
            mode: ReconcileMode::default(),
            dry_run: false,
            source_root: None,
        }
    }
}

impl GraftConfig {
    /// Parse TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` or `ConfigError::Parse`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Override the project path
    #[must_use]
    pub fn with_project(mut self, project: impl Into<PathBuf>) -> Self {
        self.project = project.into();
        self
    }

    /// Override the host target
    #[must_use]
    pub fn with_host_target(mut self, host: impl Into<String>) -> Self {
        self.host_target = Some(host.into());
        self
    }

    /// Override the extension name
    #[must_use]
    pub fn with_extension_name(mut self, name: impl Into<String>) -> Self {
        self.extension.name = name.into();
        self
    }

    /// Override the bundle identifier
    #[must_use]
    pub fn with_bundle_identifier(mut self, id: impl Into<String>) -> Self {
        self.extension.bundle_identifier = Some(id.into());
        self
    }

    /// Override the reconcile mode
    #[must_use]
    pub fn with_mode(mut self, mode: ReconcileMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override dry-run
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Override the source root
    #[must_use]
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = Some(root.into());
        self
    }

    /// Host target, which must be named
    ///
    /// # Errors
    /// Returns `ConfigError::MissingHostTarget` when unset or blank.
    pub fn host(&self) -> Result<&str, ConfigError> {
        self.host_target
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHostTarget)
    }

    /// Check fields the pass depends on
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.host()?;
        let name = &self.extension.name;
        if name.is_empty() || name.contains('/') {
            return Err(ConfigError::Invalid {
                field: "extension.name",
                reason: format!("'{name}' is not a usable target name"),
            });
        }
        if self.extension.files.iter().any(|f| f.is_empty() || f.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "extension.files",
                reason: "entries must be non-empty relative paths".into(),
            });
        }
        if self.capabilities.key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "capabilities.key",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
