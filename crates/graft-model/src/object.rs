//! Typed project objects
//!
//! Each `isa` the transformation reasons about gets its own struct; every
//! other class is carried as [`Opaque`]. Keys a struct does not model are
//! kept in its `extra` dictionary so decoding and re-encoding never loses a
//! field.

use crate::error::ModelError;
use crate::id::ObjectId;
use crate::value::{Dict, SettingValue, Value};
use std::collections::BTreeMap;

/// `PBXProject`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Workspace root group
    pub main_group: ObjectId,
    /// Group holding build products
    pub products_group: Option<ObjectId>,
    /// Project-level configuration list
    pub build_configuration_list: ObjectId,
    /// Targets in display order
    pub targets: Vec<ObjectId>,
    /// Unmodelled keys
    pub extra: Dict,
}

/// Target flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// `PBXNativeTarget`
    Native,
    /// `PBXAggregateTarget`
    Aggregate,
    /// `PBXLegacyTarget`
    Legacy,
}

impl TargetKind {
    /// Class name in the project file
    #[must_use]
    pub const fn isa(self) -> &'static str {
        match self {
            Self::Native => "PBXNativeTarget",
            Self::Aggregate => "PBXAggregateTarget",
            Self::Legacy => "PBXLegacyTarget",
        }
    }
}

/// A buildable target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Target flavour
    pub kind: TargetKind,
    /// Display name
    pub name: String,
    /// `productName`
    pub product_name: Option<String>,
    /// Product type UTI, e.g. `com.apple.product-type.app-extension`
    pub product_type: Option<String>,
    /// Product file reference
    pub product_reference: Option<ObjectId>,
    /// Target configuration list
    pub build_configuration_list: ObjectId,
    /// Build phases in execution order
    pub build_phases: Vec<ObjectId>,
    /// `PBXTargetDependency` objects
    pub dependencies: Vec<ObjectId>,
    /// Unmodelled keys
    pub extra: Dict,
}

impl Target {
    /// New native target with no phases or dependencies
    #[must_use]
    pub fn native(
        name: impl Into<String>,
        product_type: impl Into<String>,
        product_reference: ObjectId,
        build_configuration_list: ObjectId,
    ) -> Self {
        let name = name.into();
        let mut extra = Dict::new();
        extra.insert("buildRules".into(), Value::Array(Vec::new()));
        Self {
            kind: TargetKind::Native,
            product_name: Some(name.clone()),
            name,
            product_type: Some(product_type.into()),
            product_reference: Some(product_reference),
            build_configuration_list,
            build_phases: Vec::new(),
            dependencies: Vec::new(),
            extra,
        }
    }
}

/// Group flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// `PBXGroup`
    Plain,
    /// `PBXVariantGroup` (localised resources)
    Variant,
}

/// A navigator group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group flavour
    pub kind: GroupKind,
    /// Display name
    pub name: Option<String>,
    /// Path relative to `source_tree`
    pub path: Option<String>,
    /// `sourceTree`
    pub source_tree: String,
    /// Children in display order
    pub children: Vec<ObjectId>,
    /// Unmodelled keys
    pub extra: Dict,
}

impl Group {
    /// New folder-backed group relative to its parent
    #[must_use]
    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            kind: GroupKind::Plain,
            name: None,
            path: Some(path.into()),
            source_tree: GROUP_SOURCE_TREE.to_string(),
            children: Vec::new(),
            extra: Dict::new(),
        }
    }

    /// Name shown in the navigator (`name`, falling back to `path`)
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.path.as_deref())
    }
}

/// `sourceTree` for paths relative to the enclosing group
pub const GROUP_SOURCE_TREE: &str = "<group>";

/// `sourceTree` for build products
pub const BUILT_PRODUCTS_SOURCE_TREE: &str = "BUILT_PRODUCTS_DIR";

/// `PBXFileReference`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// Display name
    pub name: Option<String>,
    /// Path relative to `source_tree`
    pub path: Option<String>,
    /// `sourceTree`
    pub source_tree: String,
    /// File type guessed by Xcode
    pub last_known_file_type: Option<String>,
    /// File type fixed by the producer (build products)
    pub explicit_file_type: Option<String>,
    /// `includeInIndex`
    pub include_in_index: Option<String>,
    /// Unmodelled keys
    pub extra: Dict,
}

impl FileReference {
    /// Source file relative to its group
    #[must_use]
    pub fn source(path: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            name: None,
            path: Some(path.into()),
            source_tree: GROUP_SOURCE_TREE.to_string(),
            last_known_file_type: Some(file_type.into()),
            explicit_file_type: None,
            include_in_index: None,
            extra: Dict::new(),
        }
    }

    /// Build product living in `BUILT_PRODUCTS_DIR`
    #[must_use]
    pub fn product(path: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            name: None,
            path: Some(path.into()),
            source_tree: BUILT_PRODUCTS_SOURCE_TREE.to_string(),
            last_known_file_type: None,
            explicit_file_type: Some(file_type.into()),
            include_in_index: Some("0".to_string()),
            extra: Dict::new(),
        }
    }

    /// Name shown in the navigator (`name`, else last path component)
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or_else(|| self.path.as_deref().map(|p| p.rsplit('/').next().unwrap_or(p)))
    }
}

/// `PBXBuildFile`: one file reference inside one build phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    /// Wrapped file reference (absent for package products)
    pub file_ref: Option<ObjectId>,
    /// Phase-specific attributes
    pub settings: Option<Dict>,
    /// Unmodelled keys
    pub extra: Dict,
}

impl BuildFile {
    /// Wrap a file reference
    #[must_use]
    pub fn wrapping(file_ref: ObjectId) -> Self {
        Self {
            file_ref: Some(file_ref),
            settings: None,
            extra: Dict::new(),
        }
    }

    /// Attach `settings`
    #[must_use]
    pub fn with_settings(mut self, settings: Dict) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// Build phase flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseKind {
    /// Compile sources
    Sources,
    /// Copy bundle resources
    Resources,
    /// Link frameworks
    Frameworks,
    /// Copy files / embed products
    CopyFiles,
    /// Copy headers
    Headers,
    /// Run script
    ShellScript,
}

impl PhaseKind {
    /// Class name in the project file
    #[must_use]
    pub const fn isa(self) -> &'static str {
        match self {
            Self::Sources => "PBXSourcesBuildPhase",
            Self::Resources => "PBXResourcesBuildPhase",
            Self::Frameworks => "PBXFrameworksBuildPhase",
            Self::CopyFiles => "PBXCopyFilesBuildPhase",
            Self::Headers => "PBXHeadersBuildPhase",
            Self::ShellScript => "PBXShellScriptBuildPhase",
        }
    }

    /// Name Xcode shows when the phase has no explicit `name`
    #[must_use]
    pub const fn default_name(self) -> &'static str {
        match self {
            Self::Sources => "Sources",
            Self::Resources => "Resources",
            Self::Frameworks => "Frameworks",
            Self::CopyFiles => "CopyFiles",
            Self::Headers => "Headers",
            Self::ShellScript => "ShellScript",
        }
    }

    /// Inverse of [`PhaseKind::isa`]
    #[must_use]
    pub fn from_isa(isa: &str) -> Option<Self> {
        Some(match isa {
            "PBXSourcesBuildPhase" => Self::Sources,
            "PBXResourcesBuildPhase" => Self::Resources,
            "PBXFrameworksBuildPhase" => Self::Frameworks,
            "PBXCopyFilesBuildPhase" => Self::CopyFiles,
            "PBXHeadersBuildPhase" => Self::Headers,
            "PBXShellScriptBuildPhase" => Self::ShellScript,
            _ => return None,
        })
    }
}

/// A build phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPhase {
    /// Phase flavour
    pub kind: PhaseKind,
    /// Explicit display name
    pub name: Option<String>,
    /// `PBXBuildFile` members in order
    pub files: Vec<ObjectId>,
    /// Copy destination code (copy-files phases)
    pub dst_subfolder_spec: Option<String>,
    /// Copy destination path (copy-files phases)
    pub dst_path: Option<String>,
    /// Unmodelled keys
    pub extra: Dict,
}

impl BuildPhase {
    /// Empty phase with Xcode's default masks
    #[must_use]
    pub fn new(kind: PhaseKind) -> Self {
        let mut extra = Dict::new();
        extra.insert("buildActionMask".into(), Value::from("2147483647"));
        extra.insert("runOnlyForDeploymentPostprocessing".into(), Value::from("0"));
        Self {
            kind,
            name: None,
            files: Vec::new(),
            dst_subfolder_spec: None,
            dst_path: None,
            extra,
        }
    }

    /// Name shown in the editor
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.default_name())
    }
}

/// `XCBuildConfiguration`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// Variant name (Debug, Release, ...)
    pub name: String,
    /// Flat setting map
    pub build_settings: BTreeMap<String, SettingValue>,
    /// Unmodelled keys
    pub extra: Dict,
}

impl BuildConfiguration {
    /// Empty configuration
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            build_settings: BTreeMap::new(),
            extra: Dict::new(),
        }
    }
}

/// `XCConfigurationList`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationList {
    /// Member configurations
    pub build_configurations: Vec<ObjectId>,
    /// `defaultConfigurationIsVisible`
    pub default_configuration_is_visible: Option<String>,
    /// `defaultConfigurationName`
    pub default_configuration_name: Option<String>,
    /// Unmodelled keys
    pub extra: Dict,
}

impl ConfigurationList {
    /// New list over `configurations`
    #[must_use]
    pub fn new(configurations: Vec<ObjectId>, default_name: Option<String>) -> Self {
        Self {
            build_configurations: configurations,
            default_configuration_is_visible: Some("0".to_string()),
            default_configuration_name: default_name,
            extra: Dict::new(),
        }
    }
}

/// `PBXContainerItemProxy`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerItemProxy {
    /// Owning project
    pub container_portal: ObjectId,
    /// `proxyType` (1 = target reference)
    pub proxy_type: String,
    /// Proxied object id, stored without annotation
    pub remote_global_id: String,
    /// Proxied object name
    pub remote_info: Option<String>,
    /// Unmodelled keys
    pub extra: Dict,
}

/// `PBXTargetDependency`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDependency {
    /// Target depended upon
    pub target: Option<ObjectId>,
    /// Proxy describing the dependency
    pub target_proxy: Option<ObjectId>,
    /// Unmodelled keys
    pub extra: Dict,
}

/// Any class not modelled above
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opaque {
    /// Class name
    pub isa: String,
    /// All fields except `isa`
    pub fields: Dict,
}

/// A project-graph object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    /// `PBXProject`
    Project(Project),
    /// Native, aggregate or legacy target
    Target(Target),
    /// `PBXGroup` / `PBXVariantGroup`
    Group(Group),
    /// `PBXFileReference`
    FileReference(FileReference),
    /// `PBXBuildFile`
    BuildFile(BuildFile),
    /// Any `PBX*BuildPhase`
    BuildPhase(BuildPhase),
    /// `XCBuildConfiguration`
    BuildConfiguration(BuildConfiguration),
    /// `XCConfigurationList`
    ConfigurationList(ConfigurationList),
    /// `PBXContainerItemProxy`
    ContainerItemProxy(ContainerItemProxy),
    /// `PBXTargetDependency`
    TargetDependency(TargetDependency),
    /// Everything else, preserved untouched
    Opaque(Opaque),
}

impl Object {
    /// Class name in the project file
    #[must_use]
    pub fn isa(&self) -> &str {
        match self {
            Self::Project(_) => "PBXProject",
            Self::Target(t) => t.kind.isa(),
            Self::Group(g) => match g.kind {
                GroupKind::Plain => "PBXGroup",
                GroupKind::Variant => "PBXVariantGroup",
            },
            Self::FileReference(_) => "PBXFileReference",
            Self::BuildFile(_) => "PBXBuildFile",
            Self::BuildPhase(p) => p.kind.isa(),
            Self::BuildConfiguration(_) => "XCBuildConfiguration",
            Self::ConfigurationList(_) => "XCConfigurationList",
            Self::ContainerItemProxy(_) => "PBXContainerItemProxy",
            Self::TargetDependency(_) => "PBXTargetDependency",
            Self::Opaque(o) => o.isa.as_str(),
        }
    }

    /// Decode a dictionary (without its `isa` key) into a typed object
    ///
    /// # Errors
    /// Returns error if a modelled class lacks a required field or carries a
    /// field of the wrong shape.
    pub fn decode(isa: &str, dict: Dict) -> Result<Self, ModelError> {
        let mut f = Fields { isa, dict };
        let object = match isa {
            "PBXProject" => Self::Project(Project {
                main_group: f.required_id("mainGroup")?,
                products_group: f.id("productRefGroup")?,
                build_configuration_list: f.required_id("buildConfigurationList")?,
                targets: f.ids("targets")?,
                extra: f.rest(),
            }),
            "PBXNativeTarget" | "PBXAggregateTarget" | "PBXLegacyTarget" => {
                let kind = match isa {
                    "PBXNativeTarget" => TargetKind::Native,
                    "PBXAggregateTarget" => TargetKind::Aggregate,
                    _ => TargetKind::Legacy,
                };
                Self::Target(Target {
                    kind,
                    name: f.required_string("name")?,
                    product_name: f.string("productName")?,
                    product_type: f.string("productType")?,
                    product_reference: f.id("productReference")?,
                    build_configuration_list: f.required_id("buildConfigurationList")?,
                    build_phases: f.ids("buildPhases")?,
                    dependencies: f.ids("dependencies")?,
                    extra: f.rest(),
                })
            }
            "PBXGroup" | "PBXVariantGroup" => Self::Group(Group {
                kind: if isa == "PBXGroup" {
                    GroupKind::Plain
                } else {
                    GroupKind::Variant
                },
                name: f.string("name")?,
                path: f.string("path")?,
                source_tree: f.string("sourceTree")?.unwrap_or_else(|| GROUP_SOURCE_TREE.into()),
                children: f.ids("children")?,
                extra: f.rest(),
            }),
            "PBXFileReference" => Self::FileReference(FileReference {
                name: f.string("name")?,
                path: f.string("path")?,
                source_tree: f.string("sourceTree")?.unwrap_or_else(|| GROUP_SOURCE_TREE.into()),
                last_known_file_type: f.string("lastKnownFileType")?,
                explicit_file_type: f.string("explicitFileType")?,
                include_in_index: f.string("includeInIndex")?,
                extra: f.rest(),
            }),
            "PBXBuildFile" => Self::BuildFile(BuildFile {
                file_ref: f.id("fileRef")?,
                settings: f.dict("settings")?,
                extra: f.rest(),
            }),
            "XCBuildConfiguration" => Self::BuildConfiguration(BuildConfiguration {
                name: f.required_string("name")?,
                build_settings: f.settings("buildSettings")?,
                extra: f.rest(),
            }),
            "XCConfigurationList" => Self::ConfigurationList(ConfigurationList {
                build_configurations: f.ids("buildConfigurations")?,
                default_configuration_is_visible: f.string("defaultConfigurationIsVisible")?,
                default_configuration_name: f.string("defaultConfigurationName")?,
                extra: f.rest(),
            }),
            "PBXContainerItemProxy" => Self::ContainerItemProxy(ContainerItemProxy {
                container_portal: f.required_id("containerPortal")?,
                proxy_type: f.required_string("proxyType")?,
                remote_global_id: f.required_string("remoteGlobalIDString")?,
                remote_info: f.string("remoteInfo")?,
                extra: f.rest(),
            }),
            "PBXTargetDependency" => Self::TargetDependency(TargetDependency {
                target: f.id("target")?,
                target_proxy: f.id("targetProxy")?,
                extra: f.rest(),
            }),
            other => match PhaseKind::from_isa(other) {
                Some(kind) => Self::BuildPhase(BuildPhase {
                    kind,
                    name: f.string("name")?,
                    files: f.ids("files")?,
                    dst_subfolder_spec: f.string("dstSubfolderSpec")?,
                    dst_path: f.string("dstPath")?,
                    extra: f.rest(),
                }),
                None => Self::Opaque(Opaque {
                    isa: other.to_string(),
                    fields: f.rest(),
                }),
            },
        };
        Ok(object)
    }

    /// Encode back into a dictionary, `isa` included
    #[must_use]
    pub fn encode(&self) -> Dict {
        let mut d = match self {
            Self::Project(p) => {
                let mut d = p.extra.clone();
                put_id(&mut d, "mainGroup", &p.main_group);
                put_opt_id(&mut d, "productRefGroup", p.products_group.as_ref());
                put_id(&mut d, "buildConfigurationList", &p.build_configuration_list);
                put_ids(&mut d, "targets", &p.targets);
                d
            }
            Self::Target(t) => {
                let mut d = t.extra.clone();
                put_str(&mut d, "name", &t.name);
                put_opt(&mut d, "productName", t.product_name.as_ref());
                put_opt(&mut d, "productType", t.product_type.as_ref());
                put_opt_id(&mut d, "productReference", t.product_reference.as_ref());
                put_id(&mut d, "buildConfigurationList", &t.build_configuration_list);
                put_ids(&mut d, "buildPhases", &t.build_phases);
                put_ids(&mut d, "dependencies", &t.dependencies);
                d
            }
            Self::Group(g) => {
                let mut d = g.extra.clone();
                put_opt(&mut d, "name", g.name.as_ref());
                put_opt(&mut d, "path", g.path.as_ref());
                put_str(&mut d, "sourceTree", &g.source_tree);
                put_ids(&mut d, "children", &g.children);
                d
            }
            Self::FileReference(r) => {
                let mut d = r.extra.clone();
                put_opt(&mut d, "name", r.name.as_ref());
                put_opt(&mut d, "path", r.path.as_ref());
                put_str(&mut d, "sourceTree", &r.source_tree);
                put_opt(&mut d, "lastKnownFileType", r.last_known_file_type.as_ref());
                put_opt(&mut d, "explicitFileType", r.explicit_file_type.as_ref());
                put_opt(&mut d, "includeInIndex", r.include_in_index.as_ref());
                d
            }
            Self::BuildFile(b) => {
                let mut d = b.extra.clone();
                put_opt_id(&mut d, "fileRef", b.file_ref.as_ref());
                if let Some(settings) = &b.settings {
                    d.insert("settings".into(), Value::Dict(settings.clone()));
                }
                d
            }
            Self::BuildPhase(p) => {
                let mut d = p.extra.clone();
                put_opt(&mut d, "name", p.name.as_ref());
                put_ids(&mut d, "files", &p.files);
                put_opt(&mut d, "dstSubfolderSpec", p.dst_subfolder_spec.as_ref());
                put_opt(&mut d, "dstPath", p.dst_path.as_ref());
                d
            }
            Self::BuildConfiguration(c) => {
                let mut d = c.extra.clone();
                put_str(&mut d, "name", &c.name);
                let settings = c
                    .build_settings
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect();
                d.insert("buildSettings".into(), Value::Dict(settings));
                d
            }
            Self::ConfigurationList(l) => {
                let mut d = l.extra.clone();
                put_ids(&mut d, "buildConfigurations", &l.build_configurations);
                put_opt(
                    &mut d,
                    "defaultConfigurationIsVisible",
                    l.default_configuration_is_visible.as_ref(),
                );
                put_opt(&mut d, "defaultConfigurationName", l.default_configuration_name.as_ref());
                d
            }
            Self::ContainerItemProxy(p) => {
                let mut d = p.extra.clone();
                put_id(&mut d, "containerPortal", &p.container_portal);
                put_str(&mut d, "proxyType", &p.proxy_type);
                put_str(&mut d, "remoteGlobalIDString", &p.remote_global_id);
                put_opt(&mut d, "remoteInfo", p.remote_info.as_ref());
                d
            }
            Self::TargetDependency(t) => {
                let mut d = t.extra.clone();
                put_opt_id(&mut d, "target", t.target.as_ref());
                put_opt_id(&mut d, "targetProxy", t.target_proxy.as_ref());
                d
            }
            Self::Opaque(o) => o.fields.clone(),
        };
        d.insert("isa".into(), Value::from(self.isa()));
        d
    }

    /// Identifiers this object points at through modelled fields
    #[must_use]
    pub fn references(&self) -> Vec<&ObjectId> {
        match self {
            Self::Project(p) => std::iter::once(&p.main_group)
                .chain(p.products_group.as_ref())
                .chain(std::iter::once(&p.build_configuration_list))
                .chain(&p.targets)
                .collect(),
            Self::Target(t) => t
                .product_reference
                .iter()
                .chain(std::iter::once(&t.build_configuration_list))
                .chain(&t.build_phases)
                .chain(&t.dependencies)
                .collect(),
            Self::Group(g) => g.children.iter().collect(),
            Self::BuildFile(b) => b.file_ref.iter().collect(),
            Self::BuildPhase(p) => p.files.iter().collect(),
            Self::ConfigurationList(l) => l.build_configurations.iter().collect(),
            Self::ContainerItemProxy(p) => vec![&p.container_portal],
            Self::TargetDependency(t) => t.target.iter().chain(&t.target_proxy).collect(),
            Self::FileReference(_) | Self::BuildConfiguration(_) | Self::Opaque(_) => Vec::new(),
        }
    }

    /// Encoded keys whose values are identifiers, matching [`Object::references`]
    #[must_use]
    pub fn reference_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Project(_) => &["mainGroup", "productRefGroup", "buildConfigurationList", "targets"],
            Self::Target(_) => &["productReference", "buildConfigurationList", "buildPhases", "dependencies"],
            Self::Group(_) => &["children"],
            Self::BuildFile(_) => &["fileRef"],
            Self::BuildPhase(_) => &["files"],
            Self::ConfigurationList(_) => &["buildConfigurations"],
            Self::ContainerItemProxy(_) => &["containerPortal"],
            Self::TargetDependency(_) => &["target", "targetProxy"],
            Self::FileReference(_) | Self::BuildConfiguration(_) | Self::Opaque(_) => &[],
        }
    }
}

macro_rules! object_accessors {
    ($($variant:ident => $ty:ident, $as_ref:ident, $as_mut:ident;)*) => {
        impl Object {
            $(
                #[doc = concat!("Borrow as [`", stringify!($ty), "`]")]
                #[inline]
                #[must_use]
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match self {
                        Self::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                #[doc = concat!("Mutably borrow as [`", stringify!($ty), "`]")]
                #[inline]
                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Self::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<$ty> for Object {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

object_accessors! {
    Project => Project, as_project, as_project_mut;
    Target => Target, as_target, as_target_mut;
    Group => Group, as_group, as_group_mut;
    FileReference => FileReference, as_file_reference, as_file_reference_mut;
    BuildFile => BuildFile, as_build_file, as_build_file_mut;
    BuildPhase => BuildPhase, as_build_phase, as_build_phase_mut;
    BuildConfiguration => BuildConfiguration, as_configuration, as_configuration_mut;
    ConfigurationList => ConfigurationList, as_configuration_list, as_configuration_list_mut;
    ContainerItemProxy => ContainerItemProxy, as_container_item_proxy, as_container_item_proxy_mut;
    TargetDependency => TargetDependency, as_target_dependency, as_target_dependency_mut;
}

/// Field cursor used while decoding; every `take` removes the key so the
/// remainder becomes `extra`.
struct Fields<'a> {
    isa: &'a str,
    dict: Dict,
}

impl Fields<'_> {
    fn unexpected(&self, key: &str, expected: &'static str, found: &Value) -> ModelError {
        ModelError::UnexpectedValue {
            isa: self.isa.to_string(),
            key: key.to_string(),
            expected,
            found: found.kind_name(),
        }
    }

    fn string(&mut self, key: &str) -> Result<Option<String>, ModelError> {
        match self.dict.remove(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.unexpected(key, "string", &other)),
        }
    }

    fn required_string(&mut self, key: &str) -> Result<String, ModelError> {
        self.string(key)?
            .ok_or_else(|| ModelError::missing(self.isa, key))
    }

    fn id(&mut self, key: &str) -> Result<Option<ObjectId>, ModelError> {
        self.string(key)?.map(ObjectId::new).transpose()
    }

    fn required_id(&mut self, key: &str) -> Result<ObjectId, ModelError> {
        self.id(key)?.ok_or_else(|| ModelError::missing(self.isa, key))
    }

    fn ids(&mut self, key: &str) -> Result<Vec<ObjectId>, ModelError> {
        match self.dict.remove(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => ObjectId::new(s),
                    other => Err(self.unexpected(key, "identifier", &other)),
                })
                .collect(),
            Some(other) => Err(self.unexpected(key, "array", &other)),
        }
    }

    fn dict(&mut self, key: &str) -> Result<Option<Dict>, ModelError> {
        match self.dict.remove(key) {
            None => Ok(None),
            Some(Value::Dict(d)) => Ok(Some(d)),
            Some(other) => Err(self.unexpected(key, "dictionary", &other)),
        }
    }

    fn settings(&mut self, key: &str) -> Result<BTreeMap<String, SettingValue>, ModelError> {
        let Some(dict) = self.dict(key)? else {
            return Ok(BTreeMap::new());
        };
        dict.into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => SettingValue::Text(s),
                    Value::Array(items) => SettingValue::List(
                        items
                            .into_iter()
                            .map(|item| match item {
                                Value::String(s) => Ok(s),
                                other => Err(self.unexpected(&k, "string", &other)),
                            })
                            .collect::<Result<_, _>>()?,
                    ),
                    other => return Err(self.unexpected(&k, "string or array", &other)),
                };
                Ok((k, value))
            })
            .collect()
    }

    fn rest(self) -> Dict {
        self.dict
    }
}

fn put_str(d: &mut Dict, key: &str, value: &str) {
    d.insert(key.into(), Value::from(value));
}

fn put_opt(d: &mut Dict, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        put_str(d, key, value);
    }
}

fn put_id(d: &mut Dict, key: &str, id: &ObjectId) {
    put_str(d, key, id.as_str());
}

fn put_opt_id(d: &mut Dict, key: &str, id: Option<&ObjectId>) {
    if let Some(id) = id {
        put_id(d, key, id);
    }
}

fn put_ids(d: &mut Dict, key: &str, ids: &[ObjectId]) {
    let items = ids.iter().map(|id| Value::from(id.as_str())).collect();
    d.insert(key.into(), Value::Array(items));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s).unwrap()
    }

    fn group_dict() -> Dict {
        let mut d = Dict::new();
        d.insert("children".into(), Value::Array(vec![Value::from("A1"), Value::from("A2")]));
        d.insert("path".into(), Value::from("App"));
        d.insert("sourceTree".into(), Value::from("<group>"));
        d.insert("usesTabs".into(), Value::from("1"));
        d
    }

    #[test]
    fn group_decodes_typed_fields_and_keeps_extras() {
        let object = Object::decode("PBXGroup", group_dict()).unwrap();
        let group = object.as_group().unwrap();
        assert_eq!(group.children, vec![id("A1"), id("A2")]);
        assert_eq!(group.display_name(), Some("App"));
        assert_eq!(group.extra.get("usesTabs"), Some(&Value::from("1")));
    }

    #[test]
    fn encode_is_inverse_of_decode() {
        let mut original = group_dict();
        let object = Object::decode("PBXGroup", original.clone()).unwrap();
        original.insert("isa".into(), Value::from("PBXGroup"));
        assert_eq!(object.encode(), original);
    }

    #[test]
    fn unknown_isa_is_opaque() {
        let mut d = Dict::new();
        d.insert("productName".into(), Value::from("Alamofire"));
        let object = Object::decode("XCSwiftPackageProductDependency", d.clone()).unwrap();
        assert_eq!(object.isa(), "XCSwiftPackageProductDependency");
        assert!(object.references().is_empty());
        d.insert("isa".into(), Value::from("XCSwiftPackageProductDependency"));
        assert_eq!(object.encode(), d);
    }

    #[test]
    fn reference_keys_cover_every_reference() {
        let mut d = Dict::new();
        d.insert("name".into(), Value::from("Ext"));
        d.insert("buildConfigurationList".into(), Value::from("L1"));
        d.insert("buildPhases".into(), Value::Array(vec![Value::from("P1"), Value::from("P2")]));
        d.insert("dependencies".into(), Value::Array(vec![Value::from("D1")]));
        d.insert("productReference".into(), Value::from("R1"));
        d.insert("productName".into(), Value::from("L1"));
        let object = Object::decode("PBXNativeTarget", d).unwrap();

        let encoded = object.encode();
        let mut from_keys: Vec<&str> = object
            .reference_keys()
            .iter()
            .filter_map(|key| encoded.get(*key))
            .flat_map(|value| match value {
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                other => other.as_str().into_iter().collect::<Vec<_>>(),
            })
            .collect();
        let mut referenced: Vec<&str> = object.references().into_iter().map(ObjectId::as_str).collect();
        from_keys.sort_unstable();
        referenced.sort_unstable();
        assert_eq!(from_keys, referenced);
        assert!(!object.reference_keys().contains(&"productName"));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = Object::decode("XCBuildConfiguration", Dict::new()).unwrap_err();
        assert_eq!(err, ModelError::missing("XCBuildConfiguration", "name"));
    }

    #[test]
    fn wrong_shape_is_reported() {
        let mut d = Dict::new();
        d.insert("children".into(), Value::from("oops"));
        let err = Object::decode("PBXGroup", d).unwrap_err();
        assert!(matches!(err, ModelError::UnexpectedValue { expected: "array", .. }));
    }

    #[test]
    fn build_settings_split_text_and_lists() {
        let mut settings = Dict::new();
        settings.insert("PRODUCT_NAME".into(), Value::from("$(TARGET_NAME)"));
        settings.insert(
            "GCC_PREPROCESSOR_DEFINITIONS".into(),
            Value::Array(vec![Value::from("DEBUG=1"), Value::from("$(inherited)")]),
        );
        let mut d = Dict::new();
        d.insert("name".into(), Value::from("Debug"));
        d.insert("buildSettings".into(), Value::Dict(settings));

        let object = Object::decode("XCBuildConfiguration", d).unwrap();
        let config = object.as_configuration().unwrap();
        assert_eq!(
            config.build_settings["PRODUCT_NAME"],
            SettingValue::text("$(TARGET_NAME)")
        );
        assert_eq!(
            config.build_settings["GCC_PREPROCESSOR_DEFINITIONS"],
            SettingValue::list(["DEBUG=1", "$(inherited)"])
        );
    }

    #[test]
    fn phase_kind_round_trips_isa() {
        for kind in [
            PhaseKind::Sources,
            PhaseKind::Resources,
            PhaseKind::Frameworks,
            PhaseKind::CopyFiles,
            PhaseKind::Headers,
            PhaseKind::ShellScript,
        ] {
            assert_eq!(PhaseKind::from_isa(kind.isa()), Some(kind));
        }
    }

    #[test]
    fn target_references_cover_phases_and_list() {
        let target = Target::native("Ext", "com.apple.product-type.app-extension", id("P"), id("L"));
        let object = Object::from(target);
        let refs: Vec<_> = object.references().into_iter().cloned().collect();
        assert_eq!(refs, vec![id("P"), id("L")]);
    }

    #[test]
    fn file_reference_display_name_uses_last_component() {
        let file = FileReference::source("Ext/Handler.swift", "sourcecode.swift");
        assert_eq!(file.display_name(), Some("Handler.swift"));
    }
}
