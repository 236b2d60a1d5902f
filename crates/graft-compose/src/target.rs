//! Target builder
//!
//! Creates a native target together with its product reference and
//! configuration list. Creation is not idempotent on its own: callers check
//! for an existing target first and take the settings-only path instead.

use graft_index::LookupIndex;
use graft_model::{
    BuildConfiguration, ConfigurationList, FileReference, Group, ObjectId, ProjectGraph,
    SettingValue, Target,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ComposeError, ComposeResult};

/// Variants used when the project-level list is empty
const FALLBACK_CONFIGURATIONS: [&str; 2] = ["Debug", "Release"];

/// Kind of product a target builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    /// Classic app extension (`.appex`, embedded under `PlugIns`)
    AppExtension,
    /// ExtensionKit extension (`.appex`, embedded under `Extensions`)
    ExtensionKitExtension,
    /// Embedded framework
    Framework,
    /// Loadable bundle
    Bundle,
}

impl ProductType {
    /// Product type identifier
    #[must_use]
    pub const fn uti(self) -> &'static str {
        match self {
            Self::AppExtension => "com.apple.product-type.app-extension",
            Self::ExtensionKitExtension => "com.apple.product-type.extensionkit-extension",
            Self::Framework => "com.apple.product-type.framework",
            Self::Bundle => "com.apple.product-type.bundle",
        }
    }

    /// `explicitFileType` of the product reference
    #[must_use]
    pub const fn file_type(self) -> &'static str {
        match self {
            Self::AppExtension | Self::ExtensionKitExtension => "wrapper.app-extension",
            Self::Framework => "wrapper.framework",
            Self::Bundle => "wrapper.cfbundle",
        }
    }

    /// Product file extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::AppExtension | Self::ExtensionKitExtension => "appex",
            Self::Framework => "framework",
            Self::Bundle => "bundle",
        }
    }

    /// True for products that ship inside a host app
    #[must_use]
    pub const fn is_extension(self) -> bool {
        matches!(self, Self::AppExtension | Self::ExtensionKitExtension)
    }
}

/// Parameters of a new target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// Target and product name
    pub name: String,
    /// Product kind
    pub product_type: ProductType,
    /// `PRODUCT_BUNDLE_IDENTIFIER`
    pub bundle_identifier: Option<String>,
    /// `INFOPLIST_FILE`, relative to the project root
    pub info_plist: Option<String>,
}

impl TargetSpec {
    /// Spec with only the required fields
    #[must_use]
    pub fn new(name: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            name: name.into(),
            product_type,
            bundle_identifier: None,
            info_plist: None,
        }
    }

    /// Set the bundle identifier
    #[must_use]
    pub fn with_bundle_identifier(mut self, id: impl Into<String>) -> Self {
        self.bundle_identifier = Some(id.into());
        self
    }

    /// Set the info plist path
    #[must_use]
    pub fn with_info_plist(mut self, path: impl Into<String>) -> Self {
        self.info_plist = Some(path.into());
        self
    }

    /// Product file name, e.g. `Intent.appex`
    #[must_use]
    pub fn product_file_name(&self) -> String {
        format!("{}.{}", self.name, self.product_type.extension())
    }

    fn initial_settings(&self) -> Vec<(&'static str, SettingValue)> {
        let mut settings = vec![("PRODUCT_NAME", SettingValue::text(&self.name))];
        if let Some(id) = &self.bundle_identifier {
            settings.push(("PRODUCT_BUNDLE_IDENTIFIER", SettingValue::text(id)));
        }
        if let Some(plist) = &self.info_plist {
            settings.push(("INFOPLIST_FILE", SettingValue::text(plist)));
        }
        if self.product_type.is_extension() {
            settings.push(("SKIP_INSTALL", SettingValue::text("YES")));
            settings.push((
                "LD_RUNPATH_SEARCH_PATHS",
                SettingValue::list([
                    "$(inherited)",
                    "@executable_path/Frameworks",
                    "@executable_path/../../Frameworks",
                ]),
            ));
        }
        settings
    }
}

/// Create the target described by `spec`
///
/// Adds the product reference to the products group, one configuration per
/// project-level variant, the configuration list, and the target itself
/// (appended to the project's target list).
///
/// # Errors
/// Returns `ComposeError::TargetExists` if a target with the name exists.
pub fn create_extension_target(graph: &mut ProjectGraph, spec: &TargetSpec) -> ComposeResult<ObjectId> {
    let variants = {
        let index = LookupIndex::new(graph);
        if index.target_by_name(&spec.name).is_some() {
            return Err(ComposeError::TargetExists(spec.name.clone()));
        }
        let names = index.project_configuration_names();
        if names.is_empty() {
            FALLBACK_CONFIGURATIONS.iter().map(|s| (*s).to_string()).collect()
        } else {
            names
        }
    };

    let product = graph.insert(FileReference::product(
        spec.product_file_name(),
        spec.product_type.file_type(),
    ));
    let products_group = ensure_products_group(graph)?;
    graph.group_mut(&products_group)?.children.push(product.clone());

    let settings = spec.initial_settings();
    let configurations: Vec<ObjectId> = variants
        .iter()
        .map(|variant| {
            let mut config = BuildConfiguration::new(variant.as_str());
            config.build_settings.extend(
                settings
                    .iter()
                    .map(|(key, value)| ((*key).to_string(), value.clone())),
            );
            graph.insert(config)
        })
        .collect();
    let default_name = variants
        .iter()
        .find(|v| v.as_str() == "Release")
        .or_else(|| variants.last())
        .cloned();
    let list = graph.insert(ConfigurationList::new(configurations, default_name));

    let target = graph.insert(Target::native(
        spec.name.as_str(),
        spec.product_type.uti(),
        product,
        list,
    ));
    graph.project_mut().targets.push(target.clone());

    info!(
        target = %spec.name,
        id = %target,
        product_type = spec.product_type.uti(),
        configurations = variants.len(),
        "created target"
    );
    Ok(target)
}

fn ensure_products_group(graph: &mut ProjectGraph) -> ComposeResult<ObjectId> {
    if let Some(id) = graph.project().products_group.clone() {
        return Ok(id);
    }
    let id = graph.insert(Group {
        name: Some("Products".to_string()),
        path: None,
        ..Group::folder("")
    });
    let main = graph.project().main_group.clone();
    graph.group_mut(&main)?.children.push(id.clone());
    graph.project_mut().products_group = Some(id.clone());
    debug!(id = %id, "created products group");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_test_utils::*;
    use pretty_assertions::assert_eq;

    fn spec() -> TargetSpec {
        TargetSpec::new(EXTENSION_NAME, ProductType::AppExtension)
            .with_bundle_identifier("com.gormantec.simplehealth.SiriIntent")
            .with_info_plist("SimpleHealthSiriIntent/Info.plist")
    }

    #[test]
    fn creates_target_product_and_configurations() {
        let mut doc = host_app_document();
        let graph = doc.graph_mut();
        let before = graph.len();

        let id = create_extension_target(graph, &spec()).unwrap();
        let target = graph.target(&id).unwrap().clone();

        assert_eq!(target.name, EXTENSION_NAME);
        assert_eq!(target.product_type.as_deref(), Some("com.apple.product-type.app-extension"));
        assert!(graph.project().targets.contains(&id));

        let product = graph.file_reference(target.product_reference.as_ref().unwrap()).unwrap();
        assert_eq!(product.path.as_deref(), Some("SimpleHealthSiriIntent.appex"));
        assert_eq!(product.explicit_file_type.as_deref(), Some("wrapper.app-extension"));
        assert_eq!(product.source_tree, "BUILT_PRODUCTS_DIR");
        assert!(graph
            .group(&oid(PRODUCTS_GROUP_ID))
            .unwrap()
            .children
            .contains(target.product_reference.as_ref().unwrap()));

        let list = graph.configuration_list(&target.build_configuration_list).unwrap();
        assert_eq!(list.default_configuration_name.as_deref(), Some("Release"));
        let names: Vec<_> = list
            .build_configurations
            .iter()
            .map(|c| graph.configuration(c).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["Debug", "Release"]);

        let debug = graph.configuration(&list.build_configurations[0]).unwrap();
        assert_eq!(debug.build_settings["PRODUCT_NAME"], SettingValue::text(EXTENSION_NAME));
        assert_eq!(debug.build_settings["SKIP_INSTALL"], SettingValue::text("YES"));
        assert_eq!(
            debug.build_settings["INFOPLIST_FILE"],
            SettingValue::text("SimpleHealthSiriIntent/Info.plist")
        );

        // product, 2 configurations, list, target
        assert_eq!(graph.len(), before + 5);
        assert!(graph.dangling_references().is_empty());
    }

    #[test]
    fn refuses_duplicate_name() {
        let mut doc = host_app_document();
        let err = create_extension_target(
            doc.graph_mut(),
            &TargetSpec::new(HOST_TARGET, ProductType::AppExtension),
        )
        .unwrap_err();
        assert!(matches!(err, ComposeError::TargetExists(name) if name == HOST_TARGET));
    }

    #[test]
    fn product_types_map_to_wrappers() {
        assert_eq!(ProductType::ExtensionKitExtension.extension(), "appex");
        assert_eq!(ProductType::Framework.file_type(), "wrapper.framework");
        assert!(!ProductType::Bundle.is_extension());
        assert_eq!(
            TargetSpec::new("Widget", ProductType::ExtensionKitExtension).product_file_name(),
            "Widget.appex"
        );
    }
}
