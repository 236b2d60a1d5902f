//! Extension installer
//!
//! Runs the grafting pass over one project:
//!
//! ```text
//! Start -> CreateTarget -> StageFiles -> BindSourcePhase -> BindResourcePhase
//!       -> WriteCapabilityDocument -> BindCapabilityResource -> PatchSettings
//!       -> EmbedIntoHost -> Done
//! Start -> PatchSettingsOnly -> PatchSettings -> Done      (target exists)
//! ```
//!
//! All graph changes happen in memory. Nothing reaches the disk until the
//! whole pass has succeeded and the result has been verified. Both files
//! are then staged next to their destinations and committed back to back,
//! the project file last; if it fails to land, the capability document is
//! restored.

use std::path::{Path, PathBuf};

use graft_compose::{
    add_embed_entry, apply_settings, bind_files, create_extension_target, ensure_group,
    ensure_phase, ensure_target_dependency, plan_capability_document, register_capability_document,
    stage_files, Ensured, FileClass, SettingsPatch, StagedFile, TargetSpec,
};
use graft_index::LookupIndex;
use graft_model::{ObjectId, PhaseKind, ProjectGraph, SettingValue};
use graft_store::{stage_if_changed, ProjectDocument, ProjectStore};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, GraftConfig, ReconcileMode};
use crate::error::{GraftError, GraftResult};
use crate::report::{CapabilityReport, InstallReport};
use crate::state::{InstallState, StateTrace};
use crate::verify::verify;

/// Runs the grafting pass described by a [`GraftConfig`]
#[derive(Debug, Clone)]
pub struct ExtensionInstaller {
    config: GraftConfig,
}

impl ExtensionInstaller {
    /// Create an installer
    ///
    /// # Errors
    /// Returns `GraftError::Config` if the configuration is unusable.
    pub fn new(config: GraftConfig) -> GraftResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GraftConfig {
        &self.config
    }

    /// Load the project, run the pass, and write the results
    ///
    /// With `dry_run` set the report is computed and nothing is written.
    ///
    /// # Errors
    /// Any fatal [`GraftError`]; the files on disk are then untouched.
    pub fn run(&self) -> GraftResult<InstallReport> {
        let mut store = ProjectStore::open(&self.config.project)?;
        let mut doc = store.load()?;
        let source_root = self
            .config
            .source_root
            .clone()
            .unwrap_or_else(|| store.project_root().to_path_buf());
        info!(
            project = %store.path().display(),
            source_root = %source_root.display(),
            extension = %self.config.extension.name,
            "loaded project"
        );

        let mut report = self.apply(&mut doc, &source_root)?;
        if self.config.dry_run {
            info!(created = report.created(), changed = report.graph_changed, "dry run; nothing written");
            return Ok(report);
        }

        self.write(&mut store, &doc, &mut report, &source_root)?;
        info!(
            created = report.created(),
            configurations = report.configurations_changed,
            written = report.graph_written,
            "install finished"
        );
        Ok(report)
    }

    /// Write the results of [`ExtensionInstaller::apply`]
    ///
    /// Every fallible step (graph check, rendering, temporary files) runs
    /// before any destination changes. The capability document is committed
    /// first and the project file last; a failed project commit restores the
    /// capability document.
    ///
    /// # Errors
    /// `GraftError::Write` or `GraftError::Compose`; the files on disk then
    /// hold what they held before the call.
    pub fn write(
        &self,
        store: &mut ProjectStore,
        doc: &ProjectDocument,
        report: &mut InstallReport,
        source_root: &Path,
    ) -> GraftResult<()> {
        let project = store.stage(doc)?;
        let capability = match &report.capability {
            Some(capability) => {
                let path = source_root.join(&capability.path);
                let (document, _) = plan_capability_document(&path, &capability.key, &capability.groups)?;
                stage_if_changed(&path, &document.render())?
            }
            None => None,
        };

        let capability = capability.map(|pending| pending.commit()).transpose()?;
        let capability_written = capability.is_some();
        if let Some(project) = project {
            if let Err(error) = store.commit(project) {
                if let Some(committed) = capability {
                    if let Err(restore) = committed.roll_back() {
                        warn!(%restore, "could not restore capability document");
                    }
                }
                return Err(error.into());
            }
            report.graph_written = true;
        }
        if let Some(capability) = report.capability.as_mut() {
            capability.written = capability_written;
        }
        Ok(())
    }

    /// Run the pass on an already loaded document without writing
    ///
    /// `source_root` is where the extension directory and its files live.
    ///
    /// # Errors
    /// `GraftError::HostNotFound` before any change if the host is absent;
    /// `GraftError::Integrity` if the result fails verification.
    pub fn apply(&self, doc: &mut ProjectDocument, source_root: &Path) -> GraftResult<InstallReport> {
        let (host, existing) = self.resolve(doc.graph())?;
        let mut trace = StateTrace::new();

        let mut report = match existing {
            Some(target) if self.config.mode == ReconcileMode::SettingsOnly => {
                self.refresh(doc.graph_mut(), &mut trace, host, target, source_root)?
            }
            existing => self.graft(doc.graph_mut(), &mut trace, host, existing, source_root)?,
        };
        trace.advance(InstallState::Done)?;
        report.states = trace.into_visited();

        let verification = verify(doc.graph());
        if !verification.is_clean() {
            warn!(?verification, "updated graph failed verification");
            return Err(GraftError::Integrity {
                problems: verification.problems(),
            });
        }
        report.graph_changed = doc.is_modified();
        Ok(report)
    }

    fn resolve(&self, graph: &ProjectGraph) -> GraftResult<(ObjectId, Option<ObjectId>)> {
        let index = LookupIndex::new(graph);
        let host = index
            .resolve_target(self.config.host()?)
            .map_err(GraftError::from_host_lookup)?;
        let existing = index.unique_target_by_name(&self.config.extension.name)?;
        if existing.as_ref() == Some(&host) {
            return Err(ConfigError::Invalid {
                field: "host_target",
                reason: "host and extension are the same target".into(),
            }
            .into());
        }
        debug!(host = %host, existing = ?existing, "resolved targets");
        Ok((host, existing))
    }

    fn refresh(
        &self,
        graph: &mut ProjectGraph,
        trace: &mut StateTrace,
        host: ObjectId,
        target: ObjectId,
        source_root: &Path,
    ) -> GraftResult<InstallReport> {
        info!(target = %target, "extension target exists; refreshing settings");
        let mut report = self.report(host, Ensured::reused(target.clone()));
        trace.advance(InstallState::PatchSettingsOnly)?;
        report.capability = Some(self.plan_capability(source_root)?);
        trace.advance(InstallState::PatchSettings)?;
        report.configurations_changed = apply_settings(graph, &target, &self.settings_patch())?;
        Ok(report)
    }

    fn graft(
        &self,
        graph: &mut ProjectGraph,
        trace: &mut StateTrace,
        host: ObjectId,
        existing: Option<ObjectId>,
        source_root: &Path,
    ) -> GraftResult<InstallReport> {
        let extension = &self.config.extension;
        let target = match existing {
            Some(id) => {
                info!(target = %id, "extension target exists; reconciling");
                Ensured::reused(id)
            }
            None => {
                trace.advance(InstallState::CreateTarget)?;
                Ensured::created(create_extension_target(graph, &self.target_spec())?)
            }
        };
        let mut report = self.report(host.clone(), target.clone());

        trace.advance(InstallState::StageFiles)?;
        let group = ensure_group(graph, &extension.name)?;
        let present = self.present_files(source_root, &mut report.skipped_files);
        let staged = stage_files(graph, &group.id, &present)?;
        report.files = staged.files().to_vec();

        trace.advance(InstallState::BindSourcePhase)?;
        let sources = ensure_phase(graph, &target.id, PhaseKind::Sources)?;
        report
            .build_files
            .extend(bind_files(graph, &sources.id, &staged.ids_of(FileClass::Source))?);
        ensure_phase(graph, &target.id, PhaseKind::Frameworks)?;

        trace.advance(InstallState::BindResourcePhase)?;
        let resources = ensure_phase(graph, &target.id, PhaseKind::Resources)?;
        report
            .build_files
            .extend(bind_files(graph, &resources.id, &staged.ids_of(FileClass::Resource))?);

        trace.advance(InstallState::WriteCapabilityDocument)?;
        report.capability = Some(self.plan_capability(source_root)?);

        trace.advance(InstallState::BindCapabilityResource)?;
        let file_name = extension.capability_file_name();
        let registered = register_capability_document(graph, &group.id, &target.id, &file_name)?;
        report.files.push(StagedFile {
            path: file_name,
            id: registered.file_ref.id,
            class: FileClass::Resource,
            created: registered.file_ref.created,
        });
        report.build_files.push(registered.build_file);
        report.group = Some(group);

        trace.advance(InstallState::PatchSettings)?;
        report.configurations_changed = apply_settings(graph, &target.id, &self.settings_patch())?;

        trace.advance(InstallState::EmbedIntoHost)?;
        let product = graph
            .target(&target.id)
            .and_then(|t| t.product_reference.clone());
        match product {
            Some(product) => {
                report.embed = Some(add_embed_entry(graph, &host, &product, extension.destination)?);
            }
            None => warn!(target = %target.id, "extension target has no product reference; not embedding"),
        }
        report.dependency = Some(ensure_target_dependency(graph, &host, &target.id)?);
        Ok(report)
    }

    fn report(&self, host: ObjectId, target: Ensured) -> InstallReport {
        InstallReport::new(
            self.config.extension.name.as_str(),
            host,
            target,
            self.config.mode,
            self.config.dry_run,
        )
    }

    fn target_spec(&self) -> TargetSpec {
        let extension = &self.config.extension;
        let mut spec = TargetSpec::new(extension.name.as_str(), extension.product_type);
        if let Some(id) = &extension.bundle_identifier {
            spec = spec.with_bundle_identifier(id.as_str());
        }
        if let Some(plist) = extension.info_plist_path() {
            spec = spec.with_info_plist(plist);
        }
        spec
    }

    /// Configured settings plus the keys the pass always maintains; keys the
    /// configuration sets explicitly win
    fn settings_patch(&self) -> SettingsPatch {
        let extension = &self.config.extension;
        let mut patch = self.config.settings.clone();
        let mut maintain = |key: &str, value: SettingValue| {
            if patch.get(key).is_none() {
                patch.set(key, value);
            }
        };
        maintain("CODE_SIGN_ENTITLEMENTS", SettingValue::text(extension.capability_path()));
        if let Some(id) = &extension.bundle_identifier {
            maintain("PRODUCT_BUNDLE_IDENTIFIER", SettingValue::text(id.as_str()));
        }
        if let Some(plist) = extension.info_plist_path() {
            maintain("INFOPLIST_FILE", SettingValue::text(plist));
        }
        patch
    }

    fn present_files(&self, source_root: &Path, skipped: &mut Vec<PathBuf>) -> Vec<String> {
        let directory = source_root.join(&self.config.extension.name);
        self.config
            .extension
            .resolved_files()
            .into_iter()
            .filter(|file| {
                let path = directory.join(file);
                if path.is_file() {
                    return true;
                }
                let error = GraftError::FileNotFound(path.clone());
                warn!(%error, "skipping fixed file");
                skipped.push(path);
                false
            })
            .collect()
    }

    fn plan_capability(&self, source_root: &Path) -> GraftResult<CapabilityReport> {
        let capabilities = &self.config.capabilities;
        let path = self.config.extension.capability_path();
        let (document, changed) =
            plan_capability_document(&source_root.join(&path), &capabilities.key, &capabilities.groups)?;
        debug!(path = %path, changed, groups = document.groups().len(), "planned capability document");
        Ok(CapabilityReport {
            path,
            key: capabilities.key.clone(),
            groups: document.groups().to_vec(),
            changed,
            written: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_test_utils::*;
    use pretty_assertions::assert_eq;

    fn installer(fixture: &ProjectFixture) -> ExtensionInstaller {
        ExtensionInstaller::new(
            GraftConfig::default()
                .with_project(fixture.bundle())
                .with_host_target(HOST_TARGET),
        )
        .unwrap()
    }

    #[test]
    fn missing_host_aborts_before_mutation() {
        let fixture = ProjectFixture::new();
        let installer = ExtensionInstaller::new(
            GraftConfig::default()
                .with_project(fixture.bundle())
                .with_host_target("NoSuchApp"),
        )
        .unwrap();
        let mut doc = host_app_document();
        let err = installer.apply(&mut doc, &fixture.root()).unwrap_err();
        assert!(matches!(err, GraftError::HostNotFound(name) if name == "NoSuchApp"));
        assert!(!doc.is_modified());
    }

    #[test]
    fn ambiguous_host_is_rejected() {
        let fixture = ProjectFixture::with_pbxproj(&ambiguous_host_pbxproj());
        let err = installer(&fixture).run().unwrap_err();
        assert!(matches!(err, GraftError::Lookup(_)));
        assert_eq!(fixture.read_pbxproj(), ambiguous_host_pbxproj());
    }

    #[test]
    fn host_given_by_identifier() {
        let fixture = ProjectFixture::new();
        fixture.write_extension_sources(EXTENSION_NAME);
        let installer = ExtensionInstaller::new(
            GraftConfig::default()
                .with_project(fixture.bundle())
                .with_host_target(HOST_TARGET_ID),
        )
        .unwrap();
        let report = installer.run().unwrap();
        assert_eq!(report.host, oid(HOST_TARGET_ID));
    }

    #[test]
    fn missing_files_are_skipped() {
        let fixture = ProjectFixture::new();
        fixture.write(&format!("{EXTENSION_NAME}/IntentHandler.swift"), "import Intents\n");
        let mut doc = host_app_document();
        let report = installer(&fixture).apply(&mut doc, &fixture.root()).unwrap();

        assert_eq!(report.skipped_files.len(), 2);
        let paths: Vec<_> = report.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["IntentHandler.swift", "SimpleHealthSiriIntent.entitlements"]);
    }

    #[test]
    fn creation_path_visits_every_state() {
        let fixture = ProjectFixture::new();
        fixture.write_extension_sources(EXTENSION_NAME);
        let mut doc = host_app_document();
        let report = installer(&fixture).apply(&mut doc, &fixture.root()).unwrap();

        assert!(report.target.created);
        assert_eq!(report.states.len(), 10);
        assert_eq!(report.states.first(), Some(&InstallState::Start));
        assert_eq!(report.states.last(), Some(&InstallState::Done));
        assert!(!report.states.contains(&InstallState::PatchSettingsOnly));
        assert!(report.graph_changed);
        assert!(!report.graph_written);
        assert!(!fixture.exists(&format!("{EXTENSION_NAME}/{EXTENSION_NAME}.entitlements")));
    }

    #[test]
    fn settings_patch_keeps_explicit_values() {
        let fixture = ProjectFixture::new();
        let mut config = GraftConfig::default()
            .with_project(fixture.bundle())
            .with_host_target(HOST_TARGET)
            .with_bundle_identifier("com.example.Intent");
        config.settings.set("CODE_SIGN_ENTITLEMENTS", SettingValue::text("Custom.entitlements"));
        let patch = ExtensionInstaller::new(config).unwrap().settings_patch();

        assert_eq!(
            patch.get("CODE_SIGN_ENTITLEMENTS"),
            Some(&SettingValue::text("Custom.entitlements"))
        );
        assert_eq!(
            patch.get("PRODUCT_BUNDLE_IDENTIFIER"),
            Some(&SettingValue::text("com.example.Intent"))
        );
        assert_eq!(
            patch.get("INFOPLIST_FILE"),
            Some(&SettingValue::text("SimpleHealthSiriIntent/Info.plist"))
        );
    }

    #[test]
    fn host_equal_to_extension_is_rejected() {
        let fixture = ProjectFixture::new();
        let installer = ExtensionInstaller::new(
            GraftConfig::default()
                .with_project(fixture.bundle())
                .with_host_target(HOST_TARGET)
                .with_extension_name(HOST_TARGET),
        )
        .unwrap();
        let err = installer.apply(&mut host_app_document(), &fixture.root()).unwrap_err();
        assert!(matches!(err, GraftError::Config(ConfigError::Invalid { field: "host_target", .. })));
    }
}
