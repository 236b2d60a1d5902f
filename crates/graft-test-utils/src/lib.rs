//! Testing utilities for the graft workspace
//!
//! Shared fixtures: a React Native style host app project with an app
//! target and a unit-test target, a minimal single-target project, and an
//! on-disk layout for either.

#![allow(missing_docs)]

use graft_model::ObjectId;
use graft_store::{ProjectDocument, PROJECT_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Host app project: targets `SimpleHealth` and `SimpleHealthTests`,
/// Debug and Release configurations, no copy-files phase.
pub const HOST_APP_PBXPROJ: &str = include_str!("../fixtures/SimpleHealth.pbxproj");

/// Minimal project: a root group, one `App` target without phases, no
/// products group.
pub const FRESH_PBXPROJ: &str = include_str!("../fixtures/Fresh.pbxproj");
pub const FRESH_HOST_TARGET: &str = "App";

pub const HOST_TARGET: &str = "SimpleHealth";
pub const HOST_TARGET_ID: &str = "13B07F861A680F5B00A75B9A";
pub const TEST_TARGET: &str = "SimpleHealthTests";
pub const TEST_TARGET_ID: &str = "00E356ED1AD99517003FC87E";
pub const MAIN_GROUP_ID: &str = "83CBB9F61A601CBA00E9B192";
pub const PRODUCTS_GROUP_ID: &str = "83CBBA001A601CBA00E9B192";
pub const APP_GROUP_ID: &str = "13B07FAE1A68108700A75B9A";
pub const EXTENSION_NAME: &str = "SimpleHealthSiriIntent";
pub const APP_GROUP: &str = "group.com.gormantec.simplehealth";

pub fn oid(s: &str) -> ObjectId {
    ObjectId::new(s).unwrap()
}

pub fn document(text: &str) -> ProjectDocument {
    ProjectDocument::parse(text).unwrap()
}

pub fn host_app_document() -> ProjectDocument {
    document(HOST_APP_PBXPROJ)
}

/// The fixture with a second target also named `SimpleHealth`
pub fn ambiguous_host_pbxproj() -> String {
    HOST_APP_PBXPROJ.replace(
        "\t\t\tname = SimpleHealthTests;\n\t\t\tproductName = SimpleHealthTests;",
        "\t\t\tname = SimpleHealth;\n\t\t\tproductName = SimpleHealthTests;",
    )
}

/// `ios/SimpleHealth.xcodeproj` inside a temporary directory
pub struct ProjectFixture {
    dir: TempDir,
    bundle: PathBuf,
}

impl ProjectFixture {
    pub fn new() -> Self {
        Self::with_pbxproj(HOST_APP_PBXPROJ)
    }

    pub fn with_pbxproj(text: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("ios").join("SimpleHealth.xcodeproj");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join(PROJECT_FILE), text).unwrap();
        Self { dir, bundle }
    }

    /// Directory holding the `.xcodeproj` bundle
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("ios")
    }

    pub fn bundle(&self) -> &Path {
        &self.bundle
    }

    pub fn pbxproj_path(&self) -> PathBuf {
        self.bundle.join(PROJECT_FILE)
    }

    pub fn read_pbxproj(&self) -> String {
        fs::read_to_string(self.pbxproj_path()).unwrap()
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root().join(relative).exists()
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    /// Write the extension's fixed source files under `ios/<name>/`
    pub fn write_extension_sources(&self, name: &str) {
        self.write(&format!("{name}/IntentHandler.swift"), "import Intents\n");
        self.write(&format!("{name}/Info.plist"), "<plist version=\"1.0\"><dict/></plist>\n");
        self.write(&format!("{name}/{name}Extension.swift"), "import Foundation\n");
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}
