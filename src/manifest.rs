//! Package manifest inspection.
//!
//! Reads `package.json` and picks out the dependencies whose declared source
//! belongs to the organization.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// Unordered set of dependency names
pub type DependencySet = BTreeSet<String>;

/// package.json structure (minimal fields we care about)
#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
}

/// A parsed package manifest
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    package: PackageJson,
}

impl Manifest {
    /// Whether `dir` holds a manifest
    pub fn exists_in(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }

    /// Read and parse the manifest in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let contents = fs::read_to_string(&path)
            .map_err(|e| ReleaseError::manifest(format!("{}: {}", path.display(), e)))?;

        let mut manifest = Self::parse(&contents)
            .map_err(|e| ReleaseError::manifest(format!("{}: {}", path.display(), e)))?;
        manifest.path = path;
        Ok(manifest)
    }

    /// Parse manifest contents that did not come from disk
    pub fn parse(contents: &str) -> std::result::Result<Self, serde_json::Error> {
        let package: PackageJson = serde_json::from_str(contents)?;
        Ok(Manifest {
            path: PathBuf::from(MANIFEST_FILE),
            package,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runtime and development dependencies whose source contains `filter`
    pub fn owned_dependencies(&self, filter: &str) -> DependencySet {
        self.package
            .dependencies
            .iter()
            .chain(self.package.dev_dependencies.iter())
            .filter(|(_, source)| source.contains(filter))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The package version, when it is valid semver
    pub fn version(&self) -> Option<semver::Version> {
        let raw = self.package.version.as_deref()?;
        match semver::Version::parse(raw.trim()) {
            Ok(version) => Some(version),
            Err(e) => {
                log::debug!("manifest version '{}' is not semver: {}", raw, e);
                None
            }
        }
    }
}

/// Dependencies of the project in `dir` owned by the organization `filter`
pub fn list_owned_dependencies(dir: &Path, filter: &str) -> Result<DependencySet> {
    Ok(Manifest::load(dir)?.owned_dependencies(filter))
}
