use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ReleaseError, Result};

/// Name of the project-local settings file.
pub const SETTINGS_FILE: &str = "cutrelease.toml";

/// Options for a single release run.
///
/// Built once from the command line and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Remote to pull from and push to when it is available
    pub remote_name: String,

    /// Offer to upgrade organization-owned dependencies
    pub upgrade_dependencies: bool,

    /// Exercise the workflow without pushing, then restore the initial state
    pub dry_run: bool,

    /// Use yarn instead of npm for dependency upgrades
    pub use_alternate_package_manager: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            remote_name: "origin".to_string(),
            upgrade_dependencies: true,
            dry_run: true,
            use_alternate_package_manager: true,
        }
    }
}

/// Represents the complete settings file for cut-release.
///
/// Contains branch names, the organization filter and the external commands.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub organization: OrganizationConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_tracking_branch() -> String {
    "develop".to_string()
}

fn default_production_branch() -> String {
    "master".to_string()
}

fn default_prefix() -> String {
    "release".to_string()
}

/// Branches involved in cutting a release.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    /// Integration branch the release is cut from
    #[serde(default = "default_tracking_branch")]
    pub tracking: String,

    /// Branch the release is eventually merged into
    #[serde(default = "default_production_branch")]
    pub production: String,

    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            tracking: default_tracking_branch(),
            production: default_production_branch(),
            prefix: default_prefix(),
        }
    }
}

fn default_organization_token() -> String {
    "dw-front-end-engineering".to_string()
}

/// Organizational ownership filter.
///
/// Matched as a substring against dependency sources and remote URLs.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OrganizationConfig {
    #[serde(default = "default_organization_token")]
    pub token: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        OrganizationConfig {
            token: default_organization_token(),
        }
    }
}

fn default_npm_upgrade() -> Vec<String> {
    vec!["npm".to_string(), "upgrade".to_string()]
}

fn default_yarn_upgrade() -> Vec<String> {
    vec!["yarn".to_string(), "upgrade".to_string()]
}

fn default_version_bump() -> Vec<String> {
    vec![
        "npm".to_string(),
        "run".to_string(),
        "semver".to_string(),
        "--".to_string(),
    ]
}

fn default_dry_run_arg() -> String {
    "--dry-run".to_string()
}

/// External commands, as program followed by arguments.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommandsConfig {
    #[serde(default = "default_npm_upgrade")]
    pub npm_upgrade: Vec<String>,

    #[serde(default = "default_yarn_upgrade")]
    pub yarn_upgrade: Vec<String>,

    #[serde(default = "default_version_bump")]
    pub version_bump: Vec<String>,

    /// Appended to the version bump command on a dry run
    #[serde(default = "default_dry_run_arg")]
    pub dry_run_arg: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        CommandsConfig {
            npm_upgrade: default_npm_upgrade(),
            yarn_upgrade: default_yarn_upgrade(),
            version_bump: default_version_bump(),
            dry_run_arg: default_dry_run_arg(),
        }
    }
}

impl Settings {
    fn validate(self) -> Result<Self> {
        let commands = [
            ("npm_upgrade", &self.commands.npm_upgrade),
            ("yarn_upgrade", &self.commands.yarn_upgrade),
            ("version_bump", &self.commands.version_bump),
        ];
        for (name, command) in commands {
            if command.is_empty() {
                return Err(ReleaseError::config(format!(
                    "commands.{} must name a program",
                    name
                )));
            }
        }

        if self.branches.tracking.trim().is_empty() {
            return Err(ReleaseError::config("branches.tracking must not be empty"));
        }

        Ok(self)
    }
}

/// Loads settings from file or returns defaults.
///
/// Attempts to load settings in the following order:
/// 1. Custom path provided as parameter
/// 2. `cutrelease.toml` in current directory
/// 3. `.cutrelease.toml` in user config directory
/// 4. Default settings if no file found
pub fn load_settings(config_path: Option<&str>) -> Result<Settings> {
    let settings_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| ReleaseError::config(format!("Cannot read {}: {}", path, e)))?
    } else if Path::new(SETTINGS_FILE).exists() {
        fs::read_to_string(SETTINGS_FILE)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", SETTINGS_FILE));
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Settings::default());
        }
    } else {
        return Ok(Settings::default());
    };

    parse_settings(&settings_str)
}

/// Parses a settings document, filling in defaults for missing keys.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings =
        toml::from_str(contents).map_err(|e| ReleaseError::config(e.to_string()))?;
    settings.validate()
}
