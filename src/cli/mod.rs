//! Command line surface
//!
//! Argument parsing lives here so the workflow can be driven from tests
//! without spawning the binary. [orchestration] holds the workflow itself.

use clap::{ArgAction, Parser, Subcommand};

use crate::config::RunConfig;

pub mod orchestration;

pub use orchestration::{ReleaseOrchestrator, RunOutcome, Stage, NONE_CHOICE};

#[derive(Debug, Parser)]
#[command(
    name = "cut-release",
    version,
    about = "Cut a dated release branch from the integration branch and push it"
)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Log git and tool activity")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create, bump and push a release branch
    Release(ReleaseArgs),
}

/// Options of the `release` subcommand.
///
/// Boolean flags accept an explicit `true`/`false`; a bare flag means `true`.
#[derive(Debug, Clone, PartialEq, Eq, clap::Args)]
pub struct ReleaseArgs {
    #[arg(short, long, default_value = "origin", help = "Preferred remote")]
    pub remote_name: String,

    #[arg(
        short,
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        help = "Offer to upgrade organization dependencies"
    )]
    pub upgrade_deps: bool,

    #[arg(
        long,
        visible_alias = "dry",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        help = "Run every step, then restore the repository instead of pushing"
    )]
    pub dry_run: bool,

    #[arg(
        long,
        visible_alias = "yarn",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        help = "Upgrade dependencies with yarn instead of npm"
    )]
    pub with_yarn: bool,
}

impl From<&ReleaseArgs> for RunConfig {
    fn from(args: &ReleaseArgs) -> Self {
        RunConfig {
            remote_name: args.remote_name.clone(),
            upgrade_dependencies: args.upgrade_deps,
            dry_run: args.dry_run,
            use_alternate_package_manager: args.with_yarn,
        }
    }
}
