use anyhow::{Context, Result};
use clap::Parser;

use cut_release::cli::{Cli, Command, ReleaseArgs, ReleaseOrchestrator, RunOutcome};
use cut_release::config::{self, RunConfig};
use cut_release::git::Git2Repository;
use cut_release::tools::ProcessRunner;
use cut_release::ui::{self, TerminalSink};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let settings = match config::load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Release(args) => release(&args, &settings),
    }
}

fn release(args: &ReleaseArgs, settings: &config::Settings) -> Result<()> {
    let workdir = std::env::current_dir().context("Cannot read the current directory")?;
    let run_config = RunConfig::from(args);
    log::debug!("run configuration: {:?}", run_config);

    let repo = Git2Repository::open(&workdir);
    let tools = ProcessRunner::new(&workdir, settings.commands.clone());
    let sink = TerminalSink::new();

    let orchestrator =
        ReleaseOrchestrator::new(&repo, &tools, &sink, settings, run_config, &workdir);

    match orchestrator.run() {
        Ok(RunOutcome::Pushed {
            branch,
            remote,
            pull_request_url,
            ..
        }) => {
            ui::display_success(&format!("Released {} to {}", branch, remote));
            if pull_request_url.is_none() {
                println!("Open the pull requests for {} manually.", branch);
            }
            Ok(())
        }
        Ok(RunOutcome::DryRunComplete { branch }) => {
            ui::display_success(&format!(
                "Dry run of {} complete; nothing was pushed",
                branch
            ));
            Ok(())
        }
        Err(e) => {
            ui::display_error(&format!("Release failed during {}: {}", e.step(), e));
            std::process::exit(1);
        }
    }
}
