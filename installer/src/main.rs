//! Loader installer CLI entrypoint.
//!
//! This binary installs a runtime mod loader into a game directory, removes
//! files left behind by the release it replaced, and compares release
//! archives offline.

mod install_flow;

use clap::Parser;
use loader_installer::cli::{Cli, Command};
use loader_installer::config::{ConfigLocation, InstallerConfig};
use loader_installer::dirs::{BaseDirs, SystemBaseDirs};
use loader_installer::error::Result;
use loader_installer::output::write_stderr_line;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter directive.
const LOG_ENV: &str = "LOADER_INSTALLER_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity, cli.quiet);
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install a stderr subscriber; `LOADER_INSTALLER_LOG` overrides the level
/// implied by `-v`/`-q`. Library `log` records are bridged into it.
fn init_logging(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbosity, quiet)));
    // Fails only when a global subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_log_level(verbosity: u8, quiet: bool) -> &'static str {
    match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let dirs = SystemBaseDirs;

    match &cli.command {
        Command::Install(args) => {
            let config = load_config(cli, &dirs)?;
            install_flow::run_install(args, &config, cli.quiet, stderr)
        }
        Command::Cleanup(args) => {
            let config = load_config(cli, &dirs)?;
            install_flow::run_cleanup(args, &config, &dirs, cli.quiet, stderr)
        }
        Command::Diff(args) => install_flow::run_diff(args, stdout),
    }
}

fn load_config(cli: &Cli, dirs: &dyn BaseDirs) -> Result<InstallerConfig> {
    let location = ConfigLocation::resolve(
        cli.config_path().map(camino::Utf8Path::as_std_path),
        dirs,
    );
    Ok(InstallerConfig::load(&location)?)
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
