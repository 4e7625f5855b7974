//! CLI command definitions and dispatch.

pub mod child_mode;
pub mod exec;
pub mod images;
pub mod ps;
pub mod pull;
pub mod run;
pub mod setup_veth;
pub mod volume;

use clap::{Parser, Subcommand};

/// Vessel — single-host container runtime.
#[derive(Parser, Debug)]
#[command(name = "vessel", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command in a new container.
    Run(run::RunArgs),
    /// Execute a command inside a running container.
    Exec(exec::ExecArgs),
    /// List running containers.
    Ps(ps::PsArgs),
    /// Pull an image from a registry.
    Pull(pull::PullArgs),
    /// List locally available images.
    Images(images::ImagesArgs),
    /// Manage named volumes.
    Volume(volume::VolumeArgs),
    /// Container init stage (re-executed internally).
    #[command(hide = true, name = "child-mode")]
    ChildMode(child_mode::ChildModeArgs),
    /// In-namespace veth configuration stage (re-executed internally).
    #[command(hide = true, name = "setup-veth")]
    SetupVeth(setup_veth::SetupVethArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => run::execute(args),
        Command::Exec(args) => exec::execute(args),
        Command::Ps(args) => ps::execute(args),
        Command::Pull(args) => pull::execute(args),
        Command::Images(args) => images::execute(args),
        Command::Volume(args) => volume::execute(args),
        Command::ChildMode(args) => child_mode::execute(args),
        Command::SetupVeth(args) => setup_veth::execute(args),
    }
}

/// Rejects commands that manipulate kernel resources when not run as root.
///
/// # Errors
///
/// Returns an error if the effective user is not root.
pub fn require_root(command: &str) -> anyhow::Result<()> {
    if !nix::unistd::Uid::effective().is_root() {
        anyhow::bail!("`vessel {command}` must run as root");
    }
    Ok(())
}
