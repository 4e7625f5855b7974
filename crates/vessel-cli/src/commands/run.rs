//! `vessel run` — run a command in a new container.

use clap::Args;

use vessel_common::types::{BindMount, RunOptions, VolumeMount};
use vessel_runtime::lifecycle::{self, RunRequest};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// CPU limit in logical CPUs (fractions allowed).
    #[arg(long, default_value_t = 0.0)]
    pub cpu: f64,

    /// Memory limit in MiB.
    #[arg(long, default_value_t = 0)]
    pub mem: u64,

    /// Bind mount a host directory (`src=PATH,dest=PATH`).
    #[arg(long)]
    pub mount: Option<BindMount>,

    /// Mount a named volume (`NAME:DEST`).
    #[arg(long)]
    pub volume: Option<VolumeMount>,

    /// Image reference (`name[:tag]`).
    pub image: String,

    /// Command to run inside the container.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `run` command.
///
/// The process exits with the workload's exit code once teardown is
/// complete.
///
/// # Errors
///
/// Returns an error if the run fails or teardown leaves residue.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    super::require_root("run")?;

    let request = RunRequest {
        image: args.image,
        options: RunOptions {
            cpu_limit: args.cpu,
            mem_limit_mb: args.mem,
            bind_mount: args.mount,
            volume: args.volume,
        },
        command: args.command,
    };
    let code = lifecycle::run(&request)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
