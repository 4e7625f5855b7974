//! `vessel child-mode` — the container init stage.
//!
//! Never invoked by users: the parent re-executes `/proc/self/exe` with
//! this subcommand after unsharing the mount, PID, and UTS namespaces.
//! The argument vector is the only channel between the two processes.

use clap::Args;

use vessel_common::types::{BindMount, ContainerId, RunOptions, VolumeMount};
use vessel_runtime::child::{self, ChildRequest};

/// Arguments for the hidden `child-mode` stage.
#[derive(Args, Debug)]
pub struct ChildModeArgs {
    /// Container id assigned by the parent.
    #[arg(long)]
    pub id: String,

    /// CPU limit in logical CPUs.
    #[arg(long, default_value_t = 0.0)]
    pub cpu: f64,

    /// Memory limit in MiB.
    #[arg(long, default_value_t = 0)]
    pub mem: u64,

    /// Bind mount (`src=PATH,dest=PATH`).
    #[arg(long)]
    pub mount: Option<BindMount>,

    /// Named volume mount (`NAME:DEST`).
    #[arg(long)]
    pub volume: Option<VolumeMount>,

    /// Workload command and arguments.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `child-mode` stage.
///
/// The process exits with the workload's exit code.
///
/// # Errors
///
/// Returns an error if container setup fails before the workload starts.
pub fn execute(args: ChildModeArgs) -> anyhow::Result<()> {
    let request = ChildRequest {
        id: ContainerId::new(args.id),
        options: RunOptions {
            cpu_limit: args.cpu,
            mem_limit_mb: args.mem,
            bind_mount: args.mount,
            volume: args.volume,
        },
        command: args.command,
    };
    let code = child::run(&request)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
