//! `vessel exec` — execute a command inside a running container.

use clap::Args;

use vessel_runtime::attach;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Container id, as shown by `vessel ps`.
    pub container: String,

    /// Command to run inside the container.
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command.
///
/// # Errors
///
/// Returns an error if the container is not running or the attach fails.
pub fn execute(args: ExecArgs) -> anyhow::Result<()> {
    super::require_root("exec")?;

    let code = attach::attach(&args.container, &args.command)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
