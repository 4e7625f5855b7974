//! `vessel setup-veth` — in-namespace veth configuration stage.
//!
//! Never invoked by users: the parent re-executes `/proc/self/exe` with
//! this subcommand so the container end of the veth pair can be
//! addressed and brought up from inside the container's network
//! namespace, where the host's `ip(8)` cannot see it.

use std::net::Ipv4Addr;

use clap::Args;

use vessel_runtime::lifecycle;

/// Arguments for the hidden `setup-veth` stage.
#[derive(Args, Debug)]
pub struct SetupVethArgs {
    /// Container whose namespace to enter.
    pub container: String,

    /// Address to assign to the container end of the pair.
    pub address: Ipv4Addr,
}

/// Executes the `setup-veth` stage.
///
/// # Errors
///
/// Returns an error if the namespace cannot be joined or the interface
/// cannot be configured.
pub fn execute(args: SetupVethArgs) -> anyhow::Result<()> {
    lifecycle::setup_veth(&args.container, args.address)?;
    Ok(())
}
