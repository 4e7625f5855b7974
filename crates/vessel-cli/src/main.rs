//! # vessel — single-host container runtime CLI
//!
//! One binary for pulling images and running, inspecting, and attaching
//! to containers. The same binary re-executes itself for the namespaced
//! stages of a run (`child-mode`, `setup-veth`).

mod commands;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
