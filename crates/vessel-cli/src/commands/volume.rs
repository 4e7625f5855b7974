//! `vessel volume` — manage named volumes.

use clap::{Args, Subcommand};

use vessel_runtime::volume::VolumeStore;

/// Arguments for the `volume` command.
#[derive(Args, Debug)]
pub struct VolumeArgs {
    /// Volume operation to perform.
    #[command(subcommand)]
    pub action: VolumeAction,
}

/// Volume subcommands.
#[derive(Subcommand, Debug)]
pub enum VolumeAction {
    /// Create a named volume.
    Create {
        /// Volume name.
        name: String,
    },
    /// List volumes.
    Ls,
    /// Show a volume's metadata.
    Inspect {
        /// Volume name.
        name: String,
    },
    /// Remove a volume and its data.
    Rm {
        /// Volume name.
        name: String,
    },
}

/// Executes the `volume` command.
///
/// # Errors
///
/// Returns an error if the volume store operation fails.
pub fn execute(args: VolumeArgs) -> anyhow::Result<()> {
    let store = VolumeStore::open()?;
    match args.action {
        VolumeAction::Create { name } => {
            let volume = store.create(&name)?;
            println!("{}", volume.name);
        }
        VolumeAction::Ls => {
            let volumes = store.list()?;
            if volumes.is_empty() {
                println!("No volumes.");
                return Ok(());
            }
            println!("{:<25} {:<30}", "NAME", "CREATED");
            for volume in &volumes {
                println!("{:<25} {:<30}", volume.name, volume.created_at);
            }
        }
        VolumeAction::Inspect { name } => {
            let volume = store.inspect(&name)?;
            println!("{}", serde_json::to_string_pretty(&volume)?);
        }
        VolumeAction::Rm { name } => {
            store.remove(&name)?;
            println!("{name}");
        }
    }
    Ok(())
}
