//! `vessel ps` — list running containers.

use clap::Args;

use vessel_image::store::ImageStore;
use vessel_runtime::container;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if the container list cannot be assembled.
pub fn execute(_args: PsArgs) -> anyhow::Result<()> {
    let store = ImageStore::open()?;
    let records = container::list(&store)?;

    if records.is_empty() {
        println!("No running containers.");
        return Ok(());
    }

    println!("{:<18} {:<8} {:<30}", "CONTAINER ID", "PID", "IMAGE");
    for record in &records {
        println!(
            "{:<18} {:<8} {:<30}",
            record.id,
            record.pid.map_or_else(|| "-".to_string(), |p| p.to_string()),
            record.image
        );
    }
    Ok(())
}
