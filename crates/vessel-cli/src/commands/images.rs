//! `vessel images` — list locally available images.

use clap::Args;

use vessel_image::store::ImageStore;

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {}

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if the image catalog cannot be read.
pub fn execute(_args: ImagesArgs) -> anyhow::Result<()> {
    let store = ImageStore::open()?;
    let records = store.list();

    if records.is_empty() {
        println!("No images.");
        return Ok(());
    }

    println!("{:<30} {:<15} {:<14}", "NAME", "TAG", "IMAGE ID");
    for record in &records {
        println!(
            "{:<30} {:<15} {:<14}",
            record.name, record.tag, record.hash
        );
    }
    Ok(())
}
