//! `vessel pull` — pull an image from a registry.

use std::path::Path;

use clap::Args;

use vessel_common::config::RegistryConfig;
use vessel_common::constants::CONFIG_FILE;
use vessel_image::pull::Puller;
use vessel_image::store::ImageStore;

/// Arguments for the `pull` command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Image reference (`name[:tag]`).
    pub image: String,
}

/// Executes the `pull` command.
///
/// # Errors
///
/// Returns an error if every configured registry fails.
pub fn execute(args: PullArgs) -> anyhow::Result<()> {
    super::require_root("pull")?;

    let config = RegistryConfig::load(Path::new(CONFIG_FILE));
    let mut store = ImageStore::open()?;
    let hash = Puller::new(&config)?.pull(&mut store, &args.image)?;
    println!("{hash}");
    Ok(())
}
