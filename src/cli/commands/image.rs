//! CLI implementation for `cab image`
//!
//! Bootstrap image management: seed, base and builder images.

use anyhow::Result;

use crate::cli::commands::ImageCommands;
use crate::cli::output::print_success;
use crate::core::bootstrap::Bootstrap;
use crate::core::build::ensure_image_tools;
use crate::core::config::CabConfig;
use crate::infra::dirs::CabDirs;
use crate::infra::exec::HostRunner;

/// Execute an image subcommand
pub fn execute(dirs: &CabDirs, command: ImageCommands) -> Result<()> {
    ensure_image_tools()?;
    let config = CabConfig::load(dirs)?;
    let bootstrap = Bootstrap::new(HostRunner, config.author);

    match command {
        ImageCommands::Seed => {
            let id = bootstrap.build_seed()?;
            print_success(&format!("seed image ready ({})", short(&id)));
        }
        ImageCommands::Base {
            vendor,
            release,
            sourcedir,
            bindir,
        } => {
            let id = bootstrap.build_base(&vendor, &release, &sourcedir, &bindir)?;
            print_success(&format!(
                "base image for {vendor}/{release} ready ({})",
                short(&id)
            ));
        }
        ImageCommands::Builder { vendor, release } => {
            let id = bootstrap.build_builder(&vendor, &release)?;
            print_success(&format!(
                "builder image for {vendor}/{release} ready ({})",
                short(&id)
            ));
        }
        ImageCommands::Ensure {
            vendor,
            release,
            sourcedir,
            bindir,
        } => {
            bootstrap.ensure(&vendor, &release, &sourcedir, &bindir)?;
            print_success(&format!("images for {vendor}/{release} are in place"));
        }
    }
    Ok(())
}

fn short(id: &str) -> &str {
    &id[..id.len().min(12)]
}
