//! CLI implementation for `cab images`
//!
//! Lists every image of one build: hash, size, references, creation
//! time, with the current `latest` marked.

use anyhow::Result;

use crate::cli::output::{format_size, print_detail, print_info};
use crate::core::build::ensure_image_tools;
use crate::core::config::BuildRecord;
use crate::core::images::Images;
use crate::infra::dirs::CabDirs;

/// Execute the images command
pub fn execute(dirs: &CabDirs, name: &str) -> Result<()> {
    let _record = BuildRecord::load(dirs, name)?;
    ensure_image_tools()?;

    let images = Images::host();
    let found = images.find_build_images(name)?;
    if found.is_empty() {
        print_info(&format!("no images for build '{name}'"));
        return Ok(());
    }

    for image in found {
        let latest = if image.has_tag("latest") { " (latest)" } else { "" };
        println!(
            "- {} ({}){latest}",
            image.short_id(),
            format_size(image.size())
        );
        for reference in image.names() {
            print_detail(&format!("name: {reference}"));
        }
        print_detail(&format!("created: {}", image.created()));
    }
    Ok(())
}
