//! CLI implementation for `cab list`

use anyhow::Result;

use crate::cli::output::{print_detail, print_info};
use crate::core::config::{BuildRecord, CabConfig};
use crate::infra::dirs::CabDirs;

/// Execute the list command
pub fn execute(dirs: &CabDirs, details: bool) -> Result<()> {
    let names = BuildRecord::list(dirs)?;
    if names.is_empty() {
        print_info("no builds configured");
        return Ok(());
    }

    let config = CabConfig::load(dirs)?;
    for name in names {
        let record = BuildRecord::load(dirs, &name)?;
        println!("- {name}");
        if details {
            print_detail(&format!("vendor:  {}", record.vendor));
            print_detail(&format!("release: {}", record.release));
            print_detail(&format!("sources: {}", record.sources.display()));
            if let Ok(install_dir) = config.install_dir_for(&name) {
                print_detail(&format!("install: {}", install_dir.display()));
            }
        }
    }
    Ok(())
}
