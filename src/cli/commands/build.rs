//! CLI implementation for `cab build`
//!
//! Loads the build record and hands it to the orchestrator: compile,
//! image pipeline, optional push.

use anyhow::{bail, Result};

use crate::cli::output::{print_detail, print_success};
use crate::core::build::{ensure_image_tools, BuildOptions, Orchestrator};
use crate::core::config::{BuildRecord, CabConfig};
use crate::infra::dirs::CabDirs;
use crate::infra::exec::HostRunner;

/// Arguments of `cab build`
pub struct BuildArgs {
    pub skip_compile: bool,
    pub skip_image: bool,
    pub no_push: bool,
    pub fresh_build: bool,
    pub nuke_install: bool,
    pub yes: bool,
}

/// Execute the build command
pub fn execute(dirs: &CabDirs, name: &str, args: BuildArgs) -> Result<()> {
    let config = CabConfig::load(dirs)?;
    let record = BuildRecord::load(dirs, name)?;

    if (args.fresh_build || args.nuke_install) && !args.yes {
        bail!("--fresh-build and --nuke-install delete data; pass --yes to confirm");
    }

    ensure_image_tools()?;

    let options = BuildOptions {
        skip_compile: args.skip_compile,
        skip_image: args.skip_image,
        push: !args.no_push,
        fresh_build: args.fresh_build,
        nuke_install: args.nuke_install,
    };

    let orchestrator = Orchestrator::new(HostRunner, config);
    match orchestrator.run(&record, &options)? {
        Some(outcome) => {
            print_success(&format!("build '{name}' finished"));
            print_detail(&format!(
                "raw:   {} ({})",
                outcome.raw.reference(),
                &outcome.raw.id[..outcome.raw.id.len().min(12)]
            ));
            print_detail(&format!(
                "image: {} ({})",
                outcome.image.reference(),
                &outcome.image.id[..outcome.image.id.len().min(12)]
            ));
        }
        None => print_success(&format!("build '{name}' compiled (image phase skipped)")),
    }
    Ok(())
}
