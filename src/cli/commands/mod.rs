//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod create;
pub mod destroy;
pub mod image;
pub mod images;
pub mod init;
pub mod list;
pub mod shell;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::infra::dirs::CabDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the cab configuration
    Init {
        /// Root directory for per-build install trees
        #[arg(long)]
        installs_dir: PathBuf,

        /// ccache directory shared across builds
        #[arg(long)]
        ccache_dir: Option<PathBuf>,

        /// Maximum ccache size (e.g. 10G)
        #[arg(long)]
        ccache_size: Option<String>,

        /// Registry to push finished images to (host[:port])
        #[arg(long)]
        registry_url: Option<String>,

        /// Skip TLS verification when pushing to the registry
        #[arg(long)]
        insecure_registry: bool,

        /// Overwrite an existing configuration and skip the registry probe
        #[arg(short, long)]
        force: bool,
    },

    /// Create a new build; does not build
    Create {
        /// Name for the build
        name: String,

        /// Vendor to use for this build
        vendor: String,

        /// Release to use for this build
        release: String,

        /// Directory where sources for this build are expected
        sourcedir: PathBuf,

        /// Build with debug symbols (increases build size)
        #[arg(long)]
        with_debug: bool,

        /// Build with tests (increases build size)
        #[arg(long)]
        with_tests: bool,

        /// Git repository to clone into SOURCEDIR
        #[arg(long)]
        clone_from_repo: Option<String>,

        /// Git branch to clone
        #[arg(long, requires = "clone_from_repo")]
        clone_from_branch: Option<String>,
    },

    /// Run a build: compile, image, push
    Build {
        /// Name of the build
        name: String,

        /// Skip the compile phase; image the existing install tree
        #[arg(long)]
        skip_compile: bool,

        /// Skip the image phase; compile only
        #[arg(long)]
        skip_image: bool,

        /// Do not push the result even if a registry is configured
        #[arg(long)]
        no_push: bool,

        /// Clean the source tree's build directory before compiling
        #[arg(long)]
        fresh_build: bool,

        /// Destroy the install tree before compiling
        #[arg(long)]
        nuke_install: bool,

        /// Confirm destructive options (--fresh-build, --nuke-install)
        #[arg(short, long)]
        yes: bool,
    },

    /// Destroy an existing build
    Destroy {
        /// Name of the build to destroy
        name: String,

        /// Also remove the install tree
        #[arg(long)]
        remove_install: bool,

        /// Also remove the build's images
        #[arg(long)]
        remove_images: bool,

        /// Confirm the destruction
        #[arg(short, long)]
        yes: bool,
    },

    /// List configured builds
    List {
        /// Show vendor, release and directories for each build
        #[arg(short, long)]
        details: bool,
    },

    /// List a build's images
    Images {
        /// Name of the build
        name: String,
    },

    /// Manage bootstrap images (seed, base, builder)
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },

    /// Drop into a shell in a build's latest image
    Shell {
        /// Name of the build
        name: String,
    },
}

/// Bootstrap image subcommands
#[derive(Subcommand, Debug)]
pub enum ImageCommands {
    /// Build the shared seed image
    Seed,

    /// Build the base image for a vendor/release
    Base {
        vendor: String,
        release: String,

        /// Source tree carrying install-deps.sh
        sourcedir: PathBuf,

        /// Directory carrying install-requirements.sh
        bindir: PathBuf,
    },

    /// Build the builder image for a vendor/release
    Builder { vendor: String, release: String },

    /// Build whichever of seed, base and builder is missing
    Ensure {
        vendor: String,
        release: String,

        /// Source tree carrying install-deps.sh
        sourcedir: PathBuf,

        /// Directory carrying install-requirements.sh
        bindir: PathBuf,
    },
}

impl Commands {
    pub fn run(self) -> Result<()> {
        let dirs = CabDirs::new();
        match self {
            Self::Init {
                installs_dir,
                ccache_dir,
                ccache_size,
                registry_url,
                insecure_registry,
                force,
            } => init::execute(
                &dirs,
                init::InitOptions {
                    installs_dir,
                    ccache_dir,
                    ccache_size,
                    registry_url,
                    insecure_registry,
                    force,
                },
            ),
            Self::Create {
                name,
                vendor,
                release,
                sourcedir,
                with_debug,
                with_tests,
                clone_from_repo,
                clone_from_branch,
            } => create::execute(
                &dirs,
                create::CreateOptions {
                    name,
                    vendor,
                    release,
                    sourcedir,
                    with_debug,
                    with_tests,
                    clone_from_repo,
                    clone_from_branch,
                },
            ),
            Self::Build {
                name,
                skip_compile,
                skip_image,
                no_push,
                fresh_build,
                nuke_install,
                yes,
            } => build::execute(
                &dirs,
                &name,
                build::BuildArgs {
                    skip_compile,
                    skip_image,
                    no_push,
                    fresh_build,
                    nuke_install,
                    yes,
                },
            ),
            Self::Destroy {
                name,
                remove_install,
                remove_images,
                yes,
            } => destroy::execute(&dirs, &name, remove_install, remove_images, yes),
            Self::List { details } => list::execute(&dirs, details),
            Self::Images { name } => images::execute(&dirs, &name),
            Self::Image { command } => image::execute(&dirs, command),
            Self::Shell { name } => shell::execute(&dirs, &name),
        }
    }
}
