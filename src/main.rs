//! Penguin - initramfs builder.
//!
//! Builds every registered recipe in its own container, merges the outputs
//! into one root tree and writes it out as a newc cpio archive:
//!
//! ```text
//! penguin --build-dir build -o initramfs.cpio
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use penguin::commands;
use penguin::config::Config;

#[derive(Parser)]
#[command(name = "penguin")]
#[command(about = "Builds a minimal initramfs from sandboxed recipes")]
#[command(args_conflicts_with_subcommands = true)]
#[command(
    after_help = "QUICK START:\n  penguin preflight                       Check host tools\n  penguin --build-dir build -o initramfs  Build the initramfs\n  penguin show recipes                    List components"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    build: BuildArgs,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct BuildArgs {
    /// Directory for the root tree (emptied before every build)
    #[arg(long, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// Output archive path
    #[arg(short, value_name = "FILE")]
    o: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Convert an existing container image into an initramfs
    Export {
        /// Image name (e.g. python:slim)
        image: String,

        /// Output archive path
        #[arg(short, value_name = "FILE")]
        o: Option<PathBuf>,
    },

    /// Print the init command (CMD) configured in a container image
    InspectInit {
        /// Image name (e.g. docker.io/library/python:alpine)
        image: String,
    },

    /// Run preflight checks (verify host tools before build)
    Preflight,
}

#[derive(Subcommand)]
enum ShowTarget {
    /// List registered recipes in build order
    Recipes,
    /// Print the generated build spec of a recipe
    Spec {
        /// Recipe name
        name: String,
    },
    /// Show current configuration
    Config,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let base_dir = std::env::current_dir()?;
    let config = Config::load(&base_dir);

    match cli.command {
        None => commands::cmd_build(cli.build.build_dir, cli.build.o, &config)?,

        Some(Commands::Show { what }) => {
            let show_target = match what {
                ShowTarget::Recipes => commands::show::ShowTarget::Recipes,
                ShowTarget::Spec { name } => commands::show::ShowTarget::Spec { name },
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(show_target, &config)?;
        }

        Some(Commands::Export { image, o }) => {
            commands::cmd_export(&image, o, &config)?;
        }

        Some(Commands::InspectInit { image }) => {
            commands::cmd_inspect_init(&image, &config)?;
        }

        Some(Commands::Preflight) => {
            commands::cmd_preflight(&config)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
