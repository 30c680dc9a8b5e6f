//! SoC register-map builder CLI.
//!
//! This binary drives the composition pipeline from JSON descriptions. It provides:
//! 1. **Build:** Compose a design into a placed map; print the listing and optionally write the
//!    flattened map as JSON.
//! 2. **Check:** Run the same pipeline and only report success or the first error.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::{fs, process};

use tracing::debug;
use tracing_subscriber::EnvFilter;

use socmap_core::common::addr::parse_literal;
use socmap_core::design::desc::DesignDesc;
use socmap_core::{BuildOutput, PlatformConfig};

#[derive(Parser, Debug)]
#[command(
    name = "socmap",
    author,
    version,
    about = "Compose a hierarchical SoC design into one register map",
    long_about = "Load a JSON design description, bind every register field to one bank, place \
                  all banks and peripherals from the base address, and export the flattened \
                  map.\n\nExamples:\n  socmap build design.json --base 0x40000000\n  socmap \
                  build design.json -c platform.json --json map.json\n  socmap check design.json \
                  -c platform.json\n\nSet RUST_LOG=debug for per-pass detail."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the register map and print its listing.
    Build {
        /// Design description (JSON).
        design: PathBuf,

        /// Platform configuration (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Base address of the top map; overrides the configuration.
        #[arg(short, long, value_parser = parse_base)]
        base: Option<u64>,

        /// Write the flattened map as JSON to this file.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Run the pipeline without producing an artifact.
    Check {
        /// Design description (JSON).
        design: PathBuf,

        /// Platform configuration (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Base address of the top map; overrides the configuration.
        #[arg(short, long, value_parser = parse_base)]
        base: Option<u64>,
    },
}

fn parse_base(text: &str) -> Result<u64, String> {
    parse_literal(text).map_err(|e| e.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Build {
            design,
            config,
            base,
            json,
        }) => {
            let output = run_pipeline(&design, config.as_deref(), base);
            println!("{}", output.listing());
            if let Some(path) = json {
                write_json(&output, &path);
            }
        }
        Some(Commands::Check {
            design,
            config,
            base,
        }) => {
            let output = run_pipeline(&design, config.as_deref(), base);
            println!(
                "ok: {} entries, {} banks, {} driver methods, {:#x} bytes",
                output.flat.len(),
                output.banks.len(),
                output.driver_methods.len(),
                output.map.byte_len()
            );
        }
        None => {
            eprintln!("SoC register-map builder: pass a subcommand");
            eprintln!();
            eprintln!("  socmap build <design.json> [--config <platform.json>] [--base <addr>]");
            eprintln!("  socmap check <design.json> [--config <platform.json>] [--base <addr>]");
            eprintln!();
            eprintln!("  socmap --help  for full options");
            process::exit(1);
        }
    }
}

/// Loads the inputs and runs the standard pipeline; exits with status 1 on any error.
fn run_pipeline(design: &Path, config: Option<&Path>, base: Option<u64>) -> BuildOutput {
    let mut platform = match config {
        Some(path) => PlatformConfig::from_file(path)
            .unwrap_or_else(|e| fail(&format!("config {}: {e}", path.display()))),
        None => PlatformConfig::default(),
    };
    if base.is_some() {
        platform.base_address = base;
    }
    debug!(
        base = ?platform.base_address,
        overrides = platform.peripherals.len(),
        "loaded platform configuration"
    );

    let desc = DesignDesc::from_file(design)
        .unwrap_or_else(|e| fail(&format!("design {}: {e}", design.display())));
    let (design, root) = desc
        .instantiate()
        .unwrap_or_else(|e| fail(&format!("design: {e}")));

    socmap_core::build(&design, root, &platform)
        .unwrap_or_else(|e| fail(&format!("build failed: {e}")))
}

fn write_json(output: &BuildOutput, path: &Path) {
    let json = output
        .to_json()
        .unwrap_or_else(|e| fail(&format!("serializing map: {e}")));
    if let Err(e) = fs::write(path, json) {
        fail(&format!("writing {}: {e}", path.display()));
    }
    println!("[*] Wrote {}", path.display());
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}
