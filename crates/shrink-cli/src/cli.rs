//! CLI argument definitions for shrink.
//!
//! Global flags override the `[resolver]` table of `~/.shrink/config.toml`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "shrink",
    version,
    about = "Resolve package.json dependencies into an npm-shrinkwrap.json",
    long_about = "shrink resolves the full dependency graph of a package.json against an \
                  npm-compatible registry, hoists shared dependencies, and writes a \
                  version-pinned npm-shrinkwrap.json."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Registry base URL
    #[arg(long, global = true, env = "SHRINK_REGISTRY")]
    pub registry: Option<String>,

    /// Skip the project's devDependencies
    #[arg(long, global = true)]
    pub production: bool,

    /// Maximum concurrent registry lookups
    #[arg(long, global = true)]
    pub limit: Option<usize>,

    /// Keep every dependency nested under the module that asked for it
    #[arg(long, global = true)]
    pub no_optimize: bool,

    /// Per-lookup timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve dependencies and write npm-shrinkwrap.json
    Lock {
        /// Write the lockfile here instead of next to package.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Display the resolved dependency tree
    Tree {
        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
        /// Print module reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show why a package is in the tree
    Why {
        /// Package name or name@range
        name: String,
    },

    /// List dependencies behind their latest release
    Outdated {
        /// Include transitive dependencies
        #[arg(long)]
        all: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
