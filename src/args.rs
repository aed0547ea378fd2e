use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments for the comparison and folder size tool.
///
/// ```rust
/// use clap::Parser;
/// use treecmp::args::{Args, Command};
///
/// let args = Args::parse_from(["treecmp", "compare", "./left", "./right", "--recursive"]);
/// assert!(matches!(args.command, Command::Compare { recursive: true, .. }));
/// ```
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compare directory trees and aggregate folder sizes"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "Print a JSON result envelope instead of tables")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        long = "skip",
        value_name = "NAME",
        global = true,
        help = "Directory name to prune (repeatable, added to the configured list)"
    )]
    pub skip: Vec<String>,

    #[arg(
        long,
        global = true,
        help = "Descend into symlinked directories (skips already visited targets)"
    )]
    pub follow_symlinks: bool,

    #[arg(long, global = true, help = "Suppress progress output on stderr")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate folder sizes under a directory
    Size {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        path: PathBuf,

        #[arg(long, default_value_t = 20, help = "Number of top-level folders to list")]
        top: usize,

        #[arg(long, value_name = "N", help = "Also list the N largest folders anywhere")]
        largest: Option<usize>,
    },
    /// Compare two directories
    Compare {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        left: PathBuf,

        #[arg(value_hint = clap::ValueHint::DirPath)]
        right: PathBuf,

        #[arg(short, long, conflicts_with = "flat", help = "Descend into subdirectories")]
        recursive: bool,

        #[arg(long, help = "Compare the current directory level only")]
        flat: bool,

        #[arg(long, help = "Hide identical entries")]
        only_diff: bool,
    },
}

impl Command {
    /// Resolves recursion from the flags, falling back to the configured
    /// default when neither flag is given.
    ///
    /// ```rust
    /// use clap::Parser;
    /// use treecmp::args::Args;
    ///
    /// let args = Args::parse_from(["treecmp", "compare", "a", "b", "--flat"]);
    /// assert_eq!(args.command.resolve_recursive(true), Some(false));
    /// ```
    pub fn resolve_recursive(&self, default_recursive: bool) -> Option<bool> {
        match self {
            Command::Compare {
                recursive, flat, ..
            } => Some(if *recursive {
                true
            } else if *flat {
                false
            } else {
                default_recursive
            }),
            Command::Size { .. } => None,
        }
    }
}
