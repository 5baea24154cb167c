//! Command-line interface definitions for the `collector-status` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `collector-status` binary.
#[derive(Debug, Parser)]
#[command(
    name = "collector-status",
    about = "Show evidence repository status for collector instances"
)]
pub(crate) struct Cli {
    /// Show statistics only for this instance.
    #[arg(
        short = 'i',
        long = "instance",
        value_name = "INSTANCE",
        conflicts_with = "target"
    )]
    pub(crate) instance: Option<String>,
    /// Instance to show; equivalent to `--instance`.
    #[arg(value_name = "INSTANCE")]
    pub(crate) target: Option<String>,
    /// Repository root directory. Overrides `repo_dir` from configuration.
    #[arg(long, value_name = "DIR")]
    pub(crate) repo_dir: Option<String>,
}

impl Cli {
    /// Returns the requested instance, whichever form was used.
    pub(crate) fn requested_instance(&self) -> Option<&str> {
        self.instance.as_deref().or(self.target.as_deref())
    }
}
