use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use dirmirror_io_fs::{
    EnumMirrorMetadataMode, EnumMirrorPatternMode, EnumMirrorSymlinkStrategy, SpecMirrorOptions,
    SpecMirrorPlan, SpecMirrorTask,
};

/// Mirror files matching a pattern from one directory tree into another.
#[derive(Parser, Debug)]
#[command(name = "dirmirror", version, about, long_about = None)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy every matching file to the same relative path under the destination.
    Mirror(MirrorArgs),
    /// Delete a directory and everything beneath it.
    Reset {
        /// Directory to delete. Must exist.
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct MirrorArgs {
    /// Directory to search recursively.
    pub source_root: PathBuf,

    /// Directory receiving the mirrored files. Created on demand.
    pub destination_root: PathBuf,

    /// File-name patterns, e.g. `*.h`. A file is copied when any pattern matches.
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// Delete the destination tree before copying. It must already exist.
    #[arg(long, env = "DIRMIRROR_RESET")]
    pub reset: bool,

    /// Print what would be copied without touching the destination.
    #[arg(long, env = "DIRMIRROR_DRY_RUN")]
    pub dry_run: bool,

    /// How patterns are interpreted.
    #[arg(long, value_enum, default_value_t = ArgPatternMode::Glob, env = "DIRMIRROR_PATTERN_MODE")]
    pub pattern_mode: ArgPatternMode,

    /// What to do with symbolic links found in the source tree.
    #[arg(
        long,
        value_enum,
        default_value_t = ArgSymlinkMode::Dereference,
        env = "DIRMIRROR_SYMLINKS"
    )]
    pub symlinks: ArgSymlinkMode,

    /// Also carry access/modify times and extended attributes.
    #[arg(long, env = "DIRMIRROR_PRESERVE_METADATA")]
    pub preserve_metadata: bool,

    /// Match and descend into entries whose name starts with a dot.
    #[arg(long, env = "DIRMIRROR_INCLUDE_HIDDEN")]
    pub include_hidden: bool,

    /// Fail instead of writing through symlinks in the destination tree.
    #[arg(long, env = "DIRMIRROR_REJECT_DEST_SYMLINKS")]
    pub reject_dest_symlinks: bool,

    /// Directory names (same pattern mode) whose subtrees are skipped.
    #[arg(long = "exclude-dir", value_name = "PATTERN")]
    pub exclude_dirs: Vec<String>,

    /// Do not print per-file and status lines.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPatternMode {
    Glob,
    Regex,
    Literal,
}

impl From<ArgPatternMode> for EnumMirrorPatternMode {
    fn from(value: ArgPatternMode) -> Self {
        match value {
            ArgPatternMode::Glob => Self::Glob,
            ArgPatternMode::Regex => Self::Regex,
            ArgPatternMode::Literal => Self::Literal,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSymlinkMode {
    Dereference,
    Skip,
    Copy,
}

impl From<ArgSymlinkMode> for EnumMirrorSymlinkStrategy {
    fn from(value: ArgSymlinkMode) -> Self {
        match value {
            ArgSymlinkMode::Dereference => Self::Dereference,
            ArgSymlinkMode::Skip => Self::SkipSymlinks,
            ArgSymlinkMode::Copy => Self::CopySymlinks,
        }
    }
}

impl MirrorArgs {
    pub fn to_options(&self) -> SpecMirrorOptions {
        SpecMirrorOptions {
            rule_pattern: self.pattern_mode.into(),
            patterns_exclude_dirs: (!self.exclude_dirs.is_empty())
                .then(|| self.exclude_dirs.clone()),
            rule_symlink: self.symlinks.into(),
            rule_metadata: if self.preserve_metadata {
                EnumMirrorMetadataMode::Full
            } else {
                EnumMirrorMetadataMode::Permissions
            },
            if_include_hidden: self.include_hidden,
            if_reject_destination_symlinks: self.reject_dest_symlinks,
            if_dry_run: self.dry_run,
            if_echo: !self.quiet,
        }
    }

    pub fn to_plan(&self) -> SpecMirrorPlan {
        let mut spec_mr_plan = SpecMirrorPlan::new();
        if self.reset {
            spec_mr_plan = spec_mr_plan.reset(
                format!("Removing {}", self.destination_root.display()),
                &self.destination_root,
            );
        }
        spec_mr_plan.mirror(
            "Copying files",
            SpecMirrorTask::new(
                &self.source_root,
                &self.destination_root,
                self.patterns.iter().cloned(),
            ),
        )
    }
}
