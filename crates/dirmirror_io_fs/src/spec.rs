//! Mirror specification models and top-level error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorSymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Pattern matching mode for file and directory patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// How much file metadata follows the copied bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorMetadataMode {
    /// Permission bits only, as carried by `fs::copy`.
    Permissions,
    /// Permission bits, access/modify times and (Linux) extended attributes.
    Full,
}

/// Filesystem operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFsOperation {
    Enumerate,
    Mkdir,
    Copy,
    Delete,
}

impl fmt::Display for EnumFsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enumerate => "enumerate",
            Self::Mkdir => "mkdir",
            Self::Copy => "copy",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Coarse error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorErrorKind {
    NotFound,
    PermissionDenied,
    Io,
    /// Rejected before any filesystem mutation (bad pattern, bad roots).
    InvalidInput,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// One mirror job: every file under `path_dir_src` whose basename matches any
/// of `patterns` lands at the same relative path under `path_dir_dst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMirrorTask {
    pub path_dir_src: PathBuf,
    pub path_dir_dst: PathBuf,
    pub patterns: Vec<String>,
}

impl SpecMirrorTask {
    pub fn new<P, Q, I, S>(dir_source: P, dir_destination: Q, patterns: I) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path_dir_src: dir_source.into(),
            path_dir_dst: dir_destination.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Input options for `mirror_tree`.
#[derive(Debug, Clone)]
pub struct SpecMirrorOptions {
    /// Pattern interpretation mode, shared by file and directory patterns.
    pub rule_pattern: EnumMirrorPatternMode,
    /// Directory basenames whose subtrees are never entered.
    pub patterns_exclude_dirs: Option<Vec<String>>,
    /// Symlink handling behavior.
    pub rule_symlink: EnumMirrorSymlinkStrategy,
    /// Metadata carried over to each destination file.
    pub rule_metadata: EnumMirrorMetadataMode,
    /// Match and descend into entries whose name starts with `.`.
    pub if_include_hidden: bool,
    /// Refuse a symlinked destination root and any destination path that
    /// passes through a symlinked directory. Off: links are written through.
    pub if_reject_destination_symlinks: bool,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
    /// Print `source --> destination` for every copied file.
    pub if_echo: bool,
}

impl Default for SpecMirrorOptions {
    fn default() -> Self {
        Self {
            rule_pattern: EnumMirrorPatternMode::Glob,
            patterns_exclude_dirs: None,
            rule_symlink: EnumMirrorSymlinkStrategy::Dereference,
            rule_metadata: EnumMirrorMetadataMode::Permissions,
            if_include_hidden: false,
            if_reject_destination_symlinks: false,
            if_dry_run: false,
            if_echo: true,
        }
    }
}

/// Errors aborting a mirror/reset run. The first one encountered wins.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Failed to {operation} {}: not found", path.display())]
    NotFound {
        operation: EnumFsOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to {operation} {}: permission denied", path.display())]
    PermissionDenied {
        operation: EnumFsOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        operation: EnumFsOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        path_dir_src.display(),
        path_dir_dst.display()
    )]
    SourceDestinationOverlap {
        path_dir_src: PathBuf,
        path_dir_dst: PathBuf,
    },
    #[error("{0}")]
    UnsafeDestination(String),
}

impl MirrorError {
    /// Classify an IO failure by its kind.
    pub fn from_io(
        operation: EnumFsOperation,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                operation,
                path,
                source,
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                operation,
                path,
                source,
            },
            _ => Self::Io {
                operation,
                path,
                source,
            },
        }
    }

    pub fn kind(&self) -> EnumMirrorErrorKind {
        match self {
            Self::NotFound { .. } => EnumMirrorErrorKind::NotFound,
            Self::PermissionDenied { .. } => EnumMirrorErrorKind::PermissionDenied,
            Self::Io { .. } => EnumMirrorErrorKind::Io,
            Self::InvalidPattern(_)
            | Self::SourceNotDirectory(_)
            | Self::SourceDestinationOverlap { .. }
            | Self::UnsafeDestination(_) => EnumMirrorErrorKind::InvalidInput,
        }
    }

    /// Failing operation for filesystem errors.
    pub fn operation(&self) -> Option<EnumFsOperation> {
        match self {
            Self::NotFound { operation, .. }
            | Self::PermissionDenied { operation, .. }
            | Self::Io { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Failing path for filesystem errors.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::Io { path, .. } => Some(path),
            Self::SourceNotDirectory(path) => Some(path),
            _ => None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
