//! Filtered tree traversal and mirror-copy orchestration.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::{ReportMirror, ReportMirrorBuilder};
use crate::spec::{
    EnumFsOperation, EnumMirrorSymlinkStrategy, MirrorError, SpecMirrorOptions, SpecMirrorTask,
};
use crate::util::{
    SpecMirrorPatterns, copy_file_with_metadata, create_symbolic_link, derive_destination_path,
    is_destination_inside_source, is_hidden_name, validate_destination_path_safety,
};

#[derive(Debug, Clone)]
struct SpecDirEntry {
    path_dir_src_sub: PathBuf,
    name_dir: String,
    if_is_symlink: bool,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    path_file_src: PathBuf,
    name_file: String,
    if_is_symlink: bool,
}

#[derive(Debug)]
struct SpecMirrorContext<'a> {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    spec_mr_options: &'a SpecMirrorOptions,
    spec_mr_pats: SpecMirrorPatterns,
    builder_mr_report: ReportMirrorBuilder,
    set_visited_dirs: HashSet<(u64, u64)>,
    set_dirs_ready: HashSet<PathBuf>,
}

/// Copy every file under `dir_source` whose basename matches `pattern` to the
/// same relative path under `dir_destination`, using default options.
///
/// Returns the number of files copied.
pub fn mirror<P, Q>(dir_source: P, dir_destination: Q, pattern: &str) -> Result<u64, MirrorError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let report = mirror_tree(
        dir_source,
        dir_destination,
        &[pattern],
        &SpecMirrorOptions::default(),
    )?;
    Ok(report.cnt_copied)
}

/// Run one [`SpecMirrorTask`].
pub fn mirror_task(
    spec_mr_task: &SpecMirrorTask,
    spec_mr_options: &SpecMirrorOptions,
) -> Result<ReportMirror, MirrorError> {
    mirror_tree(
        &spec_mr_task.path_dir_src,
        &spec_mr_task.path_dir_dst,
        spec_mr_task.patterns.as_slice(),
        spec_mr_options,
    )
}

/// Mirror the files under `dir_source` matching any of `patterns` into
/// `dir_destination`.
///
/// The run is sequential:
/// 1. Pattern compilation and root validation.
/// 2. Depth-first traversal in name order; every matching file is copied as
///    soon as it is found, creating missing destination directories first.
/// 3. Report aggregation.
///
/// Existing destination files are always overwritten. Directories without a
/// matching file beneath them are never created. The first filesystem error
/// aborts the run; files copied before it stay in place.
pub fn mirror_tree<P, Q, S>(
    dir_source: P,
    dir_destination: Q,
    patterns: &[S],
    spec_mr_options: &SpecMirrorOptions,
) -> Result<ReportMirror, MirrorError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    S: AsRef<str>,
{
    let spec_mr_pats = SpecMirrorPatterns::from_raw(
        patterns,
        spec_mr_options.patterns_exclude_dirs.as_deref(),
        spec_mr_options.rule_pattern,
    )?;

    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    let meta_dir_src = fs::metadata(&path_dir_src)
        .map_err(|e| MirrorError::from_io(EnumFsOperation::Enumerate, &path_dir_src, e))?;
    if !meta_dir_src.is_dir() {
        return Err(MirrorError::SourceNotDirectory(path_dir_src));
    }
    if is_destination_inside_source(&path_dir_src, &path_dir_dst) {
        return Err(MirrorError::SourceDestinationOverlap {
            path_dir_src,
            path_dir_dst,
        });
    }
    if spec_mr_options.if_reject_destination_symlinks
        && let Ok(meta_dir_dst) = fs::symlink_metadata(&path_dir_dst)
        && meta_dir_dst.file_type().is_symlink()
    {
        return Err(MirrorError::UnsafeDestination(format!(
            "Destination root path must not be a symbolic link: {}",
            path_dir_dst.display()
        )));
    }

    log::debug!(
        "Mirroring {} -> {} (patterns={:?})",
        path_dir_src.display(),
        path_dir_dst.display(),
        patterns.iter().map(AsRef::as_ref).collect::<Vec<_>>()
    );

    let mut spec_mr_ctx = SpecMirrorContext {
        path_dir_src: path_dir_src.clone(),
        path_dir_dst,
        spec_mr_options,
        spec_mr_pats,
        builder_mr_report: ReportMirrorBuilder::default(),
        set_visited_dirs: HashSet::new(),
        set_dirs_ready: HashSet::new(),
    };

    walk_directory(&path_dir_src, &mut spec_mr_ctx)?;

    let report = spec_mr_ctx.builder_mr_report.build();
    log::info!("{report}");
    Ok(report)
}

fn walk_directory(
    path_root: &Path,
    spec_mr_ctx: &mut SpecMirrorContext,
) -> Result<(), MirrorError> {
    let enum_rule_symlink = spec_mr_ctx.spec_mr_options.rule_symlink;
    if enum_rule_symlink == EnumMirrorSymlinkStrategy::Dereference {
        let stat_root = fs::metadata(path_root)
            .map_err(|e| MirrorError::from_io(EnumFsOperation::Enumerate, path_root, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let tuple_dirs_identifier = (stat_root.dev(), stat_root.ino());
            if !spec_mr_ctx.set_visited_dirs.insert(tuple_dirs_identifier) {
                spec_mr_ctx
                    .builder_mr_report
                    .add_warning(format!("Symlink loop detected: {}", path_root.display()));
                return Ok(());
            }
        }
        #[cfg(not(unix))]
        let _ = stat_root;
    }

    log::debug!("Scanning {}", path_root.display());

    let mut l_dirs: Vec<SpecDirEntry> = Vec::new();
    let mut l_files: Vec<SpecFileEntry> = Vec::new();

    let iter_entries = fs::read_dir(path_root)
        .map_err(|e| MirrorError::from_io(EnumFsOperation::Enumerate, path_root, e))?;

    let if_include_hidden = spec_mr_ctx.spec_mr_options.if_include_hidden;
    for _entry_res in iter_entries {
        let entry =
            _entry_res.map_err(|e| MirrorError::from_io(EnumFsOperation::Enumerate, path_root, e))?;

        let path_entry = entry.path();
        let c_name = entry.file_name().to_string_lossy().to_string();
        if !if_include_hidden && is_hidden_name(&c_name) {
            continue;
        }
        let cfg_file_type = entry
            .file_type()
            .map_err(|e| MirrorError::from_io(EnumFsOperation::Enumerate, &path_entry, e))?;

        let b_is_symlink = cfg_file_type.is_symlink();
        let b_is_dir = cfg_file_type.is_dir() || (b_is_symlink && path_entry.is_dir());
        if b_is_dir {
            l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: c_name,
                if_is_symlink: b_is_symlink,
            });
        } else if cfg_file_type.is_file() || b_is_symlink {
            l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: c_name,
                if_is_symlink: b_is_symlink,
            });
        } else {
            spec_mr_ctx
                .builder_mr_report
                .add_warning(format!("Special file skipped: {}", path_entry.display()));
        }
    }

    l_dirs.sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    l_files.sort_by(|a, b| a.name_file.cmp(&b.name_file));

    if spec_mr_ctx.spec_mr_pats.patterns_exclude_dirs.is_some() {
        l_dirs.retain(|d| !spec_mr_ctx.spec_mr_pats.is_dir_excluded(&d.name_dir));
    }

    for _dir_entry in l_dirs {
        if _dir_entry.if_is_symlink {
            match enum_rule_symlink {
                EnumMirrorSymlinkStrategy::Dereference => {}
                EnumMirrorSymlinkStrategy::CopySymlinks => {
                    spec_mr_ctx.builder_mr_report.add_warning(format!(
                        "Linked directory not copied: {}",
                        _dir_entry.path_dir_src_sub.display()
                    ));
                    continue;
                }
                EnumMirrorSymlinkStrategy::SkipSymlinks => {
                    log::debug!(
                        "Not descending into linked directory: {}",
                        _dir_entry.path_dir_src_sub.display()
                    );
                    continue;
                }
            }
        }
        walk_directory(&_dir_entry.path_dir_src_sub, spec_mr_ctx)?;
    }

    for _file_entry in l_files {
        handle_file_entry(_file_entry, spec_mr_ctx)?;
    }
    Ok(())
}

fn handle_file_entry(
    spec_file_entry: SpecFileEntry,
    spec_mr_ctx: &mut SpecMirrorContext,
) -> Result<(), MirrorError> {
    spec_mr_ctx.builder_mr_report.add_scanned();
    if !spec_mr_ctx
        .spec_mr_pats
        .is_file_matching(&spec_file_entry.name_file)
    {
        return Ok(());
    }
    spec_mr_ctx.builder_mr_report.add_matched();

    let enum_rule_symlink = spec_mr_ctx.spec_mr_options.rule_symlink;
    if spec_file_entry.if_is_symlink {
        match enum_rule_symlink {
            EnumMirrorSymlinkStrategy::SkipSymlinks => {
                spec_mr_ctx.builder_mr_report.add_skipped();
                return Ok(());
            }
            EnumMirrorSymlinkStrategy::Dereference => {
                // A dangling link surfaces here as NotFound.
                let meta_file_src_target = fs::metadata(&spec_file_entry.path_file_src)
                    .map_err(|e| {
                        MirrorError::from_io(
                            EnumFsOperation::Copy,
                            &spec_file_entry.path_file_src,
                            e,
                        )
                    })?;
                if !meta_file_src_target.is_file() {
                    spec_mr_ctx.builder_mr_report.add_warning(format!(
                        "Special file target skipped: {}",
                        spec_file_entry.path_file_src.display()
                    ));
                    spec_mr_ctx.builder_mr_report.add_skipped();
                    return Ok(());
                }
            }
            EnumMirrorSymlinkStrategy::CopySymlinks => {}
        }
    }
    let if_copy_link = spec_file_entry.if_is_symlink
        && enum_rule_symlink == EnumMirrorSymlinkStrategy::CopySymlinks;

    let path_file_dst = derive_destination_path(
        &spec_file_entry.path_file_src,
        &spec_mr_ctx.path_dir_src,
        &spec_mr_ctx.path_dir_dst,
    );
    if spec_mr_ctx.spec_mr_options.if_reject_destination_symlinks {
        validate_destination_path_safety(&path_file_dst, &spec_mr_ctx.path_dir_dst, if_copy_link)
            .map_err(MirrorError::UnsafeDestination)?;
    }

    if spec_mr_ctx.spec_mr_options.if_echo {
        println!(
            "{}",
            format_copy_line(&spec_file_entry.path_file_src, &path_file_dst)
        );
    }

    if spec_mr_ctx.spec_mr_options.if_dry_run {
        spec_mr_ctx.builder_mr_report.add_skipped();
        return Ok(());
    }

    if let Some(path_parent_dst) = path_file_dst.parent() {
        ensure_destination_dir(path_parent_dst, spec_mr_ctx)?;
    }

    let res_copy = if if_copy_link {
        create_symbolic_link(&spec_file_entry.path_file_src, &path_file_dst)
    } else {
        copy_file_with_metadata(
            &spec_file_entry.path_file_src,
            &path_file_dst,
            spec_mr_ctx.spec_mr_options.rule_metadata,
        )
    };
    res_copy.map_err(|e| {
        MirrorError::from_io(EnumFsOperation::Copy, &spec_file_entry.path_file_src, e)
    })?;

    log::debug!(
        "Copied {} -> {}",
        spec_file_entry.path_file_src.display(),
        path_file_dst.display()
    );
    spec_mr_ctx.builder_mr_report.add_copied();
    Ok(())
}

/// Per-file progress line: `<source> --> <destination>`.
pub fn format_copy_line(path_file_src: &Path, path_file_dst: &Path) -> String {
    format!("{} --> {}", path_file_src.display(), path_file_dst.display())
}

fn ensure_destination_dir(
    path_dir: &Path,
    spec_mr_ctx: &mut SpecMirrorContext,
) -> Result<(), MirrorError> {
    if spec_mr_ctx.set_dirs_ready.contains(path_dir) {
        return Ok(());
    }

    let mut n_missing = 0_u64;
    let mut path_cursor = Some(path_dir);
    while let Some(path_current) = path_cursor {
        if path_current.as_os_str().is_empty() || path_current.is_dir() {
            break;
        }
        n_missing += 1;
        path_cursor = path_current.parent();
    }

    if n_missing > 0 {
        fs::create_dir_all(path_dir)
            .map_err(|e| MirrorError::from_io(EnumFsOperation::Mkdir, path_dir, e))?;
        log::debug!("Created {} ({n_missing} new)", path_dir.display());
        for _ in 0..n_missing {
            spec_mr_ctx.builder_mr_report.add_dir_created();
        }
    }
    spec_mr_ctx.set_dirs_ready.insert(path_dir.to_path_buf());
    Ok(())
}
