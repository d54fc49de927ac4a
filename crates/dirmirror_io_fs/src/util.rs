use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumMirrorMetadataMode, EnumMirrorPatternMode, MirrorError};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeMirrorPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeMirrorPatternSeq {
    fn is_matching(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SpecMirrorPatterns {
    pub(crate) patterns_files: TypeMirrorPatternSeq,
    pub(crate) patterns_exclude_dirs: Option<TypeMirrorPatternSeq>,
}

impl SpecMirrorPatterns {
    pub(crate) fn from_raw<S: AsRef<str>>(
        patterns_files: &[S],
        patterns_exclude_dirs: Option<&[String]>,
        rule_pattern: EnumMirrorPatternMode,
    ) -> Result<Self, MirrorError> {
        let patterns_files = _compile(patterns_files, rule_pattern)?.ok_or_else(|| {
            MirrorError::InvalidPattern("At least one file pattern is required.".to_string())
        })?;
        let patterns_exclude_dirs = match patterns_exclude_dirs {
            Some(v) => _compile(v, rule_pattern)?,
            None => None,
        };
        Ok(Self {
            patterns_files,
            patterns_exclude_dirs,
        })
    }

    pub(crate) fn is_file_matching(&self, name_file: &str) -> bool {
        self.patterns_files.is_matching(name_file)
    }

    pub(crate) fn is_dir_excluded(&self, name_dir: &str) -> bool {
        self.patterns_exclude_dirs
            .as_ref()
            .is_some_and(|p| p.is_matching(name_dir))
    }
}

fn _compile<S: AsRef<str>>(
    patterns: &[S],
    rule_pattern: EnumMirrorPatternMode,
) -> Result<Option<TypeMirrorPatternSeq>, MirrorError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumMirrorPatternMode::Literal => Ok(Some(TypeMirrorPatternSeq::Literal(
            patterns.iter().map(|p| p.as_ref().to_string()).collect(),
        ))),
        EnumMirrorPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern.as_ref())
                    .map_err(|e| _invalid_pattern(pattern.as_ref(), e))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypeMirrorPatternSeq::Glob(l_glob)))
        }
        EnumMirrorPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern.as_ref())
                    .map_err(|e| _invalid_pattern(pattern.as_ref(), e))?;
                l_regex.push(regex);
            }
            Ok(Some(TypeMirrorPatternSeq::Regex(l_regex)))
        }
    }
}

fn _invalid_pattern(pattern: &str, e: impl std::fmt::Display) -> MirrorError {
    MirrorError::InvalidPattern(format!("`{pattern}` ({e})"))
}

pub(crate) fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Resolve `path` as far as it exists on disk; the missing tail is appended
/// with `.` and `..` folded lexically.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let path_abs = _absolutize_path(path);
    if let Ok(resolved) = fs::canonicalize(&path_abs) {
        return resolved;
    }

    let mut path_normalized = PathBuf::new();
    for component in path_abs.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                path_normalized.pop();
            }
            other => {
                path_normalized.push(other.as_os_str());
                if let Ok(resolved) = fs::canonicalize(&path_normalized) {
                    path_normalized = resolved;
                }
            }
        }
    }
    path_normalized
}

/// Destination at or below the source root: files written there would be
/// walked again. A source below the destination is fine.
pub(crate) fn is_destination_inside_source(src: &Path, dst: &Path) -> bool {
    normalize_path(dst).starts_with(normalize_path(src))
}

fn _is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Reject destination paths that would write through a symlink living under
/// the destination root. With `if_allow_symlink_item`, the final component may
/// itself be a symlink (it is replaced, not followed).
pub(crate) fn validate_destination_path_safety(
    path_dst_item: &Path,
    path_dir_dst_root: &Path,
    if_allow_symlink_item: bool,
) -> Result<(), String> {
    let path_dir_dst_root_abs = _absolutize_path(path_dir_dst_root);
    let path_dst_item_abs = _absolutize_path(path_dst_item);

    let path_parent_dst = path_dst_item_abs.parent().ok_or_else(|| {
        format!(
            "Failed to derive parent directory: {}",
            path_dst_item.display()
        )
    })?;
    let path_parent_rel = path_parent_dst
        .strip_prefix(&path_dir_dst_root_abs)
        .map_err(|_| {
            format!(
                "Unsafe destination parent escapes destination root: {} (root={})",
                path_dst_item.display(),
                path_dir_dst_root.display()
            )
        })?;

    let mut path_cursor = path_dir_dst_root_abs.clone();
    for part_rel in path_parent_rel.components() {
        path_cursor.push(part_rel.as_os_str());
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta_cursor) => {
                if meta_cursor.file_type().is_symlink() {
                    return Err(format!(
                        "Unsafe destination path traverses symlink component: {}",
                        path_cursor.display()
                    ));
                }
            }
            // Nothing below a missing component can exist yet.
            Err(e) if _is_absent(&e) => return Ok(()),
            Err(e) => {
                return Err(format!(
                    "Failed to inspect destination path component {} ({e})",
                    path_cursor.display()
                ));
            }
        }
    }

    match fs::symlink_metadata(&path_dst_item_abs) {
        Ok(meta_dst_item) => {
            if meta_dst_item.file_type().is_symlink() && !if_allow_symlink_item {
                return Err(format!(
                    "Unsafe destination path is an existing symlink: {}",
                    path_dst_item.display()
                ));
            }
        }
        Err(e) if _is_absent(&e) => {}
        Err(e) => {
            return Err(format!(
                "Failed to inspect destination path {} ({e})",
                path_dst_item.display()
            ));
        }
    }

    Ok(())
}

/// Map a file found under `path_dir_src` to the same relative location under
/// `path_dir_dst`.
///
/// ```ignore
/// let dst = derive_destination_path(
///     Path::new("/src/a/b/x.h"),
///     Path::new("/src"),
///     Path::new("/include/egx"),
/// );
/// assert_eq!(dst, Path::new("/include/egx/a/b/x.h"));
/// ```
pub(crate) fn derive_destination_path(
    path_src: &Path,
    path_dir_src: &Path,
    path_dir_dst: &Path,
) -> PathBuf {
    match path_src.strip_prefix(path_dir_src) {
        Ok(path_rel) => path_dir_dst.join(path_rel),
        // Enumeration always yields children of the root; keep the basename
        // rather than escaping the destination.
        Err(_) => path_dir_dst.join(path_src.file_name().unwrap_or_default()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileCopy

pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> Result<(), io::Error> {
    let target = fs::read_link(path_src)?;
    if let Ok(meta_dst) = fs::symlink_metadata(path_dst)
        && !meta_dst.is_dir()
    {
        fs::remove_file(path_dst)?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

/// Copy bytes and permission bits, overwriting `path_file_dst`.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
    rule_metadata: EnumMirrorMetadataMode,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    if rule_metadata == EnumMirrorMetadataMode::Full {
        apply_metadata_full(path_file_src, path_file_dst)?;
    }
    Ok(())
}

fn apply_metadata_full(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("No xattrs read from {} ({e})", path_file_src.display());
            return;
        }
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            log::debug!(
                "Failed to set xattr {:?} on {} ({e})",
                name,
                path_file_dst.display()
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        SpecMirrorPatterns, derive_destination_path, is_destination_inside_source, is_hidden_name,
        normalize_path,
    };
    use crate::spec::{EnumMirrorPatternMode, MirrorError};

    #[test]
    fn glob_patterns_match_basename_by_extension() {
        let pats =
            SpecMirrorPatterns::from_raw(&["*.h", "*.hpp"], None, EnumMirrorPatternMode::Glob)
                .expect("compile");
        assert!(pats.is_file_matching("x.h"));
        assert!(pats.is_file_matching("y.hpp"));
        assert!(!pats.is_file_matching("z.txt"));
        assert!(!pats.is_file_matching("x.hh"));
    }

    #[test]
    fn star_dot_star_requires_a_dot() {
        let pats = SpecMirrorPatterns::from_raw(&["*.*"], None, EnumMirrorPatternMode::Glob)
            .expect("compile");
        assert!(pats.is_file_matching("engine.lib"));
        assert!(!pats.is_file_matching("Makefile"));
    }

    #[test]
    fn literal_and_regex_modes() {
        let pats = SpecMirrorPatterns::from_raw(&["egx"], None, EnumMirrorPatternMode::Literal)
            .expect("compile");
        assert!(pats.is_file_matching("egxbuffer.hpp"));
        assert!(!pats.is_file_matching("buffer.hpp"));

        let pats =
            SpecMirrorPatterns::from_raw(&[r"^egx\w+\.hpp$"], None, EnumMirrorPatternMode::Regex)
                .expect("compile");
        assert!(pats.is_file_matching("egxbuffer.hpp"));
        assert!(!pats.is_file_matching("egxbuffer.cpp"));
    }

    #[test]
    fn empty_file_patterns_rejected() {
        let empty: [&str; 0] = [];
        let err = SpecMirrorPatterns::from_raw(&empty, None, EnumMirrorPatternMode::Glob)
            .expect_err("empty must fail");
        assert!(matches!(err, MirrorError::InvalidPattern(_)));
    }

    #[test]
    fn exclude_dirs_use_same_mode() {
        let l_exclude = vec!["build*".to_string()];
        let pats =
            SpecMirrorPatterns::from_raw(&["*.h"], Some(&l_exclude), EnumMirrorPatternMode::Glob)
                .expect("compile");
        assert!(pats.is_dir_excluded("build-debug"));
        assert!(!pats.is_dir_excluded("core"));
    }

    #[test]
    fn derive_destination_keeps_relative_path() {
        let dst = derive_destination_path(
            Path::new("/src/a/b/x.h"),
            Path::new("/src"),
            Path::new("/include/egx"),
        );
        assert_eq!(dst, Path::new("/include/egx/a/b/x.h"));
    }

    #[test]
    fn hidden_names() {
        assert!(is_hidden_name(".git"));
        assert!(is_hidden_name(".clang-format.h"));
        assert!(!is_hidden_name("x.h"));
    }

    #[test]
    fn normalize_folds_parent_components_of_missing_paths() {
        let base = std::env::temp_dir().join("dirmirror_normalize_missing");
        let path = base.join("a").join("..").join("b").join(".").join("c");
        let normalized = normalize_path(&path);
        assert!(normalized.ends_with("dirmirror_normalize_missing/b/c"));
        assert!(
            !normalized
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        );
    }

    #[test]
    fn destination_inside_source_is_one_directional() {
        let base = std::env::temp_dir().join("dirmirror_nesting_check");
        let src = base.join("proj/EgxEngine");
        assert!(is_destination_inside_source(&src, &src));
        assert!(is_destination_inside_source(&src, &src.join("out")));
        assert!(!is_destination_inside_source(&src, &base.join("proj")));
        assert!(!is_destination_inside_source(&src, &base.join("proj/EgxEngineOut")));
    }
}
