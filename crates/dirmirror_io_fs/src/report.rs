//! Mirror report models and mutable report builder.

use std::fmt;

/// Aggregate counters and diagnostics for one `mirror_tree` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportMirror {
    /// Total file entries examined against the patterns.
    pub cnt_scanned: u64,
    /// Number of scanned files whose basename matched.
    pub cnt_matched: u64,
    /// Number of matched files written to the destination.
    pub cnt_copied: u64,
    /// Number of matched files skipped by symlink strategy or dry-run.
    pub cnt_skipped: u64,
    /// Number of destination directories created.
    pub cnt_dirs_created: u64,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
}

impl ReportMirror {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} matched={} copied={} skipped={} dirs_created={} warnings={}",
            self.cnt_scanned,
            self.cnt_matched,
            self.cnt_copied,
            self.cnt_skipped,
            self.cnt_dirs_created,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[MIRROR]"))
    }
}

/// Mutable accumulator for mirror statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportMirrorBuilder {
    report: ReportMirror,
}

impl ReportMirrorBuilder {
    pub fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    pub fn add_matched(&mut self) {
        self.report.cnt_matched += 1;
    }

    pub fn add_copied(&mut self) {
        self.report.cnt_copied += 1;
    }

    pub fn add_skipped(&mut self) {
        self.report.cnt_skipped += 1;
    }

    pub fn add_dir_created(&mut self) {
        self.report.cnt_dirs_created += 1;
    }

    /// Record a warning and forward it to the `log` facade.
    pub fn add_warning(&mut self, warning: String) {
        log::warn!("{warning}");
        self.report.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportMirror {
        self.report
    }
}
