//! `dirmirror_io_fs` v1:
//! Selective directory mirroring engine.
//!
//! Modules:
//! - `mirror` : filtered traversal and per-file copy
//! - `reset`  : recursive destination removal
//! - `plan`   : ordered reset/mirror steps
//! - `spec`   : enums/options/errors
//! - `report` : run-time report model
//! - `util`   : shared helper functions

pub mod mirror;
pub mod plan;
pub mod report;
pub mod reset;
pub mod spec;
#[cfg(test)]
mod test_support;
mod util;

pub use mirror::{format_copy_line, mirror, mirror_task, mirror_tree};
pub use plan::{EnumMirrorStep, SpecMirrorPlan, run_plan};
pub use report::{ReportMirror, ReportMirrorBuilder};
pub use reset::reset_tree;
pub use spec::{
    EnumFsOperation, EnumMirrorErrorKind, EnumMirrorMetadataMode, EnumMirrorPatternMode,
    EnumMirrorSymlinkStrategy, MirrorError, SpecMirrorOptions, SpecMirrorTask,
};
