//! Ordered reset/mirror steps, as run by a post-build hook.

use std::path::PathBuf;

use crate::mirror::mirror_task;
use crate::report::ReportMirror;
use crate::reset::reset_tree;
use crate::spec::{MirrorError, SpecMirrorOptions, SpecMirrorTask};

/// One step of a [`SpecMirrorPlan`]. `label` is printed as a status line
/// before the step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumMirrorStep {
    Reset { label: String, path: PathBuf },
    Mirror { label: String, task: SpecMirrorTask },
}

impl EnumMirrorStep {
    pub fn label(&self) -> &str {
        match self {
            Self::Reset { label, .. } | Self::Mirror { label, .. } => label.as_str(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecMirrorPlan {
    pub steps: Vec<EnumMirrorStep>,
}

impl SpecMirrorPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(mut self, label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.steps.push(EnumMirrorStep::Reset {
            label: label.into(),
            path: path.into(),
        });
        self
    }

    pub fn mirror(mut self, label: impl Into<String>, task: SpecMirrorTask) -> Self {
        self.steps.push(EnumMirrorStep::Mirror {
            label: label.into(),
            task,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Execute every step in order, stopping at the first error.
///
/// Returns one [`ReportMirror`] per mirror step. Status lines go to stdout
/// when `if_echo` is set.
pub fn run_plan(
    spec_mr_plan: &SpecMirrorPlan,
    spec_mr_options: &SpecMirrorOptions,
) -> Result<Vec<ReportMirror>, MirrorError> {
    let mut l_reports = Vec::new();
    for (n_idx, step) in spec_mr_plan.steps.iter().enumerate() {
        if spec_mr_options.if_echo && !step.label().is_empty() {
            println!("{}", step.label());
        }
        log::debug!("Plan step {}/{}: {}", n_idx + 1, spec_mr_plan.len(), step.label());

        match step {
            EnumMirrorStep::Reset { path, .. } => {
                if spec_mr_options.if_dry_run {
                    log::info!("Dry run, keeping {}", path.display());
                    continue;
                }
                reset_tree(path)?;
            }
            EnumMirrorStep::Mirror { task, .. } => {
                l_reports.push(mirror_task(task, spec_mr_options)?);
            }
        }
    }
    Ok(l_reports)
}
