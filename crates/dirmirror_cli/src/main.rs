use anyhow::Context;
use clap::Parser;
use dirmirror_io_fs::{reset_tree, run_plan};

mod args;

use args::{Cli, Command, MirrorArgs};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Mirror(mirror_args) => run_mirror(&mirror_args),
        Command::Reset { path } => {
            println!("Removing {}", path.display());
            reset_tree(&path).with_context(|| format!("Failed to reset {}", path.display()))
        }
    }
}

fn init_logging(verbose: u8) {
    let c_default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(c_default_filter))
        .init();
}

fn run_mirror(mirror_args: &MirrorArgs) -> anyhow::Result<()> {
    let spec_mr_options = mirror_args.to_options();
    let spec_mr_plan = mirror_args.to_plan();

    let l_reports = run_plan(&spec_mr_plan, &spec_mr_options).with_context(|| {
        format!(
            "Failed to mirror {} into {}",
            mirror_args.source_root.display(),
            mirror_args.destination_root.display()
        )
    })?;

    if spec_mr_options.if_echo {
        for report in &l_reports {
            println!("{report}");
        }
    }
    log::debug!("Finished {} mirror step(s)", l_reports.len());
    Ok(())
}
