//! `wharf restore` command

use anyhow::{bail, Result};

use crate::cli::RestoreArgs;
use crate::commands::Session;
use crate::GlobalOptions;
use wharf::ops::restore::{restore, RestoreEvent};
use wharf::util::shell::{Progress, Status};

pub fn execute(args: RestoreArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let session = Session::open(global_opts.verbose)?;

    if !session.config.restore_enabled() {
        bail!("package restore is disabled (`restore.enabled = false`)");
    }

    let source = session.source(args.source.as_deref())?;
    let manifest = session.manifest();

    let mut progress: Option<Progress> = None;
    let report = restore(&session.factory, &manifest, &source, &mut |event| match event {
        RestoreEvent::Started { total } => {
            if total > 0 {
                shell.status(Status::Restoring, format!("{} package(s) from {}", total, source.name));
                progress = Some(shell.progress(total as u64, "restoring"));
            }
        }
        RestoreEvent::Restored(package) => {
            let from = package.source.as_deref().unwrap_or("unknown source");
            shell.status(
                Status::Restored,
                format!("{} v{} from {}", package.id, package.version, from),
            );
            if let Some(progress) = progress.as_mut() {
                progress.inc();
            }
        }
        RestoreEvent::Missing(identity) => {
            shell.status(Status::Missing, identity);
            if let Some(progress) = progress.as_mut() {
                progress.inc();
            }
        }
    })?;

    if let Some(progress) = &progress {
        progress.finish();
    }

    if !report.is_complete() {
        bail!(
            "{} package(s) could not be restored: {}",
            report.missing.len(),
            report.missing.join(", ")
        );
    }
    if report.restored.is_empty() {
        shell.note("all packages are already restored");
    }

    Ok(())
}
