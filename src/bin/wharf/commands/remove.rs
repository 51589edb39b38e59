//! `wharf remove` command

use anyhow::Result;

use crate::cli::RemoveArgs;
use crate::commands::{parse_version, Session};
use crate::GlobalOptions;
use wharf::util::shell::Status;

pub fn execute(args: RemoveArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let session = Session::open(global_opts.verbose)?;

    let version = parse_version(args.version.as_deref())?;
    let removed = session
        .manifest()
        .remove_reference(&args.id, version.as_ref())?;
    shell.status(Status::Removed, removed.identity());

    Ok(())
}
