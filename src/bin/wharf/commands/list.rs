//! `wharf list` command

use anyhow::Result;
use serde_json::json;

use crate::cli::ListArgs;
use crate::commands::Session;
use crate::GlobalOptions;
use wharf::core::{Package, Repository};

pub fn execute(args: ListArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let session = Session::open(global_opts.verbose)?;

    let packages: Vec<Package> = if args.all {
        session
            .factory
            .create_aggregate(true, false)?
            .list_packages()?
    } else {
        session.manifest().list()?.collect::<Result<_>>()?
    };

    if shell.is_json() {
        let entries: Vec<_> = packages
            .iter()
            .map(|p| {
                json!({
                    "id": p.id(),
                    "version": p.version().to_string(),
                    "source": p.source(),
                })
            })
            .collect();
        shell.json(&json!(entries));
        return Ok(());
    }

    if packages.is_empty() {
        shell.note("no packages");
        return Ok(());
    }

    for package in &packages {
        match (args.all, package.source()) {
            (true, Some(source)) => shell.print(format!("{} {} ({})", package.id(), package.version(), source)),
            _ => shell.print(format!("{} {}", package.id(), package.version())),
        }
    }

    Ok(())
}
