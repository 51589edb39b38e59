//! `wharf source` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::{SourceArgs, SourceCommands};
use crate::GlobalOptions;
use wharf::core::source::DEFAULT_PRIORITY;
use wharf::core::PackageSource;
use wharf::ops::{add_source, remove_source, set_source_enabled};
use wharf::util::fs::create_file_system;
use wharf::util::shell::Status;
use wharf::util::GlobalContext;

pub fn execute(args: SourceArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = GlobalContext::new()?;

    let config_dir = |global: bool| -> PathBuf {
        if global {
            ctx.home().to_path_buf()
        } else {
            ctx.workspace().config_dir().to_path_buf()
        }
    };

    match args.command {
        SourceCommands::List => {
            let sources = ctx.config().source_list();
            if sources.is_empty() {
                shell.note("no package sources configured");
            }
            for source in &sources.sources {
                let state = if source.enabled { "" } else { " [disabled]" };
                shell.print(format!(
                    "{} = {} (priority {}){}",
                    source.name, source.source, source.priority, state
                ));
            }
        }
        SourceCommands::Add {
            name,
            url,
            priority,
            global,
        } => {
            let fs = create_file_system(&config_dir(global), true);
            let source = PackageSource::new(name, url).with_priority(priority.unwrap_or(DEFAULT_PRIORITY));
            add_source(fs.as_ref(), &source)?;
            shell.status(Status::Added, format!("source `{}` ({})", source.name, source.source));
        }
        SourceCommands::Remove { name, global } => {
            let fs = create_file_system(&config_dir(global), true);
            remove_source(fs.as_ref(), &name)?;
            shell.status(Status::Removed, format!("source `{}`", name));
        }
        SourceCommands::Enable { name, global } => {
            let fs = create_file_system(&config_dir(global), true);
            set_source_enabled(fs.as_ref(), &name, true)?;
            shell.status(Status::Enabled, format!("source `{}`", name));
        }
        SourceCommands::Disable { name, global } => {
            let fs = create_file_system(&config_dir(global), true);
            set_source_enabled(fs.as_ref(), &name, false)?;
            shell.status(Status::Disabled, format!("source `{}`", name));
        }
    }

    Ok(())
}
