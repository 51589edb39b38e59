//! `wharf add` command

use anyhow::Result;

use crate::cli::AddArgs;
use crate::commands::{parse_version, Session};
use crate::GlobalOptions;
use wharf::util::shell::Status;

pub fn execute(args: AddArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let session = Session::open(global_opts.verbose)?;

    let version = parse_version(args.version.as_deref())?;
    let source = session.source(args.source.as_deref())?;
    let project = session.project_manager(&source, !args.no_fallback)?;

    let added = project.add_reference(&args.id, version.as_ref())?;
    if added.is_empty() {
        shell.note(format!("`{}` is already referenced", args.id));
    }
    for package in &added {
        shell.status(Status::Added, package.identity());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::AddArgs;
    use clap::Parser;

    /// Helper to parse AddArgs from command-line strings.
    fn parse_add_args(args: &[&str]) -> AddArgs {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            add: AddArgs,
        }
        TestCli::parse_from(args).add
    }

    #[test]
    fn test_add_args_defaults() {
        let args = parse_add_args(&["test", "Foo"]);
        assert_eq!(args.id, "Foo");
        assert!(args.version.is_none());
        assert!(args.source.is_none());
        assert!(!args.no_fallback);
    }

    #[test]
    fn test_add_args_all_flags() {
        let args = parse_add_args(&[
            "test",
            "Foo",
            "--version",
            "1.2",
            "--source",
            "local",
            "--no-fallback",
        ]);
        assert_eq!(args.version.as_deref(), Some("1.2"));
        assert_eq!(args.source.as_deref(), Some("local"));
        assert!(args.no_fallback);
    }
}
