//! `lcadata fetch`: download the newest remote build.

use std::io::Write;

use super::dispatcher::{Command, CommandContext, CommandResult};
use crate::cli::args::{subdir_rules, FetchArgs};
use crate::error::Result;

/// The fetch command implementation.
pub struct FetchCommand {
    args: FetchArgs,
}

impl FetchCommand {
    pub fn new(args: FetchArgs) -> Self {
        Self { args }
    }
}

impl Command for FetchCommand {
    fn execute(&self, ctx: &CommandContext, out: &mut dyn Write) -> Result<CommandResult> {
        let descriptor = self.args.dataset.descriptor();
        let rules = subdir_rules(&self.args.routes);
        let paths = ctx.paths();

        if self.args.sync {
            let outcome = ctx.cache().sync(&descriptor, paths, &rules)?;
            if !outcome.before.needs_fetch() {
                writeln!(out, "{} is {}; nothing to do", descriptor.name, outcome.before)?;
                return Ok(CommandResult::success());
            }
            return report(out, &descriptor.name, outcome.fetched);
        }

        let fetched = ctx.cache().fetch(&descriptor, paths, &rules)?;
        report(out, &descriptor.name, fetched)
    }
}

fn report(out: &mut dyn Write, name: &str, fetched: bool) -> Result<CommandResult> {
    if fetched {
        writeln!(out, "Fetched {}", name)?;
        Ok(CommandResult::success())
    } else {
        writeln!(out, "{} not found remotely", name)?;
        Ok(CommandResult::failure(1))
    }
}
