//! `lcadata status`: compare the local copy with the remote index.

use std::io::Write;

use super::dispatcher::{Command, CommandContext, CommandResult};
use crate::cache::find_local;
use crate::cli::args::{subdir_rules, StatusArgs};
use crate::error::Result;

/// The status command implementation.
pub struct StatusCommand {
    args: StatusArgs,
}

impl StatusCommand {
    pub fn new(args: StatusArgs) -> Self {
        Self { args }
    }
}

impl Command for StatusCommand {
    fn execute(&self, ctx: &CommandContext, out: &mut dyn Write) -> Result<CommandResult> {
        let descriptor = self.args.dataset.descriptor();
        let rules = subdir_rules(&self.args.routes);
        let state = ctx.cache().status(&descriptor, ctx.paths(), &rules)?;

        writeln!(out, "{}: {}", descriptor.name, state)?;
        if let Some(path) = find_local(&descriptor, ctx.paths())? {
            writeln!(out, "  Local:  {}", path.display())?;
        }
        let group = ctx.cache().resolve_remote_group(&descriptor, ctx.paths())?;
        for file_name in &group {
            writeln!(out, "  Remote: {}", file_name)?;
        }
        Ok(CommandResult::success())
    }
}
