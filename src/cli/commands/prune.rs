//! `lcadata prune`: delete superseded local builds.

use std::io::Write;

use super::dispatcher::{Command, CommandContext, CommandResult};
use crate::cli::args::PruneArgs;
use crate::error::Result;

/// The prune command implementation.
pub struct PruneCommand {
    args: PruneArgs,
}

impl PruneCommand {
    pub fn new(args: PruneArgs) -> Self {
        Self { args }
    }
}

impl Command for PruneCommand {
    fn execute(&self, ctx: &CommandContext, out: &mut dyn Write) -> Result<CommandResult> {
        let descriptor = self.args.dataset.descriptor();
        let removed = ctx.cache().prune(&descriptor, ctx.paths())?;
        writeln!(out, "Removed {} older file(s) of {}", removed, descriptor.name)?;
        Ok(CommandResult::success())
    }
}
