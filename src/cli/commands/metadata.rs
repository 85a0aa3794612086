//! `lcadata metadata`: print a dataset's metadata sidecar.

use std::io::Write;

use super::dispatcher::{Command, CommandContext, CommandResult};
use crate::cli::args::MetadataArgs;
use crate::error::Result;

/// The metadata command implementation.
pub struct MetadataCommand {
    args: MetadataArgs,
}

impl MetadataCommand {
    pub fn new(args: MetadataArgs) -> Self {
        Self { args }
    }
}

impl Command for MetadataCommand {
    fn execute(&self, ctx: &CommandContext, out: &mut dyn Write) -> Result<CommandResult> {
        let descriptor = self.args.dataset.descriptor();
        match ctx
            .cache()
            .read_metadata(ctx.paths(), &descriptor, self.args.exact)?
        {
            Some(meta) => {
                let json = serde_json::to_string_pretty(&meta).map_err(anyhow::Error::from)?;
                writeln!(out, "{}", json)?;
                Ok(CommandResult::success())
            }
            None => {
                writeln!(out, "No metadata for {}", descriptor.name)?;
                Ok(CommandResult::failure(1))
            }
        }
    }
}
