//! `lcadata load`: read the newest local payload and print its head.

use arrow::util::pretty::pretty_format_batches;
use std::io::Write;

use super::dispatcher::{Command, CommandContext, CommandResult};
use crate::cache::SubdirRules;
use crate::cli::args::LoadArgs;
use crate::error::Result;

/// The load command implementation.
pub struct LoadCommand {
    args: LoadArgs,
}

impl LoadCommand {
    pub fn new(args: LoadArgs) -> Self {
        Self { args }
    }
}

impl Command for LoadCommand {
    fn execute(&self, ctx: &CommandContext, out: &mut dyn Write) -> Result<CommandResult> {
        let descriptor = self.args.dataset.descriptor();
        let loaded = if self.args.fetch {
            ctx.cache()
                .load_or_fetch(&descriptor, ctx.paths(), &SubdirRules::new())?
        } else {
            ctx.cache().load(&descriptor, ctx.paths())?
        };

        let Some(table) = loaded else {
            writeln!(out, "No local copy of {}", descriptor.name)?;
            return Ok(CommandResult::failure(1));
        };

        writeln!(
            out,
            "{}: {} rows x {} columns",
            descriptor.name,
            table.num_rows(),
            table.num_columns()
        )?;
        let head = table.slice(0, self.args.head.min(table.num_rows()));
        let rendered = pretty_format_batches(&[head]).map_err(anyhow::Error::from)?;
        writeln!(out, "{}", rendered)?;
        Ok(CommandResult::success())
    }
}
