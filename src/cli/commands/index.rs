//! `lcadata index`: list and parse a remote prefix.

use std::io::Write;

use super::dispatcher::{Command, CommandContext, CommandResult};
use crate::cache::ArtifactDescriptor;
use crate::cli::args::IndexArgs;
use crate::error::Result;

/// The index command implementation.
pub struct IndexCommand {
    args: IndexArgs,
}

impl IndexCommand {
    pub fn new(args: IndexArgs) -> Self {
        Self { args }
    }
}

impl Command for IndexCommand {
    fn execute(&self, ctx: &CommandContext, out: &mut dyn Write) -> Result<CommandResult> {
        let descriptor = ArtifactDescriptor::new(&self.args.tool, "", "")
            .with_category(&self.args.category);
        let mut entries = ctx.cache().remote_index(&descriptor, ctx.paths())?;
        if let Some(prefix) = &self.args.name {
            entries.retain(|e| e.file_name.starts_with(prefix.as_str()));
        }

        if self.args.json {
            let json = serde_json::to_string_pretty(&entries).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", json)?;
            return Ok(CommandResult::success());
        }

        if entries.is_empty() {
            writeln!(
                out,
                "No entries under {}",
                ctx.paths()
                    .remote_url(&self.args.tool, &self.args.category, "")
            )?;
            return Ok(CommandResult::success());
        }

        writeln!(out, "{} entries:\n", entries.len())?;
        for entry in &entries {
            let version = if entry.version.is_empty() {
                "-"
            } else {
                entry.version.as_str()
            };
            let hash = if entry.content_hash.is_empty() {
                "-"
            } else {
                entry.content_hash.as_str()
            };
            writeln!(
                out,
                "  {}  v{}  {}  {}",
                entry.file_name,
                version,
                hash,
                entry.last_modified.format("%Y-%m-%d %H:%M:%S")
            )?;
        }
        Ok(CommandResult::success())
    }
}
