//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandContext`] carrying resolved settings and the cache
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::io::Write;

use super::fetch::FetchCommand;
use super::index::IndexCommand;
use super::load::LoadCommand;
use super::metadata::MetadataCommand;
use super::prune::PruneCommand;
use super::status::StatusCommand;
use crate::cache::ArtifactCache;
use crate::cli::args::Commands;
use crate::config::{Paths, Settings};
use crate::error::Result;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command, writing user-facing output to `out`.
    fn execute(&self, ctx: &CommandContext, out: &mut dyn Write) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Everything a command needs: settings, the paths derived from them, and
/// the cache.
pub struct CommandContext {
    settings: Settings,
    paths: Paths,
    cache: ArtifactCache,
}

impl CommandContext {
    /// Context reading the HTTP bucket named in `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let cache = ArtifactCache::http(&settings)?;
        Ok(Self::with_cache(settings, cache))
    }

    /// Context over an explicit cache.
    pub fn with_cache(settings: Settings, cache: ArtifactCache) -> Self {
        let paths = settings.paths();
        Self {
            settings,
            paths,
            cache,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    ctx: CommandContext,
}

impl CommandDispatcher {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, command: &Commands, out: &mut dyn Write) -> Result<CommandResult> {
        match command {
            Commands::Index(args) => IndexCommand::new(args.clone()).execute(&self.ctx, out),
            Commands::Fetch(args) => FetchCommand::new(args.clone()).execute(&self.ctx, out),
            Commands::Load(args) => LoadCommand::new(args.clone()).execute(&self.ctx, out),
            Commands::Status(args) => StatusCommand::new(args.clone()).execute(&self.ctx, out),
            Commands::Prune(args) => PruneCommand::new(args.clone()).execute(&self.ctx, out),
            Commands::Metadata(args) => {
                MetadataCommand::new(args.clone()).execute(&self.ctx, out)
            }
        }
    }
}

/// Context over an in-memory bucket rooted at `local_root`.
#[cfg(test)]
pub(crate) fn memory_context(
    local_root: &std::path::Path,
    remote: crate::remote::MemoryRemote,
) -> CommandContext {
    let settings = Settings {
        local_root: Some(local_root.to_path_buf()),
        remote_root: "memory://bucket/".to_string(),
        ..Settings::default()
    };
    CommandContext::with_cache(settings, ArtifactCache::new(remote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Cli;
    use crate::remote::MemoryRemote;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn command_result_codes() {
        assert_eq!(CommandResult::success().exit_code, 0);
        let failed = CommandResult::failure(2);
        assert!(!failed.success);
        assert_eq!(failed.exit_code, 2);
    }

    #[test]
    fn dispatches_to_the_matching_command() {
        let temp = TempDir::new().unwrap();
        let dispatcher = CommandDispatcher::new(memory_context(temp.path(), MemoryRemote::new()));
        let cli = Cli::try_parse_from(["lcadata", "prune", "A", "--tool", "flowsa"]).unwrap();

        let mut out = Vec::new();
        let result = dispatcher.dispatch(&cli.command, &mut out).unwrap();

        assert!(result.success);
        assert!(String::from_utf8(out).unwrap().contains("Removed 0"));
        assert_eq!(dispatcher.context().paths().local_root(), temp.path());
    }
}
