//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`], which owns the resolved settings and the
//! artifact cache shared by every subcommand.

pub mod dispatcher;
pub mod fetch;
pub mod index;
pub mod load;
pub mod metadata;
pub mod prune;
pub mod status;

pub use dispatcher::{Command, CommandContext, CommandDispatcher, CommandResult};
