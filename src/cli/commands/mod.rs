//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod apply;
pub mod completions;
pub mod show;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::PhaseKeeperError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), PhaseKeeperError> {
    match cli.command {
        Commands::Show(args) => show::run(&args),
        Commands::Apply(args) => apply::run(&args).await,
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
