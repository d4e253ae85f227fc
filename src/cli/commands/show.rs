//! `show`: print an encounter's current grouping

use std::sync::Arc;

use crate::cli::args::ShowArgs;
use crate::cli::render::render;
use crate::config::TrackerConfig;
use crate::error::PhaseKeeperError;
use crate::session::EncounterFile;
use crate::tracker::PhaseTracker;

/// Loads the encounter and prints its phase grouping and engagements.
///
/// # Errors
///
/// Returns an error if the encounter file cannot be loaded.
pub fn run(args: &ShowArgs) -> Result<(), PhaseKeeperError> {
    let (encounter, store) = EncounterFile::load(&args.encounter)?.into_session();
    let tracker = PhaseTracker::new(encounter, Arc::new(store), TrackerConfig::default());

    let text = render(
        args.format,
        tracker.encounter(),
        &tracker.group_by_phase(),
        &tracker.engaged_groups(),
    )?;
    print!("{text}");
    Ok(())
}
