//! `apply`: replay an action script against an encounter

use std::sync::Arc;

use tracing::info;

use crate::cli::args::ApplyArgs;
use crate::cli::render::render;
use crate::config::ConfigLoader;
use crate::error::PhaseKeeperError;
use crate::observability::{EventEmitter, init_metrics};
use crate::session::{EncounterFile, Script, run_script};
use crate::tracker::PhaseTracker;

/// Runs the script and writes or prints the resulting state.
///
/// Nothing is written to `--output` when an action fails.
///
/// # Errors
///
/// Returns an error if any input fails to load, an action fails, or the
/// output cannot be written.
pub async fn run(args: &ApplyArgs) -> Result<(), PhaseKeeperError> {
    let metrics = if args.metrics {
        Some(init_metrics()?)
    } else {
        None
    };

    let config = ConfigLoader::new().load(args.config.as_deref())?;
    let script = Script::load(&args.script)?;
    let (encounter, store) = EncounterFile::load(&args.encounter)?.into_session();

    let mut tracker = PhaseTracker::new(encounter, Arc::new(store), config);
    if let Some(path) = &args.events_file {
        let emitter = if path.as_os_str() == "-" {
            EventEmitter::stderr()
        } else {
            EventEmitter::from_file(path)?
        };
        tracker = tracker.with_events(Arc::new(emitter));
    }

    let report = run_script(&mut tracker, &script).await?;

    match &args.output {
        Some(path) => {
            EncounterFile::from_session(tracker.encounter(), tracker.store()).save(path)?;
            info!(path = %path.display(), applied = report.applied, "encounter written");
        }
        None => {
            let text = render(
                args.format,
                tracker.encounter(),
                &tracker.group_by_phase(),
                &tracker.engaged_groups(),
            )?;
            print!("{text}");
        }
    }

    if let Some(handle) = metrics {
        print!("{}", handle.render());
    }
    Ok(())
}
