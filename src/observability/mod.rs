//! Observability module
//!
//! Logging, metrics, and the structured change journal.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventEmitter, TrackerEvent};
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
