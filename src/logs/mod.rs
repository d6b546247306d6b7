// Logs module - Target registration, routing and rollover

mod layout;
mod manager;
mod registry;
mod rollover;
mod severity;
mod target;

pub use layout::{Layout, FALLBACK_LAYOUT};
pub use manager::{LogTargetManager, Registration};
pub use registry::{NameFilter, RoutingLayer, RoutingRule, RoutingTable, SinkRegistry};
pub use rollover::{
    archive_path, archive_timestamp, count_lines, prepare_log_file, SetupOutcome,
    ROLLOVER_LINE_THRESHOLD,
};
pub use severity::Severity;
pub use target::{FileTarget, LogRecord};
