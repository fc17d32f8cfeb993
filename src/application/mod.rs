//! Application layer - Use cases that coordinate the registry, downloader and
//! installer on behalf of the CLI layer.

mod install;

pub use install::{InstallOrchestrator, InstallOutcome, ProgressSink};

#[cfg(test)]
pub use install::MockProgressSink;
