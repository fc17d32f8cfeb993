use log::debug;
use std::path::Path;

use crate::application::ProgressSink;
use crate::error::{InstallError, Stage, error_chain};
use crate::package::{PackageDescriptor, Rejection};

/// Prints one line per stage and per result, right-aligned verbs like cargo.
pub struct ConsoleSink;

impl ConsoleSink {
    fn verb(stage: Stage) -> &'static str {
        match stage {
            Stage::Metadata => "resolving",
            Stage::Download => "downloading",
            Stage::Extraction => "extracting",
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn on_start(&self, name: &str, stage: Stage) {
        println!("{:>12} {}", Self::verb(stage), name);
    }

    fn on_finish(&self, name: &str, stage: Stage) {
        debug!("{} stage finished for {}", stage, name);
    }

    fn on_installed(&self, descriptor: &PackageDescriptor, path: &Path) {
        println!(
            "{:>12} {} {} to {}",
            "installed",
            descriptor.display_name(),
            descriptor.version.as_deref().unwrap_or_default(),
            path.display()
        );
    }

    fn on_rejected(&self, name: &str, reason: &Rejection) {
        eprintln!("{:>12} {}: {}", "rejected", name, reason);
    }

    fn on_failed(&self, name: &str, stage: Stage, error: &InstallError) {
        eprintln!(
            "{:>12} {} during {}: {}",
            "failed",
            name,
            stage,
            error_chain(error)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_verbs() {
        assert_eq!(ConsoleSink::verb(Stage::Metadata), "resolving");
        assert_eq!(ConsoleSink::verb(Stage::Download), "downloading");
        assert_eq!(ConsoleSink::verb(Stage::Extraction), "extracting");
    }
}
