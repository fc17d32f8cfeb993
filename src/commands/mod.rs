use anyhow::{Result, bail};
use futures_util::future::join_all;
use log::debug;

use crate::{
    package::{PackageName, is_installable, rejection_reason},
    registry::DescriptorSource,
    runtime::Runtime,
};

pub mod config;
mod progress;

use config::{Config, Options};
pub use progress::ConsoleSink;

/// Install every target concurrently. Fails if any target was not installed.
#[tracing::instrument(skip(runtime, options))]
pub async fn install<R: Runtime + Clone>(
    runtime: R,
    targets: &[String],
    options: Options,
) -> Result<()> {
    let orchestrator = Config::new(runtime, options)?.into_orchestrator(ConsoleSink);
    debug!("Managed root: {:?}", orchestrator.managed_root());

    let names: Vec<String> = targets.iter().map(|t| resolve_target(t)).collect();
    let outcomes = join_all(names.iter().map(|name| orchestrator.install(name))).await;

    let not_installed = outcomes.iter().filter(|o| !o.is_installed()).count();
    if not_installed > 0 {
        bail!(
            "{} of {} addons could not be installed",
            not_installed,
            outcomes.len()
        );
    }
    Ok(())
}

/// Report whether the latest version of `target` could be installed.
#[tracing::instrument(skip(runtime, options))]
pub async fn check<R: Runtime>(runtime: R, target: &str, options: Options) -> Result<()> {
    let name: PackageName = target.parse()?;
    let config = Config::new(runtime, options)?;
    let descriptor = config.registry().fetch_descriptor(&name).await?;

    if is_installable(&descriptor) {
        println!(
            "{} {} is installable ({})",
            descriptor.display_name(),
            descriptor.version.as_deref().unwrap_or_default(),
            descriptor.addon_type.as_deref().unwrap_or_default()
        );
        return Ok(());
    }

    match rejection_reason(&descriptor) {
        Some(reason) => bail!("{} is not installable: {}", name, reason),
        None => bail!("{} is not installable", name),
    }
}

/// npmjs.com package URLs become bare names; anything else is passed through
/// so that an invalid name is reported by the install itself.
fn resolve_target(target: &str) -> String {
    match target.parse::<PackageName>() {
        Ok(name) => name.to_string(),
        Err(_) => target.to_string(),
    }
}
