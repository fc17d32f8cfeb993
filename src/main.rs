use anyhow::Result;
use clap::Parser;
use jsaddon::commands::{self, config::Options};
use std::path::PathBuf;

/// jsaddon - JavaScript addon installer
///
/// Fetch addon packages from an npm registry, check them against the addon
/// contract, and unpack them into the managed addon directory.
///
/// Examples:
///   jsaddon install my-addon                                # Install the latest version
///   jsaddon install https://www.npmjs.com/package/my-addon  # Same, from a package page URL
///   jsaddon check my-addon                                  # Check without installing
#[derive(Parser, Debug)]
#[command(author, version = env!("JSADDON_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Managed addon directory (defaults to ~/.jsaddon/addons; also via JSADDON_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "JSADDON_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Registry URL (defaults to https://registry.npmjs.org)
    #[arg(
        long = "registry",
        env = "JSADDON_REGISTRY",
        value_name = "URL",
        global = true
    )]
    pub registry_url: Option<String>,

    /// Directory for in-flight downloads (defaults to the user cache directory)
    #[arg(
        long = "cache-dir",
        env = "JSADDON_CACHE",
        value_name = "PATH",
        global = true
    )]
    pub cache_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install one or more addons
    Install(InstallArgs),

    /// Check whether an addon can be installed, without installing it
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Package names or npmjs.com package URLs
    #[arg(value_name = "NAME", required = true)]
    pub targets: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Package name or npmjs.com package URL
    #[arg(value_name = "NAME")]
    pub target: String,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            root: self.root.clone(),
            registry_url: self.registry_url.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = jsaddon::runtime::RealRuntime;
    let options = cli.options();

    match cli.command {
        Commands::Install(args) => commands::install(runtime, &args.targets, options).await?,
        Commands::Check(args) => commands::check(runtime, &args.target, options).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_install_parsing() {
        let cli = Cli::try_parse_from(["jsaddon", "install", "addon-a", "addon-b"]).unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.targets, vec!["addon-a", "addon-b"]);
            }
            _ => panic!("Expected Install command"),
        }
    }

    #[test]
    fn test_cli_install_requires_target() {
        let result = Cli::try_parse_from(["jsaddon", "install"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_check_parsing() {
        let cli = Cli::try_parse_from(["jsaddon", "check", "my-addon"]).unwrap();
        match cli.command {
            Commands::Check(args) => assert_eq!(args.target, "my-addon"),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_root_parsing() {
        let cli =
            Cli::try_parse_from(["jsaddon", "install", "my-addon", "--root", "/tmp"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_cli_global_options_before_subcommand() {
        let cli = Cli::try_parse_from([
            "jsaddon",
            "-r",
            "/data/addons",
            "--registry",
            "http://localhost:4873",
            "--cache-dir",
            "/data/cache",
            "check",
            "my-addon",
        ])
        .unwrap();

        let options = cli.options();
        assert_eq!(options.root, Some(PathBuf::from("/data/addons")));
        assert_eq!(options.registry_url.as_deref(), Some("http://localhost:4873"));
        assert_eq!(options.cache_dir, Some(PathBuf::from("/data/cache")));
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(["jsaddon", "my-addon"]);
        assert!(result.is_err());
    }
}
