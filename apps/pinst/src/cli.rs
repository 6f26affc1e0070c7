//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use pinst_ops::InstallRequest;
use pinst_types::ColorChoice;
use std::path::PathBuf;

/// pinst - install one pinned command-line tool
#[derive(Parser)]
#[command(name = "pinst")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve, fetch, verify and install a single command-line tool")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write debug logs to the logs directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Where the release comes from
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// `latest` or a release tag such as v1.0.0
    #[arg(long = "version", value_name = "TAG")]
    pub version: Option<String>,

    /// Archive URL template ({version}, {tag}, {name})
    #[arg(long, value_name = "TEMPLATE")]
    pub url: Option<String>,

    /// Expected archive digest (hex, sha256:hex or blake3:hex)
    #[arg(long, value_name = "HEX")]
    pub checksum: Option<String>,

    /// Formula file to use instead of the formula directory
    #[arg(long, value_name = "PATH")]
    pub formula: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Install a tool
    #[command(alias = "i")]
    Install {
        /// Tool identifier
        identifier: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Destination directory
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,

        /// Per-attempt timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Retries after the first attempt
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Executable to install from the archive
        #[arg(long, value_name = "NAME")]
        entry: Option<String>,

        /// Installed file name
        #[arg(long, value_name = "NAME")]
        bin: Option<String>,

        /// Skip the post-install smoke test
        #[arg(long)]
        no_test: bool,
    },

    /// Show which release would be installed, without downloading it
    Resolve {
        /// Tool identifier
        identifier: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show formula details
    Info {
        /// Tool identifier
        identifier: String,

        /// Formula file to use instead of the formula directory
        #[arg(long, value_name = "PATH")]
        formula: Option<PathBuf>,
    },
}

impl Commands {
    /// Get command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Install { .. } => "install",
            Commands::Resolve { .. } => "resolve",
            Commands::Info { .. } => "info",
        }
    }
}

impl SourceArgs {
    /// Start a request for `identifier` from these arguments
    pub fn to_request(&self, identifier: &str) -> InstallRequest {
        InstallRequest {
            version: self.version.clone(),
            url: self.url.clone(),
            checksum: self.checksum.clone(),
            formula: self.formula.clone(),
            ..InstallRequest::new(identifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["pinst", "install", "slack"]);
        assert!(matches!(cli.command, Commands::Install { .. }));
        assert_eq!(cli.command.name(), "install");

        let cli = Cli::parse_from([
            "pinst",
            "install",
            "demo",
            "--version",
            "v1.0.0",
            "--checksum",
            "deadbeef",
            "--dest",
            "/tmp/bin",
            "--retries",
            "0",
            "--no-test",
        ]);
        let Commands::Install {
            identifier,
            source,
            dest,
            retries,
            no_test,
            ..
        } = cli.command
        else {
            panic!("Expected Install command");
        };
        assert_eq!(identifier, "demo");
        assert_eq!(source.version.as_deref(), Some("v1.0.0"));
        assert_eq!(source.checksum.as_deref(), Some("deadbeef"));
        assert_eq!(dest, Some(PathBuf::from("/tmp/bin")));
        assert_eq!(retries, Some(0));
        assert!(no_test);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["pinst", "--json", "--debug", "info", "slack"]);
        assert!(cli.global.json);
        assert!(cli.global.debug);
        assert!(matches!(cli.command, Commands::Info { .. }));

        let cli = Cli::parse_from(["pinst", "resolve", "slack", "--color", "never"]);
        assert_eq!(cli.global.color, Some(ColorChoice::Never));
    }

    #[test]
    fn test_install_alias() {
        let cli = Cli::parse_from(["pinst", "i", "slack"]);
        assert!(matches!(cli.command, Commands::Install { .. }));
    }

    #[test]
    fn test_source_to_request() {
        let source = SourceArgs {
            url: Some("https://example.com/{tag}.tar.gz".to_string()),
            ..SourceArgs::default()
        };
        let request = source.to_request("demo");
        assert_eq!(request.identifier, "demo");
        assert!(request.version.is_none());
        assert!(!request.skip_smoke_test);
    }
}
