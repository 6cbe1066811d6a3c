use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Repository analysis for AI coding assistants
#[derive(Parser, Debug)]
#[command(
    name = "argus",
    about = "Analyze a repository and generate context files for AI coding assistants",
    version,
    long_about = "argus scans a repository for its languages, frameworks, commands, conventions, \
                  endpoints and architecture, then writes context files for Claude, Cursor, \
                  Copilot and Continue."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose output (debug logging)")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Write a default .argus.yaml",
        long_about = "Writes the default configuration file into the repository.\n\n\
                      Examples:\n  \
                      argus init\n  \
                      argus init /path/to/repo --force"
    )]
    Init(InitArgs),

    #[command(
        about = "Analyze a repository and generate context files",
        long_about = "Runs the full analysis and writes the selected context files.\n\n\
                      Examples:\n  \
                      argus scan\n  \
                      argus scan /path/to/repo --format all\n  \
                      argus scan --format claude,cursor --output ./out\n  \
                      argus scan --dry-run --verbose"
    )]
    Scan(ScanArgs),

    #[command(
        about = "Regenerate context files from .argus.yaml",
        long_about = "Re-runs the analysis and regenerates every format listed in the \
                      configuration file. Requires `argus init` first.\n\n\
                      Examples:\n  \
                      argus sync\n  \
                      argus sync /path/to/repo --dry-run"
    )]
    Sync(SyncArgs),

    #[command(about = "Print version information")]
    Version,
}

#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    #[arg(value_name = "PATH", help = "Path to repository (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(long, help = "Overwrite an existing configuration file")]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[arg(value_name = "PATH", help = "Path to repository (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Directory to write files into (defaults to the repository)"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_name = "FORMAT",
        value_delimiter = ',',
        help = "Output formats: claude, claude-code, cursor, copilot, continue, json or all"
    )]
    pub format: Vec<String>,

    #[arg(long, help = "Print the files that would be written without writing them")]
    pub dry_run: bool,

    #[arg(long, help = "Enrich the analysis with AI insights")]
    pub ai: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    #[arg(value_name = "PATH", help = "Path to repository (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(long, help = "Print the files that would be written without writing them")]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_scan_args() {
        let args = CliArgs::parse_from(["argus", "scan"]);
        match args.command {
            Commands::Scan(scan) => {
                assert!(scan.path.is_none());
                assert!(scan.output.is_none());
                assert!(scan.format.is_empty());
                assert!(!scan.dry_run);
                assert!(!scan.ai);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_scan_with_options() {
        let args = CliArgs::parse_from([
            "argus",
            "scan",
            "/tmp/repo",
            "--format",
            "claude,cursor",
            "-f",
            "json",
            "--output",
            "out",
            "--dry-run",
            "--ai",
            "--verbose",
        ]);
        assert!(args.verbose);
        match args.command {
            Commands::Scan(scan) => {
                assert_eq!(scan.path, Some(PathBuf::from("/tmp/repo")));
                assert_eq!(scan.format, vec!["claude", "cursor", "json"]);
                assert_eq!(scan.output, Some(PathBuf::from("out")));
                assert!(scan.dry_run);
                assert!(scan.ai);
            }
            _ => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_init_force() {
        let args = CliArgs::parse_from(["argus", "init", ".", "--force"]);
        match args.command {
            Commands::Init(init) => {
                assert_eq!(init.path, Some(PathBuf::from(".")));
                assert!(init.force);
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_sync_dry_run() {
        let args = CliArgs::parse_from(["argus", "sync", "--dry-run"]);
        assert!(matches!(args.command, Commands::Sync(SyncArgs { dry_run: true, .. })));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(CliArgs::try_parse_from(["argus", "-q", "-v", "scan"]).is_err());
    }

    #[test]
    fn test_log_level_flag() {
        let args = CliArgs::parse_from(["argus", "--log-level", "debug", "version"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
        assert!(matches!(args.command, Commands::Version));
    }
}
