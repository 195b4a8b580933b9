//! Kiln CLI: the command-line interface for the compiled-kernel cache.
//!
//! Provides `kiln build` to compile a kernel through the cache, `kiln verify`
//! to check whether a cached binary is still valid, `kiln inspect` to show a
//! cache entry, and `kiln fingerprint` to fingerprint a file.

#![warn(missing_docs)]

mod backend;
mod build;
mod inspect;
mod project;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Kiln: a compiled-kernel cache.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln compiled-kernel cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `kiln.toml` configuration file or its directory.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a kernel, reusing the cached binary when it is still valid.
    Build(BuildArgs),
    /// Check whether the cached binary for a kernel is still valid.
    Verify(VerifyArgs),
    /// Show the contents of a cache entry.
    Inspect(InspectArgs),
    /// Print the fingerprint of a file.
    Fingerprint {
        /// File to fingerprint.
        file: PathBuf,
    },
}

/// Arguments for the `kiln build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Kernel source file.
    pub source: PathBuf,

    /// Compile options (default: `compiler.options` from `kiln.toml`).
    #[arg(long, allow_hyphen_values = true)]
    pub options: Option<String>,

    /// Cache name (default: source file name without extension).
    #[arg(long)]
    pub name: Option<String>,

    /// Copy the resulting binary to this path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `kiln verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Kernel source file.
    pub source: PathBuf,

    /// Compile options (default: `compiler.options` from `kiln.toml`).
    #[arg(long, allow_hyphen_values = true)]
    pub options: Option<String>,

    /// Cache name (default: source file name without extension).
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for the `kiln inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Cache name, or a kernel source path to derive it from.
    pub name: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Verify(ref args) => build::verify(args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Fingerprint { ref file } => inspect::fingerprint(file),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Default log filter for the given verbosity flags.
fn default_filter(global: &GlobalArgs) -> &'static str {
    if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the flags.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_build_default() {
        let cli = Cli::parse_from(["kiln", "build", "kernels/blur.cl"]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(args.source, PathBuf::from("kernels/blur.cl"));
                assert!(args.options.is_none());
                assert!(args.name.is_none());
                assert!(args.output.is_none());
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_build_with_args() {
        let cli = Cli::parse_from([
            "kiln",
            "build",
            "blur.cl",
            "--options",
            "-cl-fast-relaxed-math -DRADIUS=3",
            "--name",
            "blur_r3",
            "--output",
            "out/blur.bin",
        ]);
        match cli.command {
            Command::Build(ref args) => {
                assert_eq!(
                    args.options.as_deref(),
                    Some("-cl-fast-relaxed-math -DRADIUS=3")
                );
                assert_eq!(args.name.as_deref(), Some("blur_r3"));
                assert_eq!(args.output, Some(PathBuf::from("out/blur.bin")));
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::parse_from(["kiln", "verify", "blur.cl", "--options", "-O2"]);
        match cli.command {
            Command::Verify(ref args) => {
                assert_eq!(args.source, PathBuf::from("blur.cl"));
                assert_eq!(args.options.as_deref(), Some("-O2"));
            }
            _ => panic!("expected Verify command"),
        }
    }

    #[test]
    fn parse_inspect_json() {
        let cli = Cli::parse_from(["kiln", "inspect", "shader", "--format", "json"]);
        match cli.command {
            Command::Inspect(ref args) => {
                assert_eq!(args.name, "shader");
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Inspect command"),
        }
    }

    #[test]
    fn parse_inspect_default_format() {
        let cli = Cli::parse_from(["kiln", "inspect", "shader"]);
        match cli.command {
            Command::Inspect(ref args) => assert_eq!(args.format, ReportFormat::Text),
            _ => panic!("expected Inspect command"),
        }
    }

    #[test]
    fn parse_fingerprint() {
        let cli = Cli::parse_from(["kiln", "fingerprint", "shader.bin"]);
        match cli.command {
            Command::Fingerprint { file } => assert_eq!(file, PathBuf::from("shader.bin")),
            _ => panic!("expected Fingerprint command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["kiln", "--quiet", "--config", "/p/kiln.toml", "inspect", "a"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("/p/kiln.toml"));
    }

    #[test]
    fn filter_follows_flags() {
        let mut global = GlobalArgs {
            quiet: false,
            verbose: false,
            config: None,
        };
        assert_eq!(default_filter(&global), "warn");
        global.quiet = true;
        assert_eq!(default_filter(&global), "error");
        global.verbose = true;
        assert_eq!(default_filter(&global), "debug");
    }
}
