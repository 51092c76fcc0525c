mod commands;
mod config;
mod corpus;
mod diagnostics;
mod error;
mod frontmatter;
mod grammar;
mod headings;
mod info;
mod links;
mod namespace;
mod pipeline;
mod probe;
mod report;
mod routes;
mod search;
mod types;
mod validator;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{CheckArgs, OutputFormat};
use crate::pipeline::CheckOptions;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "DOCLINKS_LOG";

/// Exit code for fatal errors.
const EXIT_FATAL: u8 = 2;

#[derive(Parser)]
#[command(
    name = "doclinks",
    version,
    about = "Link and heading integrity checker for versioned markdown documentation"
)]
struct Cli {
    /// Defaults to `check`.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate heading structure and internal links
    Check(CheckCli),
    /// Print the heading outline and fragments of one document
    Fragments {
        /// Document path, relative to the project root
        file: PathBuf,
    },
    /// Print a reference of link forms, commands, and current state
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage versioned namespaces in .doclinks.toml
    Namespace {
        #[command(subcommand)]
        action: NamespaceAction,
    },
    /// Print the route table of every namespace
    Routes {
        /// Only this namespace
        #[arg(long)]
        namespace: Option<String>,
    },
    /// Run check, then re-run whenever documentation changes
    Watch {
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Args, Default)]
struct CheckCli {
    /// Also probe external http/https links
    #[arg(long)]
    external: bool,
    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Check heading structure only
    #[arg(long, conflicts_with = "links_only")]
    headings_only: bool,
    /// Check links only
    #[arg(long)]
    links_only: bool,
    /// Print counters after the report
    #[arg(long)]
    stats: bool,
}

#[derive(Subcommand)]
enum NamespaceAction {
    /// Add a namespace
    Add {
        /// Namespace name, e.g. `1.0`
        name: String,
        /// Root directory, relative to the project root
        path: String,
        /// Route prefix that selects the namespace (default `/<name>`)
        #[arg(long)]
        prefix: Option<String>,
    },
    /// List configured namespaces
    List,
    /// Remove a namespace
    Remove {
        /// Namespace name
        name: String,
    },
}

impl CheckCli {
    /// Convert parsed flags into command arguments.
    fn into_args(self) -> CheckArgs {
        return CheckArgs {
            format: self.format,
            options: CheckOptions {
                external: self.external,
                headings_only: self.headings_only,
                links_only: self.links_only,
            },
            stats: self.stats,
        };
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or_else(|| return Commands::Check(CheckCli::default())) {
        Commands::Check(check) => commands::check(&check.into_args()),
        Commands::Fragments { file } => commands::fragments(&file),
        Commands::Info { json } => {
            info::run(json);
            Ok(ExitCode::SUCCESS)
        },
        Commands::Namespace { action } => run_namespace(action),
        Commands::Routes { namespace } => commands::routes(namespace.as_deref()),
        Commands::Watch { format } => watch::run(&CheckArgs {
            format,
            ..CheckArgs::default()
        }),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(EXIT_FATAL)
        },
    };
}

/// Log to stderr, filtered by `DOCLINKS_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatch a `namespace` subcommand.
///
/// # Errors
///
/// Returns errors from config loading or editing.
fn run_namespace(action: NamespaceAction) -> Result<ExitCode, error::Error> {
    match action {
        NamespaceAction::Add { name, path, prefix } => namespace::cmd_add(&name, &path, prefix.as_deref())?,
        NamespaceAction::List => namespace::cmd_list()?,
        NamespaceAction::Remove { name } => namespace::cmd_remove(&name)?,
    }
    return Ok(ExitCode::SUCCESS);
}
