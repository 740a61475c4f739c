use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gitea_archiver::app::App;
use gitea_archiver::error::ArchiverError;
use gitea_archiver::gitea::GiteaHttpClient;
use gitea_archiver::lock::RunLock;
use gitea_archiver::output::{JsonOutput, OutputMode, TextOutput, print_archive_summary};
use gitea_archiver::store::Store;

#[derive(Parser)]
#[command(name = "gitea-archiver")]
#[command(about = "Downloads per-branch zip archives of all Gitea repositories for a user")]
#[command(version, author)]
struct Cli {
    /// Base URL of the Gitea instance
    #[arg(long)]
    url: String,

    /// Gitea access token
    #[arg(long)]
    token: String,

    /// Archive destination directory (created if absent)
    #[arg(long)]
    dest: Utf8PathBuf,

    /// Clear a lock marker left behind by a crashed run before starting
    #[arg(long)]
    break_locks: bool,

    /// Print the final result as JSON instead of progress lines
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(archiver) = report.downcast_ref::<ArchiverError>() {
            return ExitCode::from(map_exit_code(archiver));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ArchiverError) -> u8 {
    match error {
        ArchiverError::LockContention(_) => 2,
        ArchiverError::GiteaHttp(_)
        | ArchiverError::GiteaStatus { .. }
        | ArchiverError::GiteaDecode(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let store = Store::new(cli.dest);
    if cli.break_locks {
        RunLock::new(store.lock_path()).force_break().into_diagnostic()?;
    }

    let client = GiteaHttpClient::new(&cli.url, &cli.token).into_diagnostic()?;
    let app = App::new(store, client);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.archive(&JsonOutput).into_diagnostic()?;
            JsonOutput::print_archive(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let result = app.archive(&TextOutput).into_diagnostic()?;
            print_archive_summary(&result);
        }
    }
    Ok(())
}
