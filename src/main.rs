use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use git_fastcdc::areas::repository::Repository;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives
const LOG_ENV: &str = "GIT_FASTCDC_LOG";

#[derive(Parser)]
#[command(
    name = "git-fastcdc",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Content-defined chunking filter for git",
    long_about = "Splits large files into content-defined chunks on check-in and \
    reassembles them on checkout. Chunks are stored as ordinary git blobs, so identical \
    chunks across files and revisions are stored once.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "process",
        about = "Run the long-running filter process",
        long_about = "Speaks git's long-running filter protocol over stdin and stdout. \
        Git starts this command itself once the filter is installed."
    )]
    Process,
    #[command(
        name = "update",
        about = "Reconcile the chunk index with the working tree",
        long_about = "Collects the chunks referenced by every filtered file and records the ones \
        the index does not know yet."
    )]
    Update {
        #[arg(short, long, help = "Record every referenced chunk again")]
        force: bool,
        #[arg(
            short,
            long,
            help = "Rebuild the index from scratch when it holds chunks nothing references"
        )]
        prune: bool,
    },
    #[command(name = "install", about = "Install the filter in the current repository")]
    Install,
    #[command(name = "remove", about = "Remove the filter from the current repository")]
    Remove,
    #[command(
        name = "ondisk",
        about = "Buffer files on disk instead of in memory while cleaning"
    )]
    Ondisk {
        #[arg(index = 1, value_enum)]
        switch: Switch,
    },
    #[command(name = "track", about = "Route files matching the patterns through the filter")]
    Track {
        #[arg(index = 1, required = true, help = "Attribute patterns, e.g. '*.psd'")]
        patterns: Vec<String>,
    },
}

fn main() -> Result<()> {
    // stdout carries the filter protocol; logs go to stderr only
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let pwd = std::env::current_dir()?;
    let writer: Box<dyn std::io::Write> = match cli.command {
        Commands::Process => Box::new(std::io::sink()),
        _ => Box::new(std::io::stdout()),
    };
    let repository = Repository::discover(&pwd, writer)?;
    std::env::set_current_dir(repository.path())?;

    match &cli.command {
        Commands::Process => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            repository.process(stdin.lock(), stdout.lock())?;
        }
        Commands::Update { force, prune } => {
            repository.update(*force, *prune)?;
        }
        Commands::Install => repository.install()?,
        Commands::Remove => repository.remove()?,
        Commands::Ondisk { switch } => repository.ondisk(matches!(switch, Switch::On))?,
        Commands::Track { patterns } => {
            repository.track(patterns)?;
        }
    }

    Ok(())
}
