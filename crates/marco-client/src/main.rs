use clap::Parser;
use marco_client::{CommandRangeConverter, HttpCompatibilityService, MavenInvoker, PomRewriter};
use marco_core::{LocalRepository, MarcoConfig, MavenRepository, VersionSource};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// POM Expander
#[derive(Parser, Debug)]
#[command(name = "marco-client", version, about)]
struct Cli {
    /// /path/to/pom/to/read/from
    read_from: PathBuf,

    /// /path/to/write/new/pom/to
    write_to: PathBuf,

    /// /path/to/m2/repository
    m2_path: PathBuf,

    /// Redo already expanded POMs
    #[arg(long = "override")]
    override_existing: bool,

    /// Use the local Maven repository for version lists
    #[arg(long = "use_local")]
    use_local: bool,

    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// JSON configuration file (defaults to $MARCO_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = MarcoConfig::load(cli.config.as_deref()).await?;

    let read_from = tokio::fs::canonicalize(&cli.read_from).await?;
    let write_to = absolute_sibling(&cli.write_to).await?;
    let m2_path = tokio::fs::canonicalize(&cli.m2_path).await?;

    if !cli.yes {
        let prompt = format!(
            "Performing POM expansion on {}, writing to {}, using m2_path={}",
            read_from.display(),
            write_to.display(),
            m2_path.display()
        );
        if !confirm(&prompt).await? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let versions: Arc<dyn VersionSource> = if cli.use_local {
        Arc::new(LocalRepository::new(&m2_path))
    } else {
        Arc::new(MavenRepository::new(&config.repository_url))
    };
    let maven = Arc::new(MavenInvoker::new(&config.maven));
    let rewriter = PomRewriter::new(
        Arc::new(HttpCompatibilityService::new(&config.server_url)),
        versions,
        Arc::new(CommandRangeConverter::new(config.range_converter.clone())),
        maven.clone(),
        maven,
        &m2_path,
    )
    .with_override(cli.override_existing)
    .with_injection_rounds(config.rewrite.injection_rounds);

    let summary = rewriter.expand_and_rewrite(&read_from, &write_to).await?;
    println!(
        "Made {} expansions, and {} replacements",
        summary.injected, summary.substituted
    );
    Ok(())
}

/// Absolute form of a path that may not exist yet; its directory must.
async fn absolute_sibling(path: &Path) -> std::io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    Ok(tokio::fs::canonicalize(dir).await?.join(file_name))
}

async fn confirm(prompt: &str) -> std::io::Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{prompt}\nConfirm (y/n)?: ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut answer).await?;
    Ok(answer.trim() == "y")
}
