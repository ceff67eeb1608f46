use clap::{Args, Parser, Subcommand};
use marco_core::{Gav, LocalRepository, MarcoConfig, MavenRepository, VersionSource};
use marco_server::{
    CommandOracle, CompatibilityResult, CompatibilitySearch, CompatibilityStore, SearchLimits,
    SearchMode, candidate_versions, service,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Compatibility Mapper
#[derive(Parser, Debug)]
#[command(name = "marco-server", version, about)]
struct Cli {
    /// JSON configuration file (defaults to $MARCO_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Compatibility store file, overriding the configuration
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the compatible versions of an artifact version
    Search(SearchArgs),
    /// Serve stored compatibilities over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// group id
    #[arg(short = 'g', long = "group_id")]
    group_id: String,

    /// artifact id
    #[arg(short = 'a', long = "artifact_id")]
    artifact_id: String,

    /// version id
    #[arg(short = 'v', long = "version_id")]
    version: String,

    /// maximum number of downgrade/upgrade candidates to consider
    #[arg(long = "max_candidates")]
    max_candidates: Option<usize>,

    /// stop after the given number of consecutive failures
    #[arg(long = "stop_after_n")]
    stop_after_n: Option<usize>,

    /// use the local Maven repository for version lists
    #[arg(long = "use_local")]
    use_local: bool,

    /// only run static checks (implies --trail)
    #[arg(long = "static_only")]
    static_only: bool,

    /// print every classification instead of storing the compatible set
    #[arg(long)]
    trail: bool,

    /// do not ask for confirmation
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: SocketAddr,
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
    let store = CompatibilityStore::new(cli.store.unwrap_or_else(|| config.compatibility_store.clone()));

    match cli.command {
        Command::Search(args) => search(&config, &store, args).await,
        Command::Serve(args) => Ok(service::serve(Arc::new(store), args.addr).await?),
    }
}

async fn search(
    config: &MarcoConfig,
    store: &CompatibilityStore,
    args: SearchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = Gav::new(args.group_id, args.artifact_id, args.version);

    let source: Box<dyn VersionSource> = if args.use_local {
        Box::new(LocalRepository::new(&config.local_repository))
    } else {
        Box::new(MavenRepository::new(&config.repository_url))
    };
    let candidates = candidate_versions(source.as_ref(), &base, args.max_candidates).await?;

    if !args.yes {
        let prompt = format!("Calculating compatibility set for {base} with candidates: {candidates:?}");
        if !confirm(&prompt).await? {
            println!("Aborted.");
            return Ok(());
        }
    }

    let oracle = Arc::new(CommandOracle::from_config(&config.oracle));
    let limits = SearchLimits {
        max_consecutive_failures: args.stop_after_n,
        index_limit: config.search.index_limit,
    };
    let mode = if args.static_only {
        SearchMode::StaticOnly
    } else {
        SearchMode::Full
    };
    let search = CompatibilitySearch::new(oracle, limits).with_mode(mode);

    if args.trail || args.static_only {
        let trail = search.compute_trail(&base, &candidates).await?;
        for result in &trail {
            println!("{}", describe(result));
        }
    } else {
        let compatible = search.compute_set(store, &base, &candidates).await?;
        println!("Result:\n {base} has compatible versions {compatible:?} out of candidate versions {candidates:?}");
    }
    Ok(())
}

fn describe(result: &CompatibilityResult) -> String {
    let dynamic = match result.dynamically_compatible {
        Some(true) => "true",
        Some(false) => "false",
        None => "-",
    };
    let error = result.error.map(|tag| tag.as_str()).unwrap_or("");
    format!(
        "{} -> {}\tstatic={}\tdynamic={}\t{}",
        result.base, result.candidate, result.statically_compatible, dynamic, error
    )
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
