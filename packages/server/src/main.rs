use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use docserve_server::{DocServer, HttpServer, ServerConfig, ServerError};
use tracing_subscriber::EnvFilter;

/// docserve - serve documents, templates and data from a directory
#[derive(Parser, Debug)]
#[command(name = "docserve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document root
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Address to listen on [default: from config, else 127.0.0.1:8080]
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Configuration file [default: <root>/.conf/config.json]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve one tree per host name
    #[arg(long)]
    multi: bool,

    /// Maximum number of live sessions
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Session idle timeout in minutes
    #[arg(long)]
    session_timeout: Option<u64>,

    /// Only log warnings and errors
    #[arg(long, short)]
    quiet: bool,
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(args: &Args) -> Result<ServerConfig, ServerError> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| ServerConfig::default_path(&args.root));
    let mut config = ServerConfig::load(&path)?;

    if args.multi {
        config.multi_host = true;
    }
    if let Some(max) = args.max_sessions {
        config.max_sessions = max;
    }
    if let Some(minutes) = args.session_timeout {
        config.session_timeout_minutes = minutes;
    }
    if let Some(addr) = args.listen {
        config.listen = addr.to_string();
    }
    Ok(config)
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;
    let addr: SocketAddr = config.listen.parse()?;
    let server = DocServer::new(&args.root, config)?;
    HttpServer::new(Arc::new(server)).run(addr).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.quiet);

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
