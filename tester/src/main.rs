use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

mod local;
mod remote;

#[derive(Parser, Debug)]
#[command(author, version, about = "Smoke tests for the contacts service")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every scenario in-process over the in-memory backends.
    Local,

    /// Run the sign up / add / delete scenario against a running server.
    Remote {
        #[arg(long, default_value = "http://127.0.0.1:1111")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    match args.command {
        Command::Local => local::run().await,
        Command::Remote { url } => remote::run(&url).await,
    }
}
