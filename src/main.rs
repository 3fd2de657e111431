mod commands;
mod config;
mod context;
mod error;
mod executor;
mod import;
mod output;
mod traits;

use clap::Parser;
use commands::ImportCommand;
use context::Context;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tfimport")]
#[command(about = "Bulk-import existing cloud resources into Terraform state, resumably and in parallel", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    import: ImportCommand,

    /// Show debug logs on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "tfimport=debug" } else { "tfimport=warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::new();

    if let Err(err) = cli.import.execute(&ctx) {
        tracing::error!(error = %format!("{:#}", err), "run aborted");
        ctx.output.error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
