use relaylog::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // Engine diagnostics go to stderr; RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = Cli::run() {
        eprintln!("✗ Error: {:#}", e);
        std::process::exit(1);
    }
}
