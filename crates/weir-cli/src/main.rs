use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod exit_codes;
mod selector;

use cli::args::Cli;
use cli::commands::dispatch;
use weir_engine::EngineError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // -h/--help and --version are not failures.
            let code = if err.use_stderr() {
                exit_codes::FAILURE
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    // Engine operations need an elevated process; bail before touching the
    // engine at all.
    if !nix::unistd::Uid::effective().is_root() {
        eprintln!("Error: must run with elevated privileges.");
        std::process::exit(exit_codes::FAILURE);
    }

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            if err.downcast_ref::<EngineError>().is_some() {
                eprintln!("Fatal engine error: {err:#}");
            } else {
                eprintln!("Fatal error: {err:#}");
            }
            exit_codes::FAILURE
        }
    };
    std::process::exit(code);
}
