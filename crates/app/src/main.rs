//! Lieferspatz cart client

use std::process;

use lieferspatz_app::{
    cli::{self, Cli},
    observability,
};

#[tokio::main]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let cli = Cli::load().unwrap_or_else(|e| e.exit());

    if let Err(init_error) = observability::init(&cli.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialise, must use eprintln"
        )]
        {
            eprintln!("{init_error}");
        }

        process::exit(1);
    }

    if let Err(run_error) = cli::run(cli).await {
        #[expect(
            clippy::print_stderr,
            reason = "command errors are reported to the user on stderr"
        )]
        {
            eprintln!("{run_error}");
        }

        process::exit(1);
    }
}
