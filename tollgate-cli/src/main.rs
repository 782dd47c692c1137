//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use log::error;
use tollgate_cli::CliError;

fn main() {
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    match tollgate_cli::run() {
        Ok(()) => {}
        // Help and version requests surface as clap errors too.
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            error!("tollgate: {err}");
            std::process::exit(1);
        }
    }
}
