//! Provides the main entry point to the program.
use bess_appraise::cli::run_cli;
use bess_appraise::log::is_logger_initialised;
use human_panic::{metadata, setup_panic};

fn main() {
    setup_panic!(metadata!().support("Open an issue on the project's issue tracker"));

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            ::log::error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        std::process::exit(1);
    }
}
