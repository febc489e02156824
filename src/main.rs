use anyhow::Result;
use log::error;
use std::process;

use shotness::{app, cli, logging};

fn main() {
    if let Err(e) = run() {
        let error_msg = e.to_string();

        // Usage problems go straight to stderr without logging noise
        let is_user_error = error_msg.contains("not a git repository")
            || error_msg.contains("Path does not exist")
            || error_msg.contains("Failed to read report");

        if is_user_error {
            eprintln!("{:#}", e);
        } else {
            error!("Application error: {:#}", e);
            eprintln!("Error: {:#}", e);
        }

        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse_args();
    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    app::run(&args, &config_manager)
}
