use clap::Parser;
use std::process::ExitCode;

use filenest::cli::{self, Cli};
use filenest::config::Settings;
use filenest::logging;
use filenest::output::OutputFormatter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };

    // Held until exit so buffered log lines reach the file.
    let log_file = cli.log_file.clone().or_else(|| settings.log_file.clone());
    let _guard = logging::init(cli.verbosity(), log_file.as_deref());

    if let Err(e) = cli::run(&cli, &settings) {
        OutputFormatter::error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
