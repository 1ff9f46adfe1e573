use std::process::ExitCode;

use translator_module::cli::{self, logging, Cli};
use translator_module::ui::output;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = logging::init_tracing(cli.verbose, cli.quiet) {
        output::error(format!("failed to initialize logging: {}", err));
    }

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::from(cli::exit_code(&err))
        }
    }
}
