use crate::inspect::{run_show, run_validate, ShowArgs, ValidateArgs};
use crate::simulate::{run_simulate, SimulateArgs};
use clap::{Parser, Subcommand};
use silicon_samples::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Silicon Samples",
    about = "Run simulated survey interviews against a questionnaire from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a questionnaire and print its questions and dependencies
    Validate(ValidateArgs),
    /// Interview simulated respondents and store one result file per sample
    Simulate(SimulateArgs),
    /// Print the answers recorded in a stored interview result
    Show(ShowArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Simulate(args) => run_simulate(args),
        Command::Show(args) => run_show(args),
    }
}
