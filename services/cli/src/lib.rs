mod cli;
mod inspect;
mod simulate;

use silicon_samples::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
