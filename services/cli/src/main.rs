use silicon_samples_cli::run;

fn main() {
    if let Err(err) = run() {
        eprintln!("application error: {err}");
        std::process::exit(i32::from(err.exit_code()));
    }
}
