use std::process::ExitCode;

fn main() -> ExitCode {
    agromaq_cli::run()
}
