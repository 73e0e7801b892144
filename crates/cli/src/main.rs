use std::process::ExitCode;

fn main() -> ExitCode {
    geniebot_cli::run()
}
