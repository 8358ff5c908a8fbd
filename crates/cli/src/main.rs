use std::process::ExitCode;

fn main() -> ExitCode {
    suki_cli::run()
}
