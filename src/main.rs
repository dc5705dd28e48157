use std::process::ExitCode;

fn main() -> ExitCode {
    hostbridge::run_cli()
}
