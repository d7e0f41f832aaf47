use std::process::ExitCode;

fn main() -> ExitCode {
    tierconf_cli::run()
}
