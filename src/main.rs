use btcpulse::cli::{run, Cli};
use clap::Parser;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    btcpulse::logging::init_logging(cli.verbose);
    run(cli)
}
