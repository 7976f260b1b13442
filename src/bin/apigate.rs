use apigate::cli::{run_cli, Cli};
use clap::Parser;

fn main() {
    if let Err(err) = run_cli(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
