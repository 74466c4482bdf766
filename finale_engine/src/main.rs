use anyhow::Result;

mod cli;
mod host_bridge;
mod lint;
mod manifest;
mod runtime;

use cli::Command;

fn main() -> Result<()> {
    env_logger::init();

    match cli::parse()? {
        Command::Run(args) => runtime::execute(args),
        Command::Lint(args) => lint::execute(args),
    }
}
