use clap::Parser;

use crate::cli::Cli;
use glb_loader::run;

mod cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli.into())
}
