#![forbid(unsafe_code)]

use clap::Parser;
use units_infer::Cli;

fn main() -> miette::Result<()> {
    units_infer::run(Cli::parse())
}
