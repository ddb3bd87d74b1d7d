#[deny(clippy::unwrap_used)]
mod commands;
mod config;

use std::error::Error;

use clap::*;
use commands::{Generate, Initialize};

#[derive(Parser)]
#[command(name = "sqlc-gen-go", bin_name = "sqlc-gen-go")]
enum Command {
    Generate(Generate),
    Init(Initialize),
}

fn main() -> Result<(), Box<dyn Error>> {
    let command = Command::parse();
    match command {
        Command::Generate(args) => args.generate(),
        Command::Init(args) => args.init(),
    }
}
