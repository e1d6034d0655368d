//! `rigup` binary entry point.

use anyhow::Result;
use clap::Parser;

use rigup::cli::{Cli, Command};
use rigup::commands;
use rigup::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    logging::init_subscriber(args.verbose, args.command.name());
    let log = Logger::new(args.command.name());

    match args.command {
        Command::List(opts) => commands::list::run(&args.global, &opts, &log),
        Command::Info(opts) => commands::info::run(&args.global, &opts, &log),
        Command::Search(opts) => commands::search::run(&args.global, &opts, &log),
        Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        Command::Remove(opts) => commands::remove::run(&args.global, &opts, &log),
        Command::Completion(opts) => commands::completion::run(&opts),
    }
}
