mod check;
mod cli;
mod commands;
mod config;
mod render;
mod script;
mod synthesis;
mod timeline;
mod timing;
mod ui;

use clap::Parser;

use cli::{Cli, Commands};
use ui::prelude::{Level, emit};

fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let format = if cli.json {
        ui::OutputFormat::Json
    } else {
        ui::OutputFormat::Text
    };
    ui::init(format, true);

    let result = match cli.command {
        Commands::Assemble(args) => commands::handle_assemble(args),
        Commands::Timing(args) => commands::handle_timing(args),
        Commands::Check(args) => check::handle_check(args),
        Commands::Completions { shell } => commands::handle_completions(shell),
    };

    if let Err(err) = result {
        emit(Level::Error, "fatal", &format!("{err:#}"), None);
        std::process::exit(1);
    }
}
