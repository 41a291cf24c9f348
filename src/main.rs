#[macro_use] mod core;

mod app;
mod asset;
mod cli;
mod clean;
mod config;
mod discover;
mod download;
mod extract;
mod file_types;
mod identifier;
mod info;
mod install;
mod inventory;
mod keyfetch;
mod list;
mod osconfig;
mod provider;
mod recipe;
mod scorer;
mod uninstall;
mod util;
mod verify;

use std::io::{self, Write};
use std::process;

use log::{error, info as log_info};

use crate::cli::Action;
use crate::config::Config;
use crate::core::EmptyResult;

fn main() {
    let args = cli::parse_args().unwrap_or_else(|e| {
        let _ = writeln!(io::stderr(), "{}.", e);
        process::exit(1);
    });

    if let Err(e) = easy_logging::init(module_path!().split("::").next().unwrap(), args.log_level) {
        let _ = writeln!(io::stderr(), "Failed to initialize the logging: {}.", e);
        process::exit(1);
    }

    if let Err(e) = run(args) {
        error!("{}.", e);
        process::exit(1);
    }
}

fn run(args: cli::CliArgs) -> EmptyResult {
    let config = Config::load_or_default(&args.config_path).map_err(|e| format!(
        "Error while reading {:?} configuration file: {}", args.config_path, e))?;

    match args.action {
        Action::Install {identifiers, options} => {
            for identifier in &identifiers {
                match app::install(&config, identifier, &options) {
                    Ok(installed) => log_info!("{} ({}) installed.", installed.identifier.key(), installed.tag),
                    Err(err) => error!("{identifier}: {err}."),
                }
            }
        },

        Action::Run {path, parallel, options} => {
            let path = match path {
                Some(path) => path,
                None => recipe::discover_default_path()?,
            };

            let mut seen = std::collections::HashSet::new();
            let commands = recipe::parse_file(&path, &mut seen)?;
            let identifiers: Vec<String> = commands.into_iter()
                .filter_map(|c| match c { recipe::Command::Install {identifier} => Some(identifier), _ => None })
                .collect();

            app::install_many(&config, &identifiers, parallel, &options)?;
        },

        Action::Uninstall {keys, yes} => uninstall::uninstall(&config, &keys, yes)?,

        Action::List {full} => list::list(&config, full)?,

        Action::Clean => {
            let removed = clean::clean(&config)?;
            log_info!("Removed {removed} orphaned symlink(s).");
        },

        Action::Info => info::info(&config),
    }

    Ok(())
}
