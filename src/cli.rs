use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use const_format::formatcp;
use log::Level;

use crate::app::InstallOptions;
use crate::core::GenericResult;

pub struct CliArgs {
    pub log_level: Level,
    pub config_path: PathBuf,
    pub action: Action,
}

pub enum Action {
    Install {
        identifiers: Vec<String>,
        options: InstallOptions,
    },
    Run {
        path: Option<PathBuf>,
        parallel: usize,
        options: InstallOptions,
    },
    Uninstall {
        keys: Vec<String>,
        yes: bool,
    },
    List {
        full: bool,
    },
    Clean,
    Info,
}

macro_rules! long_about {
    ($text:expr) => {{
        textwrap::fill(indoc::indoc!($text).trim_matches('\n'), 100)
    }}
}

pub fn parse_args() -> GenericResult<CliArgs> {
    const DEFAULT_CONFIG_PATH: &str = formatcp!("~/.config/{}/config.yaml", env!("CARGO_PKG_NAME"));

    let verify_flags = || [
        Arg::new("no_score_check").long("no-score-check")
            .action(ArgAction::SetTrue)
            .help("Skip the minimum asset-match score check"),
        Arg::new("no_checksum_verify").long("no-checksum-verify")
            .action(ArgAction::SetTrue)
            .help("Don't verify the downloaded checksum file"),
        Arg::new("no_signature_verify").long("no-signature-verify")
            .action(ArgAction::SetTrue)
            .help("Don't verify the downloaded signature"),
    ];

    let matches = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))

        .dont_collapse_args_in_usage(true)
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .help_expected(true)

        .arg(Arg::new("config").short('c').long("config")
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help(formatcp!("Configuration file path [default: {}]", DEFAULT_CONFIG_PATH)))

        .arg(Arg::new("verbose")
            .short('v').long("verbose")
            .action(ArgAction::Count)
            .help("Set verbosity level"))

        .subcommand(Command::new("install").visible_alias("i")
            .about("Install one or more tools by identifier")
            .long_about(long_about!("
                Installs the given <source>/<owner>/<repo>[@version] identifiers (source and version are
                optional; the default source is GitHub and the default version is the latest release).
            "))
            .args([
                Arg::new("identifier")
                    .value_name("IDENTIFIER")
                    .action(ArgAction::Append)
                    .required(true)
                    .help("Tool identifier, e.g. caddyserver/caddy or caddyserver/caddy@2.9.0"),
                Arg::new("force").short('f').long("force")
                    .action(ArgAction::SetTrue)
                    .help("Reinstall even if this version is already installed"),
            ])
            .args(verify_flags()))

        .subcommand(Command::new("run")
            .about("Install every tool listed in a Distfile")
            .args([
                Arg::new("path")
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .help("Distfile path [default: ./Distfile, then $HOME/Distfile]"),
                Arg::new("parallel").short('j').long("parallel")
                    .value_name("N")
                    .value_parser(value_parser!(usize))
                    .default_value("1")
                    .help("Number of installs to run concurrently"),
            ])
            .args(verify_flags()))

        .subcommand(Command::new("uninstall").visible_aliases(["remove", "r"])
            .about("Uninstall one or more installed versions")
            .args([
                Arg::new("key")
                    .value_name("SOURCE/OWNER/REPO[@VERSION]")
                    .action(ArgAction::Append)
                    .required(true)
                    .help("Installed tool key, optionally with @version (defaults to all versions)"),
                Arg::new("yes").short('y').long("yes")
                    .action(ArgAction::SetTrue)
                    .help("Don't ask for confirmation"),
            ]))

        .subcommand(Command::new("list").visible_alias("l")
            .about("List installed tools")
            .arg(Arg::new("full").short('f').long("full")
                .action(ArgAction::SetTrue)
                .help("Show every installed version, not just the latest")))

        .subcommand(Command::new("clean")
            .about("Remove bin symlinks whose opt target no longer exists"))

        .subcommand(Command::new("info")
            .about("Print resolved configuration paths"))

        .get_matches();

    let log_level = match matches.get_count("verbose") {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };

    let config_path = match matches.get_one("config").cloned() {
        Some(path) => path,
        None => PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).to_string()),
    };

    let (command, matches) = matches.subcommand().unwrap();

    let action = match command {
        "install" => Action::Install {
            identifiers: get_many(matches, "identifier"),
            options: InstallOptions {
                force: matches.get_flag("force"),
                no_score_check: matches.get_flag("no_score_check"),
                no_checksum_verify: matches.get_flag("no_checksum_verify"),
                no_signature_verify: matches.get_flag("no_signature_verify"),
            },
        },

        "run" => Action::Run {
            path: matches.get_one("path").cloned(),
            parallel: *matches.get_one("parallel").unwrap(),
            options: InstallOptions {
                force: false,
                no_score_check: matches.get_flag("no_score_check"),
                no_checksum_verify: matches.get_flag("no_checksum_verify"),
                no_signature_verify: matches.get_flag("no_signature_verify"),
            },
        },

        "uninstall" => Action::Uninstall {
            keys: get_many(matches, "key"),
            yes: matches.get_flag("yes"),
        },

        "list" => Action::List {full: matches.get_flag("full")},

        "clean" => Action::Clean,
        "info" => Action::Info,

        _ => unreachable!(),
    };

    Ok(CliArgs {log_level, config_path, action})
}

fn get_many(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches.get_many::<String>(id).map(|vals| vals.cloned().collect()).unwrap_or_default()
}
