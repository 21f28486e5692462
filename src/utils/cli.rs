//! Command-line argument parsing and help for keel.
//!
//! This module handles the few flags used for config initialization and help.
//!
//! When invoked with no args/flags (keel), keel simply launches the TUI in the current directory.

use crate::config::Config;

#[derive(Debug, PartialEq, Eq)]
pub enum CliAction {
    RunApp,
    RunAppAtPath(String),
    Exit,
}

pub fn handle_args() -> CliAction {
    let args: Vec<String> = std::env::args().skip(1).collect();
    handle_args_from(&args)
}

/// Same as [handle_args] for an explicit argument list (without the program name).
pub fn handle_args_from(args: &[String]) -> CliAction {
    let Some(first) = args.first() else {
        return CliAction::RunApp;
    };

    if args.len() > 1 {
        eprintln!("Error: keel accepts only one argument at a time.");
        eprintln!("Usage: keel [PATH] or keel [OPTION]");
        return CliAction::Exit;
    }

    match first.as_str() {
        "--version" | "-v" => {
            print_version();
            CliAction::Exit
        }
        "-h" | "--help" => {
            print_help();
            CliAction::Exit
        }
        "--keybinds" | "--keys" => {
            print_keybinds();
            CliAction::Exit
        }
        "--init" => {
            let path = Config::default_path();
            match Config::generate_default(&path) {
                Ok(()) => println!("Wrote default configuration to {}", path.display()),
                Err(e) => eprintln!("Error: {}", e),
            }
            CliAction::Exit
        }
        arg if !arg.starts_with('-') && !arg.trim().is_empty() => {
            CliAction::RunAppAtPath(arg.to_string())
        }
        arg => {
            eprintln!("Unknown argument: {}", arg);
            eprintln!("Try --help for available options");
            CliAction::Exit
        }
    }
}

fn print_version() {
    println!("keel {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    println!(
        r#"keel - A modal terminal file manager

USAGE:
  keel [PATH]

PATH:
  Directory to open (defaults to current directory)

OPTIONS:
      --init              Write the default configuration to the config path
      --keybinds          Display the key bindings of every mode
  -h, --help              Print help information
  -v, --version           Display the current installed version of keel

ENVIRONMENT:
  KEEL_CONFIG             Override the default config path
  KEEL_LOG                Log filter (e.g. "debug", "keel=trace")
"#
    );
}

/// Prints the effective bindings, user config included.
fn print_keybinds() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    for w in config.warnings() {
        eprintln!("warning: {}", w);
    }

    let mut names: Vec<&String> = config.modes().keys().collect();
    names.sort();
    for name in names {
        let mode = &config.modes()[name.as_str()];
        println!("[{}] {}", name, mode.help().unwrap_or_default());
        for (key, action) in mode.bindings() {
            println!("  {:<14} {}", key, action.help.as_deref().unwrap_or_default());
        }
        println!();
    }
}
