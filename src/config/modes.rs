//! Mode tables of keel.toml.
//!
//! Each `[modes.<name>]` table deserializes into a [RawMode] and is compiled against the
//! [HandlerRegistry] into a [Mode]. Problems never abort loading: invalid keys are skipped
//! and invalid command lines become placeholders, each leaving a warning behind.

use crate::app::command::{Command, HandlerRegistry};
use crate::app::keymap::{ALPHABET_KEY, canonical_key};
use crate::app::mode::{Action, Mode};

use serde::Deserialize;

use std::collections::HashMap;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RawAction {
    help: Option<String>,
    commands: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RawMode {
    help: Option<String>,
    default: Option<RawAction>,
    keys: HashMap<String, RawAction>,
}

fn compile_action(
    raw: &RawAction,
    registry: &HandlerRegistry,
    origin: &str,
    warnings: &mut Vec<String>,
) -> Action {
    let commands = raw
        .commands
        .iter()
        .filter_map(|line| registry.compile_line(line))
        .inspect(|cmd| {
            if let Command::Invalid { error, .. } = cmd {
                warnings.push(format!("{origin}: {error}"));
            }
        })
        .collect();
    Action::new(raw.help.clone(), commands)
}

/// Compiles one mode table.
pub fn compile_mode(
    name: &str,
    raw: &RawMode,
    registry: &HandlerRegistry,
    warnings: &mut Vec<String>,
) -> Mode {
    let mut mode = Mode::new(name);
    if let Some(help) = &raw.help {
        mode = mode.with_help(help.clone());
    }
    if let Some(default) = &raw.default {
        let origin = format!("modes.{name}.default");
        mode.set_default(compile_action(default, registry, &origin, warnings));
    }

    // Sorted so warnings come out in a stable order.
    let mut keys: Vec<_> = raw.keys.iter().collect();
    keys.sort_by(|a, b| a.0.cmp(b.0));

    for (key, raw_action) in keys {
        let origin = format!("modes.{name}.keys.{key}");
        if key == ALPHABET_KEY {
            mode.set_alphabet(compile_action(raw_action, registry, &origin, warnings));
            continue;
        }
        match canonical_key(key) {
            Some(id) => mode.bind(id, compile_action(raw_action, registry, &origin, warnings)),
            None => warnings.push(format!("{origin}: invalid key '{key}'")),
        }
    }
    mode
}

/// Compiles every table and overlays it onto `base`, key by key.
pub fn merge_modes(
    base: &mut HashMap<String, Mode>,
    raw: &HashMap<String, RawMode>,
    registry: &HandlerRegistry,
    warnings: &mut Vec<String>,
) {
    let mut names: Vec<_> = raw.keys().collect();
    names.sort();

    for name in names {
        let mode = compile_mode(name, &raw[name], registry, warnings);
        match base.get_mut(name.as_str()) {
            Some(existing) => existing.merge(mode),
            None => {
                base.insert(name.clone(), mode);
            }
        }
    }
}

/// Warns about `PushMode`/`SwitchMode` bindings naming modes that do not exist.
pub fn check_mode_targets(modes: &HashMap<String, Mode>, warnings: &mut Vec<String>) {
    let mut names: Vec<_> = modes.keys().collect();
    names.sort();

    for name in names {
        let mut missing: Vec<&str> = modes[name.as_str()]
            .commands()
            .filter_map(|cmd| match cmd {
                Command::PushMode(target) | Command::SwitchMode(target) => Some(target.as_str()),
                _ => None,
            })
            .filter(|target| !modes.contains_key(*target))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        for target in missing {
            warnings.push(format!("modes.{name}: unknown mode '{target}'"));
        }
    }
}
