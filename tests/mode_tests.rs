//! Mode tests for keel
//!
//! Randomized checks of key resolution and of the mode stack against a simple model, plus
//! checks of the built-in bindings loaded from the embedded configuration.

use keel::app::keymap::canonical_key;
use keel::app::{Action, Command, Mode, ModeError, ModeStack};
use keel::config::Config;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, rng};
use std::collections::HashMap;
use std::error;

const KEY_POOL: [&str; 16] = [
    "a", "b", "z", "Q", "é", "1", "9", "?", ":", "space", "enter", "esc", "ctrl-a", "alt-x",
    "f5", "tab",
];

fn tagged(n: usize) -> Action {
    Action::new(None, vec![Command::FocusByIndex(n)])
}

#[test]
fn test_resolution_priority_randomized() {
    let mut rng = rng();

    for round in 0..200 {
        let mut mode = Mode::new(format!("m{round}"));
        let mut bound: HashMap<&str, usize> = HashMap::new();

        let mut keys = KEY_POOL.to_vec();
        keys.shuffle(&mut rng);
        let count = rng.random_range(0..keys.len());
        for (i, key) in keys.iter().take(count).enumerate() {
            mode.bind(*key, tagged(i));
            bound.insert(*key, i);
        }

        let alphabet = rng.random_bool(0.5);
        if alphabet {
            mode.set_alphabet(tagged(1000));
        }
        let default = rng.random_bool(0.5);
        if default {
            mode.set_default(tagged(2000));
        }

        for key in KEY_POOL {
            let single_alpha = {
                let mut chars = key.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
            };
            let expected = match bound.get(key) {
                Some(i) => Some(tagged(*i)),
                None if alphabet && single_alpha => Some(tagged(1000)),
                None if default => Some(tagged(2000)),
                None => None,
            };
            assert_eq!(
                mode.resolve(key).cloned(),
                expected,
                "round {round}, key {key:?}"
            );
        }
    }
}

#[test]
fn test_stack_against_model() -> Result<(), Box<dyn error::Error>> {
    let names = ["default", "action", "input", "delete"];
    let modes: HashMap<String, Mode> = names
        .iter()
        .map(|n| (n.to_string(), Mode::new(*n)))
        .collect();
    let mut stack = ModeStack::new(modes, "default")?;
    let mut model: Vec<String> = vec!["default".into()];
    let mut rng = rng();

    for _ in 0..2000 {
        let target = if rng.random_bool(0.1) {
            "missing"
        } else {
            names.choose(&mut rng).copied().unwrap_or("default")
        };

        match rng.random_range(0..4) {
            0 => {
                let res = stack.push(target);
                if target == "missing" {
                    assert_eq!(res, Err(ModeError::ModeNotFound(target.into())));
                } else {
                    model.push(target.into());
                }
            }
            1 => {
                let res = stack.pop();
                if model.len() == 1 {
                    assert_eq!(res, Err(ModeError::EmptyStack));
                } else {
                    model.pop();
                }
            }
            2 => {
                let res = stack.switch(target);
                if target == "missing" {
                    assert!(res.is_err());
                } else {
                    if model.len() > 1 {
                        model.pop();
                    }
                    model.push(target.into());
                }
            }
            _ => {
                stack.reset();
                model.truncate(1);
            }
        }

        assert_eq!(stack.names(), model.as_slice());
        assert_eq!(stack.names()[0], "default");
        assert_eq!(stack.peek().name(), model[model.len() - 1]);
    }
    Ok(())
}

#[test]
fn test_builtin_bindings() -> Result<(), Box<dyn error::Error>> {
    let mut config = Config::builtin()?;
    let stack = config.mode_stack()?;
    assert_eq!(stack.peek().name(), "default");

    let default = stack.get("default").ok_or("no default mode")?;
    let resolve = |key: &str| default.resolve(key).map(|a| a.commands.clone());
    assert_eq!(resolve("j"), Some(vec![Command::FocusNext]));
    assert_eq!(
        resolve("space"),
        Some(vec![Command::ToggleSelection, Command::FocusNext])
    );
    assert_eq!(resolve("ctrl-c"), Some(vec![Command::Quit]));
    assert_eq!(resolve("G"), Some(vec![Command::FocusLast]));

    // Keys the built-in file writes in other spellings land on the same identifier.
    for alias in ["<c-r>", "Ctrl+R", "ctrl-r"] {
        assert_eq!(canonical_key(alias).as_deref(), Some("ctrl-r"));
    }

    let delete = stack.get("delete").ok_or("no delete mode")?;
    assert_eq!(
        delete.resolve("x").map(|a| a.commands.clone()),
        Some(vec![Command::PopMode])
    );
    Ok(())
}
