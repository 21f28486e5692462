//! Key identifiers for keel.
//!
//! Bindings and terminal key events meet on one canonical string form:
//! - modifiers are lowercase and ordered `ctrl-`, `alt-`, `shift-`
//! - printable characters are kept as-is (`a`, `A`, `?`), shift is folded into the case
//! - named keys are lowercase (`esc`, `enter`, `pageup`, `f5`, `space`, ...)
//!
//! So `Ctrl+R`, `<c-r>` and `ctrl-r` in the config all bind the chord reported as `ctrl-r`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Binding identifier matching any unbound single alphabetic key.
pub const ALPHABET_KEY: &str = "alphabet";

#[derive(Default, Clone, Copy)]
struct Mods {
    ctrl: bool,
    alt: bool,
    shift: bool,
}

impl Mods {
    fn prefix(self) -> String {
        let mut s = String::new();
        if self.ctrl {
            s.push_str("ctrl-");
        }
        if self.alt {
            s.push_str("alt-");
        }
        if self.shift {
            s.push_str("shift-");
        }
        s
    }
}

/// Canonicalises a key as written in the configuration.
///
/// Returns `None` for strings that do not name a key.
pub fn canonical_key(s: &str) -> Option<String> {
    let trimmed = s.trim_matches(|c| c == '\n' || c == '\t');
    if trimmed.chars().count() == 1 {
        return Some(char_key(trimmed.chars().next()?, Mods::default()));
    }

    let inner = if trimmed.starts_with('<') && trimmed.ends_with('>') && trimmed.len() > 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    let is_sep = |c: char| c == '-' || c == '+';
    let mut chars = inner.chars().rev();
    let (mods_part, key_part) = match (chars.next(), chars.next()) {
        (Some(last), Some(prev)) if is_sep(last) && is_sep(prev) => {
            (&inner[..inner.len() - 2], &inner[inner.len() - 1..])
        }
        _ => match inner.rfind(is_sep) {
            Some(i) if i + 1 < inner.len() => (&inner[..i], &inner[i + 1..]),
            _ => ("", inner),
        },
    };

    let mut mods = Mods::default();
    for part in mods_part.split(is_sep).filter(|p| !p.is_empty()) {
        match part.to_lowercase().as_str() {
            "c" | "ctrl" | "control" => mods.ctrl = true,
            "a" | "m" | "alt" | "meta" => mods.alt = true,
            "s" | "shift" => mods.shift = true,
            _ => return None,
        }
    }

    if key_part.chars().count() == 1 {
        let c = key_part.chars().next()?;
        // A chord's letter is case-insensitive; uppercase needs an explicit shift.
        let c = if mods.ctrl || mods.alt {
            c.to_ascii_lowercase()
        } else {
            c
        };
        return Some(char_key(c, mods));
    }

    let lower = key_part.to_lowercase();
    let named = match lower.as_str() {
        "esc" | "escape" => "esc",
        "enter" | "return" | "cr" => "enter",
        "tab" => "tab",
        "backtab" => "backtab",
        "backspace" | "back" | "bs" => "backspace",
        "delete" | "del" => "delete",
        "insert" | "ins" => "insert",
        "up" => "up",
        "down" => "down",
        "left" => "left",
        "right" => "right",
        "home" => "home",
        "end" => "end",
        "pageup" | "pgup" => "pageup",
        "pagedown" | "pgdown" | "pgdn" => "pagedown",
        "space" | "spc" => "space",
        f if f.len() > 1 && f.starts_with('f') && f[1..].chars().all(|c| c.is_ascii_digit()) => {
            return Some(format!("{}{}", mods.prefix(), f));
        }
        _ => return None,
    };
    Some(format!("{}{}", mods.prefix(), named))
}

/// Translates a terminal key event into its canonical identifier.
pub fn key_event_id(key: &KeyEvent) -> Option<String> {
    let mods = Mods {
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
    };

    let named = match key.code {
        KeyCode::Char(c) => return Some(char_key(c, mods)),
        KeyCode::Esc => "esc",
        KeyCode::Enter => "enter",
        KeyCode::Tab => "tab",
        KeyCode::BackTab => {
            let m = Mods {
                shift: false,
                ..mods
            };
            return Some(format!("{}backtab", m.prefix()));
        }
        KeyCode::Backspace => "backspace",
        KeyCode::Delete => "delete",
        KeyCode::Insert => "insert",
        KeyCode::Up => "up",
        KeyCode::Down => "down",
        KeyCode::Left => "left",
        KeyCode::Right => "right",
        KeyCode::Home => "home",
        KeyCode::End => "end",
        KeyCode::PageUp => "pageup",
        KeyCode::PageDown => "pagedown",
        KeyCode::F(n) => return Some(format!("{}f{}", mods.prefix(), n)),
        _ => return None,
    };
    Some(format!("{}{}", mods.prefix(), named))
}

/// Returns the character of a plain single-character key identifier.
pub fn key_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return if key == "space" { Some(' ') } else { None };
    }
    Some(c)
}

/// True for identifiers the alphabet wildcard may catch: one alphabetic character.
pub fn is_alphabetic_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
}

fn char_key(c: char, mods: Mods) -> String {
    let m = Mods {
        shift: false,
        ..mods
    };
    let c = if mods.shift && c.is_alphabetic() {
        c.to_ascii_uppercase()
    } else {
        c
    };
    if c == ' ' {
        format!("{}space", m.prefix())
    } else {
        format!("{}{}", m.prefix(), c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_spellings_share_one_form() {
        for spelling in ["ctrl-r", "Ctrl+R", "<c-r>", "control-r"] {
            assert_eq!(canonical_key(spelling).as_deref(), Some("ctrl-r"), "{spelling}");
        }
        assert_eq!(canonical_key("shift+n").as_deref(), Some("N"));
        assert_eq!(canonical_key("N").as_deref(), Some("N"));
        assert_eq!(canonical_key("Esc").as_deref(), Some("esc"));
        assert_eq!(canonical_key(" ").as_deref(), Some("space"));
        assert_eq!(canonical_key("-").as_deref(), Some("-"));
        assert_eq!(canonical_key("ctrl--").as_deref(), Some("ctrl--"));
        assert_eq!(canonical_key("alt-F5").as_deref(), Some("alt-f5"));
        assert_eq!(canonical_key("hyper-x"), None);
        assert_eq!(canonical_key("nonsense"), None);
    }

    #[test]
    fn terminal_events_match_config_form() {
        let ev = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(key_event_id(&ev).as_deref(), Some("ctrl-r"));

        let ev = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(key_event_id(&ev).as_deref(), Some("G"));

        let ev = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(key_event_id(&ev).as_deref(), Some("esc"));

        let ev = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(key_event_id(&ev).as_deref(), Some("backtab"));
    }

    #[test]
    fn alphabetic_keys() {
        assert!(is_alphabetic_key("b"));
        assert!(is_alphabetic_key("Z"));
        assert!(!is_alphabetic_key("esc"));
        assert!(!is_alphabetic_key("1"));
        assert!(!is_alphabetic_key("ctrl-a"));
        assert_eq!(key_char("space"), Some(' '));
        assert_eq!(key_char("x"), Some('x'));
        assert_eq!(key_char("enter"), None);
    }
}
