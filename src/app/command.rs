//! Commands, their registry and the command-line tokenizer.
//!
//! Bindings and external messages name commands as text: `CommandName arg1 'arg two'`. The
//! [HandlerRegistry] validates the name and arguments once and produces a typed [Command].
//! Invalid bindings become [Command::Invalid] so the rest of their chain still runs.

use crate::app::notify::Level;

use std::collections::HashMap;
use std::mem;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{command}: missing argument <{expected}>")]
    MissingArgument {
        command: String,
        expected: &'static str,
    },
    #[error("{command}: too many arguments (expected at most {max})")]
    TooManyArguments { command: String, max: usize },
    #[error("{command}: invalid argument '{arg}': {reason}")]
    InvalidArgument {
        command: String,
        arg: String,
        reason: &'static str,
    },
}

/// A validated command.
///
/// Path arguments are kept as written and resolved against the working directory at the
/// moment the command runs, so earlier commands of a chain can change what they refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FocusNext,
    FocusPrevious,
    FocusFirst,
    FocusLast,
    FocusByIndex(usize),
    FocusPath(String),

    ChangeDirectory(String),
    Enter,
    Back,
    Refresh,
    VisitLast,
    VisitNext,
    GoHome,

    ToggleSelection,
    ToggleSelectionByPath(String),
    SelectPath(String),
    UnSelectPath(String),
    SelectAll,
    ClearSelection,

    PushMode(String),
    PopMode,
    SwitchMode(String),
    ResetMode,

    SetInputBuffer(String),
    BufferInput(String),
    BufferInputFromKey,
    RemoveInputBufferLastCharacter,
    ResetInputBuffer,

    SetMark(char),
    SetMarkFromKey,
    JumpToMark(char),
    JumpToMarkFromKey,

    Delete,
    CopyTo(String),
    MoveTo(String),
    CopyHere,
    MoveHere,

    Call {
        program: String,
        args: Vec<String>,
        silent: bool,
    },
    ShellExec {
        script: String,
        silent: bool,
    },

    Log(Level, String),
    ClearNotification,

    Quit,

    /// A binding that failed validation. Running it only reports the error.
    Invalid {
        line: String,
        error: CommandError,
    },
}

/// Splits a command line into tokens.
///
/// Whitespace separates tokens except inside single or double quotes. Quotes are removed
/// from the token, backslashes have no special meaning. An unterminated quote runs to the end
/// of the line.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Arguments handed to a command parser.
pub struct Args<'a> {
    command: &'a str,
    values: &'a [String],
}

impl Args<'_> {
    fn none(&self) -> Result<(), CommandError> {
        self.at_most(0)
    }

    fn at_most(&self, max: usize) -> Result<(), CommandError> {
        if self.values.len() > max {
            return Err(CommandError::TooManyArguments {
                command: self.command.to_string(),
                max,
            });
        }
        Ok(())
    }

    fn one(&self, expected: &'static str) -> Result<String, CommandError> {
        self.at_most(1)?;
        self.first(expected)
    }

    fn first(&self, expected: &'static str) -> Result<String, CommandError> {
        self.values
            .first()
            .cloned()
            .ok_or_else(|| CommandError::MissingArgument {
                command: self.command.to_string(),
                expected,
            })
    }

    /// All arguments joined by single spaces; used for free text.
    fn text(&self, expected: &'static str) -> Result<String, CommandError> {
        self.first(expected)?;
        Ok(self.values.join(" "))
    }

    fn rest(&self) -> Vec<String> {
        self.values.iter().skip(1).cloned().collect()
    }

    fn single_char(&self) -> Result<char, CommandError> {
        let arg = self.one("char")?;
        let mut chars = arg.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(self.invalid(arg, "expected a single character")),
        }
    }

    fn index(&self) -> Result<usize, CommandError> {
        let arg = self.one("index")?;
        arg.parse()
            .map_err(|_| self.invalid(arg, "expected a non-negative integer"))
    }

    fn invalid(&self, arg: String, reason: &'static str) -> CommandError {
        CommandError::InvalidArgument {
            command: self.command.to_string(),
            arg,
            reason,
        }
    }
}

type Parser = fn(&Args) -> Result<Command, CommandError>;

/// Maps command names to their argument parsers.
pub struct HandlerRegistry {
    parsers: HashMap<&'static str, Parser>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

macro_rules! unit {
    ($cmd:expr) => {
        |a: &Args| {
            a.none()?;
            Ok($cmd)
        }
    };
}

impl HandlerRegistry {
    /// Registry with every built-in command.
    pub fn builtin() -> Self {
        let mut reg = Self {
            parsers: HashMap::new(),
        };
        reg.register("FocusNext", unit!(Command::FocusNext));
        reg.register("FocusPrevious", unit!(Command::FocusPrevious));
        reg.register("FocusFirst", unit!(Command::FocusFirst));
        reg.register("FocusLast", unit!(Command::FocusLast));
        reg.register("FocusByIndex", |a| Ok(Command::FocusByIndex(a.index()?)));
        reg.register("FocusPath", |a| Ok(Command::FocusPath(a.one("path")?)));
        reg.register("ChangeDirectory", |a| {
            Ok(Command::ChangeDirectory(a.one("path")?))
        });
        reg.register("Enter", unit!(Command::Enter));
        reg.register("Back", unit!(Command::Back));
        reg.register("Refresh", unit!(Command::Refresh));
        reg.register("VisitLast", unit!(Command::VisitLast));
        reg.register("VisitNext", unit!(Command::VisitNext));
        reg.register("GoHome", unit!(Command::GoHome));
        reg.register("ToggleSelection", unit!(Command::ToggleSelection));
        reg.register("ToggleSelectionByPath", |a| {
            Ok(Command::ToggleSelectionByPath(a.one("path")?))
        });
        reg.register("SelectPath", |a| Ok(Command::SelectPath(a.one("path")?)));
        reg.register("UnSelectPath", |a| Ok(Command::UnSelectPath(a.one("path")?)));
        reg.register("SelectAll", unit!(Command::SelectAll));
        reg.register("ClearSelection", unit!(Command::ClearSelection));
        reg.register("PushMode", |a| Ok(Command::PushMode(a.one("mode")?)));
        reg.register("PopMode", unit!(Command::PopMode));
        reg.register("SwitchMode", |a| Ok(Command::SwitchMode(a.one("mode")?)));
        reg.register("ResetMode", unit!(Command::ResetMode));
        reg.register("SetInputBuffer", |a| {
            a.at_most(1)?;
            Ok(Command::SetInputBuffer(
                a.values.first().cloned().unwrap_or_default(),
            ))
        });
        reg.register("BufferInput", |a| Ok(Command::BufferInput(a.one("text")?)));
        reg.register("BufferInputFromKey", unit!(Command::BufferInputFromKey));
        reg.register(
            "RemoveInputBufferLastCharacter",
            unit!(Command::RemoveInputBufferLastCharacter),
        );
        reg.register("ResetInputBuffer", unit!(Command::ResetInputBuffer));
        reg.register("SetMark", |a| Ok(Command::SetMark(a.single_char()?)));
        reg.register("SetMarkFromKey", unit!(Command::SetMarkFromKey));
        reg.register("JumpToMark", |a| Ok(Command::JumpToMark(a.single_char()?)));
        reg.register("JumpToMarkFromKey", unit!(Command::JumpToMarkFromKey));
        reg.register("Delete", unit!(Command::Delete));
        reg.register("CopyTo", |a| Ok(Command::CopyTo(a.one("dir")?)));
        reg.register("MoveTo", |a| Ok(Command::MoveTo(a.one("dir")?)));
        reg.register("CopyHere", unit!(Command::CopyHere));
        reg.register("MoveHere", unit!(Command::MoveHere));
        reg.register("Call", |a| {
            Ok(Command::Call {
                program: a.first("program")?,
                args: a.rest(),
                silent: false,
            })
        });
        reg.register("CallSilently", |a| {
            Ok(Command::Call {
                program: a.first("program")?,
                args: a.rest(),
                silent: true,
            })
        });
        reg.register("ShellExec", |a| {
            Ok(Command::ShellExec {
                script: a.text("script")?,
                silent: false,
            })
        });
        reg.register("ShellExecSilently", |a| {
            Ok(Command::ShellExec {
                script: a.text("script")?,
                silent: true,
            })
        });
        reg.register("LogInfo", |a| Ok(Command::Log(Level::Info, a.text("text")?)));
        reg.register("LogSuccess", |a| {
            Ok(Command::Log(Level::Success, a.text("text")?))
        });
        reg.register("LogWarning", |a| {
            Ok(Command::Log(Level::Warning, a.text("text")?))
        });
        reg.register("LogError", |a| Ok(Command::Log(Level::Error, a.text("text")?)));
        reg.register("ClearNotification", unit!(Command::ClearNotification));
        reg.register("Quit", unit!(Command::Quit));
        reg
    }

    fn register(&mut self, name: &'static str, parser: Parser) {
        self.parsers.insert(name, parser);
    }

    /// Validates `name` with `args` into a typed command.
    pub fn resolve(&self, name: &str, args: &[String]) -> Result<Command, CommandError> {
        let parser = self
            .parsers
            .get(name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        parser(&Args {
            command: name,
            values: args,
        })
    }

    /// Tokenizes and validates one command line. `None` for a blank line.
    pub fn parse_line(&self, line: &str) -> Option<Result<Command, CommandError>> {
        let tokens = tokenize(line);
        let (name, args) = tokens.split_first()?;
        Some(self.resolve(name, args))
    }

    /// Like [HandlerRegistry::parse_line], but keeps failures as [Command::Invalid].
    pub fn compile_line(&self, line: &str) -> Option<Command> {
        self.parse_line(line).map(|res| {
            res.unwrap_or_else(|error| Command::Invalid {
                line: line.trim().to_string(),
                error,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn tokenize_quotes() {
        assert_eq!(
            tokenize(r#"Foo 'a b' "c d" e"#),
            s(&["Foo", "a b", "c d", "e"])
        );
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
        assert_eq!(tokenize(r#"say "it's""#), s(&["say", "it's"]));
        assert_eq!(tokenize(r"path C:\dir\x"), s(&["path", r"C:\dir\x"]));
        assert_eq!(tokenize("SetInputBuffer ''"), s(&["SetInputBuffer", ""]));
        assert_eq!(tokenize("x 'unterminated rest"), s(&["x", "unterminated rest"]));
    }

    #[test]
    fn registry_validates_arity() {
        let reg = HandlerRegistry::builtin();
        assert_eq!(reg.resolve("FocusNext", &[]), Ok(Command::FocusNext));
        assert!(matches!(
            reg.resolve("FocusNext", &s(&["x"])),
            Err(CommandError::TooManyArguments { max: 0, .. })
        ));
        assert!(matches!(
            reg.resolve("ChangeDirectory", &[]),
            Err(CommandError::MissingArgument { expected: "path", .. })
        ));
        assert!(matches!(
            reg.resolve("FocusByIndex", &s(&["-1"])),
            Err(CommandError::InvalidArgument { .. })
        ));
        assert!(matches!(
            reg.resolve("SetMark", &s(&["ab"])),
            Err(CommandError::InvalidArgument { .. })
        ));
        assert_eq!(
            reg.resolve("Explode", &[]),
            Err(CommandError::Unknown("Explode".into()))
        );
    }

    #[test]
    fn parse_line_builds_typed_commands() {
        let reg = HandlerRegistry::builtin();
        assert_eq!(reg.parse_line("  "), None);
        assert_eq!(
            reg.parse_line("CallSilently git add 'my file.txt'"),
            Some(Ok(Command::Call {
                program: "git".into(),
                args: s(&["add", "my file.txt"]),
                silent: true,
            }))
        );
        assert_eq!(
            reg.parse_line("LogSuccess all good"),
            Some(Ok(Command::Log(Level::Success, "all good".into())))
        );
        assert_eq!(
            reg.parse_line("SetInputBuffer"),
            Some(Ok(Command::SetInputBuffer(String::new())))
        );
    }

    #[test]
    fn compile_line_keeps_invalid_placeholder() {
        let reg = HandlerRegistry::builtin();
        match reg.compile_line("Frobnicate now") {
            Some(Command::Invalid { line, error }) => {
                assert_eq!(line, "Frobnicate now");
                assert_eq!(error, CommandError::Unknown("Frobnicate".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
