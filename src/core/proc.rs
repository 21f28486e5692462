//! External process execution for keel.
//!
//! A [ProcessRequest] carries the program, its arguments and the environment exported to it.
//! Before launch the current selection is written to the selection-export file, one path per
//! line. Silent requests run on a background thread with output captured; interactive ones
//! run in the foreground with the terminal handed over (see [crate::core::terminal]).

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Selection to write before a process starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionExport {
    pub file: PathBuf,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Short description used in notifications and logs.
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, OsString)>,
    pub selection: Option<SelectionExport>,
    pub interactive: bool,
}

impl ProcessRequest {
    /// A request that runs `script` through `sh -c`.
    pub fn shell(script: &str, interactive: bool) -> Self {
        Self {
            label: script.to_string(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            env: Vec::new(),
            selection: None,
            interactive,
        }
    }

    pub fn program(program: &str, args: Vec<String>, interactive: bool) -> Self {
        let label = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            label,
            program: program.to_string(),
            args,
            env: Vec::new(),
            selection: None,
            interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Success,
    /// Exit code, `None` when terminated by a signal.
    Failed(Option<i32>),
    SpawnError(String),
}

/// Writes the selected paths one per line, replacing the previous export.
pub fn export_selection(export: &SelectionExport) -> io::Result<()> {
    let mut out = io::BufWriter::new(fs::File::create(&export.file)?);
    for path in &export.paths {
        out.write_all(path.as_os_str().as_encoded_bytes())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn build_command(req: &ProcessRequest) -> Command {
    let mut cmd = Command::new(&req.program);
    cmd.args(&req.args);
    for (key, value) in &req.env {
        cmd.env(key, value);
    }
    cmd
}

fn prepare(req: &ProcessRequest) {
    if let Some(export) = &req.selection
        && let Err(e) = export_selection(export)
    {
        warn!(file = %export.file.display(), error = %e, "failed to export selection");
    }
}

/// Runs a request without a terminal, capturing its output.
pub fn run_silent(req: &ProcessRequest) -> ProcessOutcome {
    prepare(req);
    debug!(label = %req.label, "running silent process");

    let output = build_command(req)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(out) if out.status.success() => ProcessOutcome::Success,
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(label = %req.label, code = ?out.status.code(), stderr = %stderr.trim(), "process failed");
            ProcessOutcome::Failed(out.status.code())
        }
        Err(e) => ProcessOutcome::SpawnError(e.to_string()),
    }
}

/// Runs a request attached to the caller's terminal and waits for it.
pub fn run_interactive(req: &ProcessRequest) -> ProcessOutcome {
    prepare(req);
    debug!(label = %req.label, "running interactive process");

    match build_command(req).status() {
        Ok(status) if status.success() => ProcessOutcome::Success,
        Ok(status) => ProcessOutcome::Failed(status.code()),
        Err(e) => ProcessOutcome::SpawnError(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error;
    use tempfile::tempdir;

    #[test]
    fn selection_export_is_line_per_path() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let export = SelectionExport {
            file: dir.path().join("selection_out"),
            paths: vec![PathBuf::from("/a/b"), PathBuf::from("/c d/e")],
        };
        export_selection(&export)?;
        assert_eq!(fs::read_to_string(&export.file)?, "/a/b\n/c d/e\n");

        let empty = SelectionExport {
            paths: Vec::new(),
            ..export
        };
        export_selection(&empty)?;
        assert_eq!(fs::read_to_string(&empty.file)?, "");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn silent_process_sees_env_and_selection() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let out = dir.path().join("out.txt");
        let sel = dir.path().join("sel");

        let mut req = ProcessRequest::shell(
            r#"printf '%s|' "$KEEL_PWD" > "$OUT"; cat "$KEEL_PIPE_SELECTION_OUT" >> "$OUT""#,
            false,
        );
        req.env = vec![
            ("KEEL_PWD".into(), "/work".into()),
            ("KEEL_PIPE_SELECTION_OUT".into(), sel.clone().into()),
            ("OUT".into(), out.clone().into()),
        ];
        req.selection = Some(SelectionExport {
            file: sel,
            paths: vec![PathBuf::from("/work/x")],
        });

        assert_eq!(run_silent(&req), ProcessOutcome::Success);
        assert_eq!(fs::read_to_string(&out)?, "/work|/work/x\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn failures_are_classified() {
        assert_eq!(
            run_silent(&ProcessRequest::shell("exit 3", false)),
            ProcessOutcome::Failed(Some(3))
        );
        let missing = ProcessRequest::program("keel-no-such-program", Vec::new(), false);
        assert!(matches!(
            run_silent(&missing),
            ProcessOutcome::SpawnError(_)
        ));
        assert_eq!(missing.label, "keel-no-such-program");
    }
}
