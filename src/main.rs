//! main.rs
//! Entry point for keel

use keel::app::{AppState, Dispatcher, EventLoop, HandlerRegistry};
use keel::config::Config;
use keel::core::pipe::Pipe;
use keel::core::terminal;
use keel::core::worker::{Msg, Runtime};
use keel::utils::cli::{CliAction, handle_args};
use keel::utils::resolve_path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::fs;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

const TICK_RATE: Duration = Duration::from_millis(250);
const PIPE_POLL: Duration = Duration::from_millis(100);

fn main() -> io::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        let _ = terminal::restore_terminal();

        eprintln!("\n[keel] Error occurred: {}", info);

        #[cfg(debug_assertions)]
        {
            let bt = std::backtrace::Backtrace::force_capture();
            eprintln!("\nStack Backtrace:\n{}", bt);
        }
    }));

    let start = match handle_args() {
        CliAction::Exit => return Ok(()),
        CliAction::RunApp => std::env::current_dir()?,
        CliAction::RunAppAtPath(path_arg) => {
            let target = resolve_path(&std::env::current_dir()?, &path_arg);
            if !fs::metadata(&target).is_ok_and(|m| m.is_dir()) {
                eprintln!("\n[keel] Error: Path '{}' cannot be opened.", path_arg);
                std::process::exit(1);
            }
            target
        }
    };

    init_tracing();

    let mut config = Config::load().map_err(io::Error::other)?;
    let modes = config.mode_stack().map_err(io::Error::other)?;
    let general = config.general().clone();
    info!(path = %start.display(), "starting keel");

    let pipe = if general.enable_pipe() {
        match Pipe::create(&Pipe::default_base()) {
            Ok(pipe) => Some(pipe),
            Err(e) => {
                warn!("could not create pipe directory: {e}");
                None
            }
        }
    } else {
        None
    };

    let mut state = AppState::new(general.settings(), modes, start);
    if let Some(pipe) = &pipe {
        state = state.with_pipe(pipe.clone());
    }

    let (tx, rx) = crossbeam_channel::unbounded::<Msg>();
    let mut runtime = Runtime::spawn(tx.clone(), general.bulk_workers());
    if let Some(pipe) = &pipe
        && let Err(e) = pipe.spawn_reader(tx, PIPE_POLL)
    {
        warn!("could not start pipe reader: {e}");
    }

    let mut app = EventLoop::new(state, Dispatcher::new(HandlerRegistry::builtin()));
    app.start(config.warnings(), &mut runtime);

    let result = terminal::run_terminal(&mut app, &mut runtime, &rx, TICK_RATE);

    if let Some(pipe) = pipe
        && let Err(e) = pipe.cleanup()
    {
        warn!("could not remove pipe directory: {e}");
    }
    info!("keel exited");
    result
}

/// Logs to `<cache dir>/keel/keel.log`; the terminal belongs to the UI.
/// The filter is read from `KEEL_LOG` and defaults to `info`.
fn init_tracing() {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("keel")) else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("keel.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_env("KEEL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
