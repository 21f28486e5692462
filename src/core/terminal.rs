//! Terminal driver for keel.
//!
//! Handles setup/teardown of raw mode and the alternate screen, runs the input pump thread
//! that turns terminal events into [Msg]s, and drives the [EventLoop]: receive a message,
//! handle it, redraw. Interactive processes get the terminal handed over while the pump is
//! paused.

use crate::app::event_loop::{EventLoop, Flow};
use crate::app::keymap::key_event_id;
use crate::core::proc::{ProcessOutcome, ProcessRequest, run_interactive};
use crate::core::worker::{Msg, Runtime};
use crate::ui;

use crossbeam_channel::{Receiver, Sender};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{debug, warn};

use std::io::{self, Stdout};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

pub type AppTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Longest time the pump blocks in `poll`, bounding how long a pause takes to be observed.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Lets the terminal driver stop the input pump from reading events.
#[derive(Debug, Default)]
pub struct InputGate {
    paused: AtomicBool,
    parked: AtomicBool,
}

impl InputGate {
    /// Pauses the pump and waits (bounded) until it has stopped polling.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        let deadline = Instant::now() + POLL_SLICE * 4;
        while !self.parked.load(Ordering::Acquire) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn resume(&self) {
        self.parked.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}

/// Starts the thread translating terminal events into messages.
///
/// Sends [Msg::Tick] every `tick_rate` so progress redraws without input. Ends once the
/// receiving side is gone.
pub fn spawn_input_pump(
    tx: Sender<Msg>,
    gate: Arc<InputGate>,
    tick_rate: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_tick = Instant::now();

        loop {
            if gate.is_paused() {
                gate.parked.store(true, Ordering::Release);
                thread::sleep(Duration::from_millis(10));
                continue;
            }

            let timeout = tick_rate.saturating_sub(last_tick.elapsed()).min(POLL_SLICE);
            match event::poll(timeout) {
                Ok(true) => {
                    let msg = match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                            key_event_id(&key).map(Msg::Key)
                        }
                        Ok(Event::Resize(_, _)) => Some(Msg::Resize),
                        Ok(_) => None,
                        Err(e) => {
                            warn!("failed to read terminal event: {e}");
                            None
                        }
                    };
                    if let Some(msg) = msg
                        && tx.send(msg).is_err()
                    {
                        break;
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("failed to poll terminal event: {e}"),
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(Msg::Tick).is_err() {
                    break;
                }
                last_tick = Instant::now();
            }
        }
        debug!("input pump stopped");
    })
}

/// Initializes the terminal and runs the main loop until quit.
///
/// Returns an std::io::Error if terminal setup or teardown fails.
pub fn run_terminal(
    app: &mut EventLoop,
    runtime: &mut Runtime,
    rx: &Receiver<Msg>,
    tick_rate: Duration,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let gate = Arc::new(InputGate::default());
    spawn_input_pump(runtime.sender().clone(), Arc::clone(&gate), tick_rate);

    let result = event_loop(&mut terminal, app, runtime, rx, &gate);

    restore_terminal()?;
    result
}

/// Leaves raw mode and the alternate screen. Also used by the panic hook.
pub fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen, Show)
}

fn event_loop(
    terminal: &mut AppTerminal,
    app: &mut EventLoop,
    runtime: &mut Runtime,
    rx: &Receiver<Msg>,
    gate: &InputGate,
) -> io::Result<()> {
    terminal.draw(|f| ui::render(f, app.state()))?;

    while let Ok(msg) = rx.recv() {
        let mut flow = app.handle(msg, runtime);
        // Apply whatever else is already queued before paying for a redraw.
        while flow == Flow::Continue
            && let Ok(msg) = rx.try_recv()
        {
            flow = app.handle(msg, runtime);
        }
        if flow == Flow::Quit {
            break;
        }

        while let Some(req) = runtime.take_interactive() {
            let outcome = run_suspended(terminal, gate, &req)?;
            let msg = Msg::ProcessFinished {
                label: req.label,
                outcome,
            };
            if app.handle(msg, runtime) == Flow::Quit {
                return Ok(());
            }
        }

        terminal.draw(|f| ui::render(f, app.state()))?;
    }
    Ok(())
}

/// Hands the terminal to an interactive process and takes it back once it exits.
fn run_suspended(
    terminal: &mut AppTerminal,
    gate: &InputGate,
    req: &ProcessRequest,
) -> io::Result<ProcessOutcome> {
    gate.pause();
    restore_terminal()?;

    let outcome = run_interactive(req);

    enable_raw_mode()?;
    execute!(terminal.backend_mut(), EnterAlternateScreen, Hide)?;
    terminal.clear()?;
    gate.resume();
    Ok(outcome)
}
