use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::terminal;
use indoc::formatdoc;
use ratatui::layout::Rect;
use tracing::Level;

use shell_overlays::constants::{DEFAULT_BACKEND_LATENCY_FRAMES, DEFAULT_FRAME_MS};
use shell_overlays::debug_log::{self, LogHandle};
use shell_overlays::drivers::OutputDriver;
use shell_overlays::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use shell_overlays::event_loop::{ControlFlow, EventLoop, LoopEvent};
use shell_overlays::keybindings::{Action, KeyBindings};
use shell_overlays::shell::backend::InMemoryBackend;
use shell_overlays::shell::{EditorShell, ShellOptions, render};
use shell_overlays::tracing_sub;

/// Key reference for `--help`, rendered from the default bindings.
fn keys_help() -> String {
    let bindings = KeyBindings::default();
    let first = |action: Action| {
        bindings
            .first_combo(action)
            .map(|combo| combo.display())
            .unwrap_or_default()
    };
    let all = |action: Action| bindings.combos_for(action).join(" / ");
    let focus = format!("{} / {}", first(Action::FocusNext), first(Action::FocusPrev));
    formatdoc! {"
        Keys:
          {focus:<18}move focus (kept inside the open dialog)
          {activate:<18}press the focused button
          {dismiss:<18}close the topmost dialog or menu
          {quit:<18}quit
        ",
        activate = all(Action::Activate),
        dismiss = all(Action::Dismiss),
        quit = all(Action::Quit),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "shell-overlays",
    version = env!("CARGO_PKG_VERSION"),
    about = "Terminal editor shell exercising dialog and menu overlays",
    after_help = keys_help()
)]
struct Cli {
    /// Frame interval; deferred focus moves run once per frame.
    #[arg(long = "frame-ms", value_name = "MS", default_value_t = DEFAULT_FRAME_MS)]
    frame_ms: u64,

    /// Most verbose level written to the log pane.
    #[arg(long = "log-level", value_name = "LEVEL", default_value_t = Level::DEBUG)]
    log_level: Level,

    /// Frames the simulated backend waits before answering.
    #[arg(
        long = "backend-latency",
        value_name = "FRAMES",
        default_value_t = DEFAULT_BACKEND_LATENCY_FRAMES
    )]
    backend_latency: u32,

    /// Keep dialogs open when clicking outside them.
    #[arg(long = "no-outside-dismiss")]
    no_outside_dismiss: bool,

    /// Also append log lines to this file.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let log = LogHandle::default();
    debug_log::set_global_log(log.clone());
    debug_log::install_panic_hook();
    tracing_sub::init(cli.log_level, cli.log_file.as_deref())?;

    let options = ShellOptions {
        outside_dismiss: !cli.no_outside_dismiss,
    };
    let mut shell = EditorShell::new(InMemoryBackend::new(cli.backend_latency), options)
        .map_err(io::Error::other)?
        .with_log(log);
    let (width, height) = terminal::size()?;
    shell.resize(Rect::new(0, 0, width, height));
    tracing::info!(
        frame_ms = cli.frame_ms,
        backend_latency = cli.backend_latency,
        "shell started"
    );

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let mut event_loop = EventLoop::new(
        ConsoleInputDriver::new(),
        Duration::from_millis(cli.frame_ms.max(1)),
    );
    let result = event_loop.run(|_, event| match event {
        LoopEvent::Frame => {
            shell.tick();
            output.draw(|mut frame| render::draw(&mut frame, &shell))?;
            Ok(ControlFlow::Continue)
        }
        LoopEvent::Input(event) => Ok(shell.handle_event(&event)),
    });
    output.exit()?;
    result
}
