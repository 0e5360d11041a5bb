pub mod app;
pub mod ui;

use std::{error::Error, io, time::Duration};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::runtime::Handle;
use app::{App, InputMode};
use ui::ui;
use crate::controller::Controller;

/// How long to wait for a key before checking for finished background work.
const TICK: Duration = Duration::from_millis(100);

pub fn run_tui(controller: Controller, runtime: Handle) -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(controller, runtime);
    app.start();

    let res = run_app(&mut terminal, &mut app);
    // Dropping the app unsubscribes and discards anything still in flight.
    drop(app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.drain();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(());
            }
            match app.input_mode {
                InputMode::Normal => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Char(' ') | KeyCode::Enter => app.toggle_selected(),
                    KeyCode::Char('a') | KeyCode::Char('i') => app.start_edit(),
                    KeyCode::Char('r') if !app.loading_tasks => app.refresh(),
                    KeyCode::Char('g') => app.new_guest(),
                    _ => {}
                },
                InputMode::Editing => match key.code {
                    KeyCode::Enter => app.submit(),
                    KeyCode::Esc => app.stop_edit(),
                    KeyCode::Tab | KeyCode::Down => app.next_field(),
                    KeyCode::BackTab | KeyCode::Up => app.previous_field(),
                    KeyCode::Left => app.cycle_priority(false),
                    KeyCode::Right => app.cycle_priority(true),
                    KeyCode::Char(c) => app.push_char(c),
                    KeyCode::Backspace => app.backspace(),
                    _ => {}
                },
            }
        }
    }
}
