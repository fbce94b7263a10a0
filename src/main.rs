use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use barehub::app::App;
use barehub::cli::Cli;
use barehub::commands::{self, Output};
use barehub::gateway::GitCli;
use barehub::project::Project;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        let git = GitCli::new();
        let output = Output::new(cli.json, cli.quiet);
        return commands::run(command, &git, &output);
    }

    // No subcommand: run the interactive UI inside a hub project.
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let project = Project::discover(&cwd)?;
    let app = App::new(project, Arc::new(GitCli::new()))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;

    // Printed after the terminal is restored so a shell wrapper can
    // `cd "$(barehub)"` into the chosen worktree.
    if let Ok(Some(target)) = &result {
        println!("{}", target.display());
    }
    result.map(|_| ())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
) -> Result<Option<std::path::PathBuf>> {
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(50);

    loop {
        terminal.draw(|frame| app.render(frame))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && app.handle_key(key_event) {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(app.switch_target)
}
